//! yarn.lock (v1) reader.
//!
//! The lockfile pins every dependency range to a concrete version and lists
//! that version's own declared dependency ranges. The analysis only reads it:
//! an entry keyed `name@range` maps to `{version, dependencies}`.
//!
//! ```text
//! "@babel/code-frame@^7.0.0", "@babel/code-frame@^7.10.4":
//!   version "7.12.13"
//!   resolved "https://registry.yarnpkg.com/..."
//!   dependencies:
//!     "@babel/highlight" "^7.12.13"
//! ```

use crate::error::AnalyzeError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Lockfile filename.
pub const LOCKFILE_NAME: &str = "yarn.lock";

/// A pinned lockfile entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockEntry {
    /// Resolved concrete version.
    pub version: String,
    /// Declared dependencies as (name, range) pairs, in file order.
    pub dependencies: Vec<(String, String)>,
}

impl LockEntry {
    /// Dependency ids (`name@range`) in declared order.
    #[must_use]
    pub fn dependency_ids(&self) -> Vec<String> {
        self.dependencies
            .iter()
            .map(|(name, range)| format!("{name}@{range}"))
            .collect()
    }
}

/// Parsed lockfile: dependency-range key (`name@range`) to pinned entry.
#[derive(Debug, Clone, Default)]
pub struct Lockfile {
    entries: HashMap<String, LockEntry>,
}

impl Lockfile {
    /// Load `yarn.lock` from a project root.
    ///
    /// Missing and conflicted lockfiles are fatal: the analysis cannot make
    /// sense of an unpinned or half-merged graph.
    pub fn load(root: &Path) -> Result<Self, AnalyzeError> {
        let lock_path = root.join(LOCKFILE_NAME);
        if !lock_path.exists() {
            return Err(AnalyzeError::LockfileNotFound(root.to_path_buf()));
        }
        let content = fs::read_to_string(&lock_path)
            .map_err(|e| AnalyzeError::LockfileInvalid(e.to_string()))?;
        if content.contains("<<<<<<<") || content.contains(">>>>>>>") {
            return Err(AnalyzeError::LockfileConflicted(lock_path));
        }
        Self::parse(&content)
    }

    /// Parse lockfile text.
    pub fn parse(content: &str) -> Result<Self, AnalyzeError> {
        let mut entries = HashMap::new();
        let mut current_keys: Vec<String> = Vec::new();
        let mut current = LockEntry::default();
        let mut in_dependencies = false;

        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.trim_end();
            if line.is_empty() || line.trim_start().starts_with('#') {
                continue;
            }

            let indent = line.len() - line.trim_start().len();
            if indent == 0 {
                // New entry header: flush the previous one
                flush(&mut entries, &mut current_keys, &mut current);
                in_dependencies = false;

                let Some(header) = line.strip_suffix(':') else {
                    return Err(AnalyzeError::LockfileInvalid(format!(
                        "line {}: expected `key:` header, got `{line}`",
                        lineno + 1
                    )));
                };
                current_keys = split_keys(header);
            } else if indent == 2 {
                let body = line.trim_start();
                // optionalDependencies of a pinned entry are deliberately
                // not collected: optional deps only count via package.json
                // when production mode is off
                if body == "dependencies:" {
                    in_dependencies = true;
                } else {
                    in_dependencies = false;
                    if let Some((key, value)) = split_field(body) {
                        if key == "version" {
                            current.version = value.to_string();
                        }
                        // resolved / integrity and friends are not needed here
                    }
                }
            } else if indent >= 4 && in_dependencies {
                if let Some((name, range)) = split_field(line.trim_start()) {
                    current.dependencies.push((name.to_string(), range.to_string()));
                }
            }
        }
        flush(&mut entries, &mut current_keys, &mut current);

        Ok(Self { entries })
    }

    /// Look up the pinned entry for a dependency id (`name@range`).
    #[must_use]
    pub fn get(&self, dep_id: &str) -> Option<&LockEntry> {
        self.entries.get(dep_id)
    }

    /// Number of distinct range keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the lockfile has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn flush(entries: &mut HashMap<String, LockEntry>, keys: &mut Vec<String>, entry: &mut LockEntry) {
    if keys.is_empty() {
        return;
    }
    let done = std::mem::take(entry);
    for key in keys.drain(..) {
        entries.insert(key, done.clone());
    }
}

/// Split a multi-key header on commas outside quotes: a quoted descriptor
/// may itself contain a comma (e.g. a `>=1.0.0, <2.0.0` range).
fn split_keys(header: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in header.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                keys.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    keys.push(current);
    keys.iter()
        .map(|k| unquote(k.trim()).to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Split a `name "value"` field line; both halves may be quoted.
fn split_field(body: &str) -> Option<(&str, &str)> {
    let (key, rest) = if let Some(stripped) = body.strip_prefix('"') {
        let end = stripped.find('"')?;
        (&stripped[..end], stripped[end + 1..].trim_start())
    } else {
        let mut parts = body.splitn(2, ' ');
        (parts.next()?, parts.next().unwrap_or("").trim_start())
    };
    Some((key, unquote(rest)))
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.
# yarn lockfile v1


leftpad@^1.0.0:
  version "1.0.0"
  resolved "https://registry.yarnpkg.com/leftpad/-/leftpad-1.0.0.tgz"
  integrity sha512-aaaa

"@babel/code-frame@^7.0.0", "@babel/code-frame@^7.10.4":
  version "7.12.13"
  dependencies:
    "@babel/highlight" "^7.12.13"
    chalk "^2.0.0"
"#;

    #[test]
    fn test_parse_basic_entry() {
        let lock = Lockfile::parse(SAMPLE).unwrap();
        let entry = lock.get("leftpad@^1.0.0").unwrap();
        assert_eq!(entry.version, "1.0.0");
        assert!(entry.dependencies.is_empty());
    }

    #[test]
    fn test_parse_multi_key_entry() {
        let lock = Lockfile::parse(SAMPLE).unwrap();
        let a = lock.get("@babel/code-frame@^7.0.0").unwrap();
        let b = lock.get("@babel/code-frame@^7.10.4").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.version, "7.12.13");
        assert_eq!(
            a.dependency_ids(),
            vec!["@babel/highlight@^7.12.13", "chalk@^2.0.0"]
        );
    }

    #[test]
    fn test_dependency_order_preserved() {
        let lock = Lockfile::parse(
            "pkg@^1.0.0:\n  version \"1.0.0\"\n  dependencies:\n    zebra \"^1.0.0\"\n    apple \"^1.0.0\"\n",
        )
        .unwrap();
        let entry = lock.get("pkg@^1.0.0").unwrap();
        assert_eq!(entry.dependencies[0].0, "zebra");
        assert_eq!(entry.dependencies[1].0, "apple");
    }

    #[test]
    fn test_optional_dependencies_block_is_not_collected() {
        let lock = Lockfile::parse(
            "a@^1.0.0:\n  version \"1.0.0\"\n  dependencies:\n    b \"^1.0.0\"\n  optionalDependencies:\n    fsevents \"^2.3.0\"\n",
        )
        .unwrap();
        let entry = lock.get("a@^1.0.0").unwrap();
        assert_eq!(entry.dependency_ids(), vec!["b@^1.0.0"]);
    }

    #[test]
    fn test_quoted_key_containing_comma() {
        let lock = Lockfile::parse(
            "\"a@>=1.0.0, <2.0.0\", a@^1.2.0:\n  version \"1.2.3\"\n",
        )
        .unwrap();
        assert_eq!(lock.len(), 2);
        assert_eq!(lock.get("a@>=1.0.0, <2.0.0").unwrap().version, "1.2.3");
        assert_eq!(lock.get("a@^1.2.0").unwrap().version, "1.2.3");
    }

    #[test]
    fn test_missing_lockfile_is_fatal() {
        let dir = tempdir().unwrap();
        let err = Lockfile::load(dir.path()).unwrap_err();
        assert!(matches!(err, AnalyzeError::LockfileNotFound(_)));
    }

    #[test]
    fn test_conflicted_lockfile_is_fatal() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(LOCKFILE_NAME),
            "<<<<<<< HEAD\nleftpad@^1.0.0:\n  version \"1.0.0\"\n>>>>>>> other\n",
        )
        .unwrap();
        let err = Lockfile::load(dir.path()).unwrap_err();
        assert!(matches!(err, AnalyzeError::LockfileConflicted(_)));
    }

    #[test]
    fn test_garbage_header_is_invalid() {
        let err = Lockfile::parse("not a lockfile header\n").unwrap_err();
        assert!(matches!(err, AnalyzeError::LockfileInvalid(_)));
    }

    #[test]
    fn test_load_roundtrip() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(LOCKFILE_NAME), SAMPLE).unwrap();
        let lock = Lockfile::load(dir.path()).unwrap();
        assert_eq!(lock.len(), 3);
    }
}
