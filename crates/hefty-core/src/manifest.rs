//! package.json manifests and package identifiers.

use crate::error::AnalyzeError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// A parsed package.json, restricted to the fields the analysis consumes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackageJson {
    pub name: Option<String>,
    pub version: Option<String>,
    pub dependencies: Map<String, Value>,
    #[serde(rename = "devDependencies")]
    pub dev_dependencies: Map<String, Value>,
    #[serde(rename = "optionalDependencies")]
    pub optional_dependencies: Map<String, Value>,
    pub workspaces: Option<Workspaces>,
}

/// The `workspaces` field: bare pattern array, or yarn-style object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Workspaces {
    Patterns(Vec<String>),
    Config {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl Workspaces {
    /// Glob patterns naming workspace package directories.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        match self {
            Self::Patterns(patterns) | Self::Config { packages: patterns } => patterns,
        }
    }
}

impl PackageJson {
    /// Load a manifest, failing with a descriptive error.
    pub fn load(path: &Path) -> Result<Self, AnalyzeError> {
        if !path.exists() {
            let dir = path.parent().unwrap_or(path).to_path_buf();
            return Err(AnalyzeError::ManifestNotFound(dir));
        }
        let content = fs::read_to_string(path).map_err(|e| AnalyzeError::ManifestInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| AnalyzeError::ManifestInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Package name, falling back to `root` for unnamed manifests.
    #[must_use]
    pub fn name_or_root(&self) -> &str {
        self.name.as_deref().unwrap_or("root")
    }

    /// Dependency ids (`name@range`) in declaration order.
    ///
    /// Production dependencies always; dev and optional dependencies only
    /// when `production` is off.
    #[must_use]
    pub fn dependency_ids(&self, production: bool) -> Vec<String> {
        let mut ids = collect_ids(&self.dependencies);
        if !production {
            ids.extend(collect_ids(&self.dev_dependencies));
            ids.extend(collect_ids(&self.optional_dependencies));
        }
        ids
    }
}

fn collect_ids(section: &Map<String, Value>) -> Vec<String> {
    section
        .iter()
        .filter_map(|(name, range)| range.as_str().map(|r| format!("{name}@{r}")))
        .collect()
}

/// A (name, version) package identity. Version may be empty for local
/// references that never resolved to a concrete version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageId {
    pub name: String,
    pub version: String,
}

impl PackageId {
    /// Parse a `name@version` (or `name@range`) id.
    ///
    /// Scoped names keep their leading `@`: the split happens at the last
    /// `@`, and a lone leading `@` means the id carries no version at all.
    #[must_use]
    pub fn parse(id: &str) -> Self {
        let split_at = id.rfind('@');
        match split_at {
            Some(0) | None => Self {
                name: id.to_string(),
                version: String::new(),
            },
            Some(i) => Self {
                name: id[..i].to_string(),
                version: id[i + 1..].to_string(),
            },
        }
    }

    /// Normalized `name@version` form used for dedup bookkeeping.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_plain_id() {
        let id = PackageId::parse("leftpad@^1.0.0");
        assert_eq!(id.name, "leftpad");
        assert_eq!(id.version, "^1.0.0");
    }

    #[test]
    fn test_parse_scoped_id() {
        let id = PackageId::parse("@types/node@^20.0.0");
        assert_eq!(id.name, "@types/node");
        assert_eq!(id.version, "^20.0.0");
    }

    #[test]
    fn test_parse_bare_names() {
        assert_eq!(PackageId::parse("leftpad").version, "");
        let scoped = PackageId::parse("@myorg/tools");
        assert_eq!(scoped.name, "@myorg/tools");
        assert_eq!(scoped.version, "");
        // A scoped name with no version at all keeps its leading `@`
        let bare_scope = PackageId::parse("@solo");
        assert_eq!(bare_scope.name, "@solo");
        assert_eq!(bare_scope.version, "");
    }

    #[test]
    fn test_dependency_ids_production_only() {
        let pkg: PackageJson = serde_json::from_str(
            r#"{
                "name": "app",
                "dependencies": { "zebra": "1.0.0", "apple": "^2.0.0" },
                "devDependencies": { "jest": "^29.0.0" },
                "optionalDependencies": { "fsevents": "^2.3.0" }
            }"#,
        )
        .unwrap();

        // Declaration order is preserved, not alphabetized
        assert_eq!(pkg.dependency_ids(true), vec!["zebra@1.0.0", "apple@^2.0.0"]);
        assert_eq!(
            pkg.dependency_ids(false),
            vec!["zebra@1.0.0", "apple@^2.0.0", "jest@^29.0.0", "fsevents@^2.3.0"]
        );
    }

    #[test]
    fn test_workspaces_both_forms() {
        let arr: PackageJson =
            serde_json::from_str(r#"{"workspaces": ["packages/*"]}"#).unwrap();
        let obj: PackageJson =
            serde_json::from_str(r#"{"workspaces": {"packages": ["packages/*", "apps/*"]}}"#)
                .unwrap();
        assert_eq!(arr.workspaces.unwrap().patterns(), ["packages/*"]);
        assert_eq!(obj.workspaces.unwrap().patterns(), ["packages/*", "apps/*"]);
    }

    #[test]
    fn test_load_missing_manifest_is_fatal() {
        let dir = tempdir().unwrap();
        let err = PackageJson::load(&dir.path().join("package.json")).unwrap_err();
        assert!(matches!(err, AnalyzeError::ManifestNotFound(_)));
    }

    #[test]
    fn test_load_invalid_manifest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, "not json {{{").unwrap();
        let err = PackageJson::load(&path).unwrap_err();
        assert!(matches!(err, AnalyzeError::ManifestInvalid { .. }));
    }
}
