//! `.npmrc` lookup for the default registry.
//!
//! Only the plain `registry=URL` directive matters here; scoped registries
//! and auth tokens are out of scope for size analysis.

use std::path::Path;
use url::Url;

/// Parse the `registry=` directive from `.npmrc` content.
#[must_use]
pub fn parse_registry(content: &str) -> Option<Url> {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == "registry" {
                return Url::parse(value.trim()).ok();
            }
        }
    }
    None
}

/// Resolve the default registry from `.npmrc` files.
///
/// Walks from the project directory up to the filesystem root, then falls
/// back to `$HOME/.npmrc`; the first `registry=` directive wins.
#[must_use]
pub fn default_registry(project_dir: &Path) -> Option<Url> {
    let mut dir = Some(project_dir.to_path_buf());
    while let Some(d) = dir {
        if let Some(url) = read_registry(&d.join(".npmrc")) {
            return Some(url);
        }
        dir = d.parent().map(Path::to_path_buf);
    }

    std::env::var_os("HOME")
        .and_then(|home| read_registry(&Path::new(&home).join(".npmrc")))
}

fn read_registry(path: &Path) -> Option<Url> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_registry(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_registry_line() {
        let url = parse_registry("# corp config\nregistry=https://npm.corp.example.com/\n").unwrap();
        assert_eq!(url.as_str(), "https://npm.corp.example.com/");
    }

    #[test]
    fn test_parse_ignores_other_directives() {
        assert!(parse_registry("@scope:registry=https://x.example/\nsave-exact=true\n").is_none());
    }

    #[test]
    fn test_project_npmrc_wins() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".npmrc"), "registry=https://mirror.example.com/\n").unwrap();
        let url = default_registry(dir.path()).unwrap();
        assert_eq!(url.as_str(), "https://mirror.example.com/");
    }
}
