//! Analysis error types.
//!
//! The error type is `Clone`: coalesced in-flight lookups (registry metadata,
//! local package sizes) hand the same result to every concurrent waiter, so a
//! failure must be cloneable into each branch of the traversal.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for a size analysis run.
#[derive(Error, Debug, Clone)]
pub enum AnalyzeError {
    #[error("yarn.lock cannot be found under current folder: {}", .0.display())]
    LockfileNotFound(PathBuf),

    #[error("yarn.lock is not in a healthy state ({}), please solve merge conflicts first", .0.display())]
    LockfileConflicted(PathBuf),

    #[error("failed to parse yarn.lock: {0}")]
    LockfileInvalid(String),

    #[error("package.json cannot be found under current folder: {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("failed to parse {}: {message}", path.display())]
    ManifestInvalid { path: PathBuf, message: String },

    #[error("cannot find workspace package: {}", .0.display())]
    EntryNotFound(PathBuf),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("no metadata for {name}@{version} in registry response")]
    VersionNotFound { name: String, version: String },

    #[error(
        "cannot get unpacked package sizes from registry {registry}, \
         consider using a registry that reports unpacked sizes consistently"
    )]
    InconsistentSizes { registry: String },

    #[error("failed to measure package at {}: {message}", path.display())]
    Pack { path: PathBuf, message: String },
}

impl AnalyzeError {
    /// Create a registry error from a message.
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a packaging error for a local package path.
    pub fn pack(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Pack {
            path: path.into(),
            message: msg.into(),
        }
    }
}

impl From<reqwest::Error> for AnalyzeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Registry(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Self::Registry(format!("connection failed: {e}"))
        } else {
            Self::Registry(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_are_cloneable() {
        let err = AnalyzeError::registry("boom");
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }

    #[test]
    fn test_lockfile_error_names_path() {
        let err = AnalyzeError::LockfileNotFound(PathBuf::from("/work/app"));
        assert!(err.to_string().contains("/work/app"));
        assert!(err.to_string().contains("yarn.lock"));
    }

    #[test]
    fn test_inconsistent_sizes_names_registry() {
        let err = AnalyzeError::InconsistentSizes {
            registry: "https://npm.example.com/".to_string(),
        };
        assert!(err.to_string().contains("https://npm.example.com/"));
    }
}
