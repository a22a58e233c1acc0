//! Analysis configuration.

use std::collections::HashSet;
use std::path::PathBuf;

/// Default ceiling for concurrent registry metadata fetches.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 15;

/// Configuration surface consumed by the analysis engine.
///
/// These are resolved values, not CLI flags: the entry path is already
/// absolute and the registry URL already picked from flags or `.npmrc`.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Registry base URL for remote metadata.
    pub registry: String,
    /// Count production dependencies only for local packages.
    pub production: bool,
    /// Package names silently dropped from the tree.
    pub exclude: HashSet<String>,
    /// Treat the entry package's own size as zero.
    pub ignore_entry: bool,
    /// Analyze every workspace package instead of one entry.
    pub all: bool,
    /// Count a shared dependency once per occurrence instead of once per run.
    pub allow_duplicate: bool,
    /// Absolute path of the entry package.
    pub entry: PathBuf,
    /// Ceiling for concurrent registry fetches (clamped to at least 1).
    pub fetch_concurrency: usize,
}

impl AnalyzeOptions {
    /// Options for analyzing the package at `entry` with defaults everywhere else.
    #[must_use]
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        Self {
            registry: crate::registry::DEFAULT_REGISTRY.to_string(),
            production: true,
            exclude: HashSet::new(),
            ignore_entry: false,
            all: false,
            allow_duplicate: false,
            entry: entry.into(),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    /// Whether a package name is excluded from the analysis.
    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = AnalyzeOptions::new("/tmp/project");
        assert!(opts.production);
        assert!(!opts.allow_duplicate);
        assert_eq!(opts.fetch_concurrency, DEFAULT_FETCH_CONCURRENCY);
        assert!(!opts.is_excluded("leftpad"));
    }
}
