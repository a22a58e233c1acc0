//! Workspace discovery for monorepos.
//!
//! Reads the root package.json, expands `workspaces` glob patterns (both the
//! bare array and the yarn-style `{ "packages": [...] }` object), and builds
//! a name → {manifest, path} map used to tell local packages from remote
//! ones. Candidate directories without a loadable package.json are skipped
//! silently: they are simply not packages.

use crate::error::AnalyzeError;
use crate::manifest::PackageJson;
use crate::options::AnalyzeOptions;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A locally defined package.
#[derive(Debug, Clone)]
pub struct WorkspacePackage {
    /// Package name from its manifest.
    pub name: String,
    /// Parsed manifest.
    pub manifest: PackageJson,
    /// Absolute path to the package directory.
    pub path: PathBuf,
}

/// Name-indexed map of every package defined in the analyzed project tree.
#[derive(Debug, Clone)]
pub struct WorkspaceIndex {
    root: PathBuf,
    root_name: String,
    packages: HashMap<String, WorkspacePackage>,
    /// Glob-discovered package names, in discovery order (excludes the root).
    discovered: Vec<String>,
}

impl WorkspaceIndex {
    /// Discover the root manifest and its workspace packages.
    ///
    /// A missing root package.json is fatal; unparseable workspace
    /// candidates are not.
    pub fn discover(root: &Path) -> Result<Self, AnalyzeError> {
        let root = canonical(root);
        let manifest = PackageJson::load(&root.join("package.json"))?;
        let root_name = manifest.name_or_root().to_string();

        let mut index = Self {
            root: root.clone(),
            root_name: root_name.clone(),
            packages: HashMap::new(),
            discovered: Vec::new(),
        };
        let patterns = manifest
            .workspaces
            .as_ref()
            .map(|w| w.patterns().to_vec())
            .unwrap_or_default();
        index.packages.insert(
            root_name.clone(),
            WorkspacePackage {
                name: root_name,
                manifest,
                path: root.clone(),
            },
        );

        for pattern in &patterns {
            let full_pattern = root.join(pattern);
            let Ok(matches) = glob::glob(&full_pattern.to_string_lossy()) else {
                continue;
            };
            for dir in matches.flatten() {
                let Some(pkg) = read_candidate(&dir) else {
                    continue;
                };
                index.discovered.push(pkg.name.clone());
                index.packages.insert(pkg.name.clone(), pkg);
            }
        }
        Ok(index)
    }

    /// Project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a workspace package by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&WorkspacePackage> {
        self.packages.get(name)
    }

    /// Whether a name refers to a local package.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Resolve the entry package(s) for a run.
    ///
    /// `all` selects every glob-discovered workspace package; an entry path
    /// other than the root must match exactly one workspace package (fatal
    /// otherwise); the default is the root package itself.
    pub fn entry_packages(&self, options: &AnalyzeOptions) -> Result<Vec<&WorkspacePackage>, AnalyzeError> {
        if options.all && !self.discovered.is_empty() {
            return Ok(self
                .discovered
                .iter()
                .filter_map(|name| self.packages.get(name))
                .collect());
        }
        let entry = canonical(&options.entry);
        if entry != self.root {
            return self
                .packages
                .values()
                .find(|pkg| canonical(&pkg.path) == entry)
                .map(|pkg| vec![pkg])
                .ok_or_else(|| AnalyzeError::EntryNotFound(options.entry.clone()));
        }
        Ok(vec![&self.packages[&self.root_name]])
    }
}

fn read_candidate(dir: &Path) -> Option<WorkspacePackage> {
    if !dir.is_dir() {
        return None;
    }
    let manifest = PackageJson::load(&dir.join("package.json")).ok()?;
    let name = manifest.name.clone()?;
    Some(WorkspacePackage {
        name,
        manifest,
        path: canonical(dir),
    })
}

/// Resolve symlinks for stable path comparisons; fall back to the raw path.
pub(crate) fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
