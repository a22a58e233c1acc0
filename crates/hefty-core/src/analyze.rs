//! Dependency tree aggregation.
//!
//! Walks package ids from the entry package(s), branching on local versus
//! remote: ids with a lockfile entry are remote packages measured from
//! registry metadata; everything else is looked up in the workspace and
//! measured by packing it locally. Sibling dependencies resolve
//! concurrently and fold bottom-up into weighted [`TreeNode`]s.
//!
//! All dedup and cache state lives on the per-run [`Analyzer`], so two
//! sequential analyses in one process never see each other's bookkeeping.

use crate::error::AnalyzeError;
use crate::lockfile::{LockEntry, Lockfile};
use crate::manifest::PackageId;
use crate::options::AnalyzeOptions;
use crate::registry::{MetaFetcher, RegistryClient};
use crate::size::{LocalSizeCache, SizeStrategy};
use crate::tree::TreeNode;
use crate::workspaces::{canonical, WorkspaceIndex};
use futures::future::{try_join_all, BoxFuture, FutureExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Ids on the current resolution path, used to cut true dependency cycles.
/// Distinct from the run-wide seen-set: a diamond (two siblings sharing a
/// dependency) is not a cycle.
type Ancestors = Arc<HashSet<String>>;

/// Run the full analysis for a project root.
///
/// Returns one weighted tree per entry package, in entry order.
pub async fn analyze(root: &Path, options: AnalyzeOptions) -> Result<Vec<TreeNode>, AnalyzeError> {
    let lockfile = Lockfile::load(root)?;
    let workspace = WorkspaceIndex::discover(root)?;
    Arc::new(Analyzer::new(lockfile, workspace, options)?).run().await
}

/// Per-run analysis context: lockfile, workspace map, caches, and dedup
/// state. Created fresh for every run and discarded with the result.
pub struct Analyzer {
    lockfile: Lockfile,
    workspace: WorkspaceIndex,
    options: AnalyzeOptions,
    entry_path: PathBuf,
    fetcher: MetaFetcher,
    strategy: Arc<SizeStrategy>,
    local_sizes: LocalSizeCache,
    /// Normalized `name@version` ids already counted this run.
    seen: Mutex<HashSet<String>>,
}

impl Analyzer {
    /// Build a run context from parsed inputs.
    pub fn new(
        lockfile: Lockfile,
        workspace: WorkspaceIndex,
        options: AnalyzeOptions,
    ) -> Result<Self, AnalyzeError> {
        let client = RegistryClient::new(&options.registry)?;
        let fetcher = MetaFetcher::new(client, options.fetch_concurrency);
        let strategy = Arc::new(SizeStrategy::new(&options.registry));
        let local_sizes = LocalSizeCache::new(Arc::clone(&strategy));
        let entry_path = canonical(&options.entry);
        Ok(Self {
            lockfile,
            workspace,
            options,
            entry_path,
            fetcher,
            strategy,
            local_sizes,
            seen: Mutex::new(HashSet::new()),
        })
    }

    /// Resolve every entry package into a weighted tree.
    pub async fn run(self: Arc<Self>) -> Result<Vec<TreeNode>, AnalyzeError> {
        let entries: Vec<String> = self
            .workspace
            .entry_packages(&self.options)?
            .iter()
            .map(|pkg| pkg.name.clone())
            .collect();
        tracing::info!(entries = entries.len(), "analyzing dependency tree");

        let ancestors: Ancestors = Arc::new(HashSet::new());
        let roots = try_join_all(
            entries
                .into_iter()
                .map(|name| Arc::clone(&self).resolve(name, Arc::clone(&ancestors))),
        )
        .await?;
        Ok(roots.into_iter().flatten().collect())
    }

    /// Resolve one package id into a subtree.
    ///
    /// `None` means the package was silently dropped: excluded by name, or
    /// already counted elsewhere while duplicates are disallowed.
    fn resolve(
        self: Arc<Self>,
        dep_id: String,
        ancestors: Ancestors,
    ) -> BoxFuture<'static, Result<Option<TreeNode>, AnalyzeError>> {
        async move {
            match self.lockfile.get(&dep_id).cloned() {
                Some(entry) => self.resolve_remote(&dep_id, entry, &ancestors).await,
                None => self.resolve_workspace(&dep_id, &ancestors).await,
            }
        }
        .boxed()
    }

    /// A package pinned in the lockfile, measured from registry metadata.
    async fn resolve_remote(
        self: Arc<Self>,
        dep_id: &str,
        entry: LockEntry,
        ancestors: &Ancestors,
    ) -> Result<Option<TreeNode>, AnalyzeError> {
        let name = PackageId::parse(dep_id).name;
        if self.options.is_excluded(&name) {
            return Ok(None);
        }

        let id = format!("{name}@{}", entry.version);
        let leaf_label = format!("{name}({})", entry.version);
        if ancestors.contains(&id) {
            tracing::warn!(package = %id, "dependency cycle detected, terminating branch");
            return Ok(Some(TreeNode::leaf(leaf_label, 0)));
        }
        if !self.mark_seen(&id) && !self.options.allow_duplicate {
            return Ok(None);
        }

        let manifest = self.fetcher.manifest(&name, &entry.version).await?;
        let own = self.strategy.remote_size(&manifest.dist)?;
        let children = Arc::clone(&self)
            .resolve_children(entry.dependency_ids(), &id, ancestors)
            .await?;

        // A true leaf keeps its version in the label so flat reports stay
        // unambiguous; branches show the bare name.
        let label = if children.is_empty() {
            leaf_label.clone()
        } else {
            name
        };
        Ok(Some(TreeNode::assemble(label, leaf_label, own, children)))
    }

    /// A package defined in the workspace, measured by packing it locally.
    async fn resolve_workspace(
        self: Arc<Self>,
        dep_id: &str,
        ancestors: &Ancestors,
    ) -> Result<Option<TreeNode>, AnalyzeError> {
        let name = PackageId::parse(dep_id).name;
        if self.options.is_excluded(&name) {
            return Ok(None);
        }

        let Some(pkg) = self.workspace.get(&name).cloned() else {
            // Not pinned and not local: nothing to measure
            tracing::debug!(package = %name, "unresolvable package id, counting as zero");
            return Ok(Some(TreeNode::leaf(name, 0)));
        };

        let version = pkg.manifest.version.clone().unwrap_or_default();
        let id = format!("{name}@{version}");
        if ancestors.contains(&id) {
            tracing::warn!(package = %id, "workspace dependency cycle detected, terminating branch");
            return Ok(Some(TreeNode::leaf(name, 0)));
        }
        if !self.mark_seen(&id) && !self.options.allow_duplicate {
            return Ok(None);
        }

        let deps = pkg.manifest.dependency_ids(self.options.production);
        let children = Arc::clone(&self).resolve_children(deps, &id, ancestors).await?;

        let own = if self.options.ignore_entry && pkg.path == self.entry_path {
            0
        } else {
            self.local_sizes.size_of(&pkg.path).await?
        };

        Ok(Some(TreeNode::assemble(name, id, own, children)))
    }

    /// Resolve direct dependencies concurrently, preserving declared order
    /// and dropping silently omitted branches.
    async fn resolve_children(
        self: Arc<Self>,
        deps: Vec<String>,
        id: &str,
        ancestors: &Ancestors,
    ) -> Result<Vec<TreeNode>, AnalyzeError> {
        if deps.is_empty() {
            return Ok(Vec::new());
        }
        let mut on_path = (**ancestors).clone();
        on_path.insert(id.to_string());
        let on_path = Arc::new(on_path);

        let resolved = try_join_all(
            deps.into_iter()
                .map(|dep| Arc::clone(&self).resolve(dep, Arc::clone(&on_path))),
        )
        .await?;
        Ok(resolved.into_iter().flatten().collect())
    }

    /// Record an id as counted. Check and mark happen under one sync lock,
    /// so no other task can interleave between them.
    fn mark_seen(&self, id: &str) -> bool {
        self.seen
            .lock()
            .expect("seen set lock poisoned")
            .insert(id.to_string())
    }
}
