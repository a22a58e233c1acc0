//! Size measurement strategy and the local package size cache.

use crate::error::AnalyzeError;
use crate::pack;
use crate::registry::Dist;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How package sizes are measured in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMode {
    /// Compressed transfer size of the distributable archive.
    Packed,
    /// Sum of on-disk file sizes after extraction.
    Unpacked,
}

struct ModeState {
    mode: SizeMode,
    /// Whether a remote package has been observed yet. Until then the mode
    /// is only the host-based default used for local measurements.
    committed: bool,
}

/// Run-scoped size mode arbiter.
///
/// Every remote package in a run must agree on which size field is
/// available: once a manifest has supplied an unpacked size, a later
/// packed-only manifest means the registry's reporting is inconsistent and
/// the run aborts.
pub struct SizeStrategy {
    registry: String,
    state: Mutex<ModeState>,
}

impl SizeStrategy {
    /// Pick the default mode from the registry host: the canonical public
    /// registry defaults to packed sizes, anything else to unpacked.
    #[must_use]
    pub fn new(registry: &str) -> Self {
        let mode = if registry.contains("registry.npmjs.org") {
            SizeMode::Packed
        } else {
            SizeMode::Unpacked
        };
        Self {
            registry: registry.to_string(),
            state: Mutex::new(ModeState {
                mode,
                committed: false,
            }),
        }
    }

    /// The mode currently in effect (default or committed).
    #[must_use]
    pub fn mode(&self) -> SizeMode {
        self.state.lock().expect("mode lock poisoned").mode
    }

    /// Measure a remote package from its `dist` metadata, committing the
    /// run's mode on first observation.
    pub fn remote_size(&self, dist: &Dist) -> Result<u64, AnalyzeError> {
        let mut state = self.state.lock().expect("mode lock poisoned");
        if let Some(unpacked) = dist.unpacked_size {
            state.mode = SizeMode::Unpacked;
            state.committed = true;
            return Ok(unpacked);
        }
        if state.committed && state.mode == SizeMode::Unpacked {
            return Err(AnalyzeError::InconsistentSizes {
                registry: self.registry.clone(),
            });
        }
        state.mode = SizeMode::Packed;
        state.committed = true;
        dist.size.ok_or_else(|| {
            AnalyzeError::registry(format!(
                "registry {} reported no size metadata at all",
                self.registry
            ))
        })
    }
}

type SharedSize = Shared<BoxFuture<'static, Result<u64, AnalyzeError>>>;

/// Path-keyed cache of local package sizes.
///
/// The first request for a path triggers the packaging computation; any
/// concurrent request for the same path awaits the same in-flight future.
/// Measurement is local file I/O only and runs on the blocking pool.
pub struct LocalSizeCache {
    strategy: Arc<SizeStrategy>,
    inflight: Mutex<HashMap<PathBuf, SharedSize>>,
    computations: Arc<AtomicUsize>,
}

impl LocalSizeCache {
    /// Create a cache measuring with the given strategy.
    #[must_use]
    pub fn new(strategy: Arc<SizeStrategy>) -> Self {
        Self {
            strategy,
            inflight: Mutex::new(HashMap::new()),
            computations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Installed size of the local package at `path`, memoized per path.
    pub async fn size_of(&self, path: &Path) -> Result<u64, AnalyzeError> {
        let fut = {
            let mut inflight = self.inflight.lock().expect("size cache lock poisoned");
            if let Some(fut) = inflight.get(path) {
                fut.clone()
            } else {
                let fut = Self::compute(
                    Arc::clone(&self.strategy),
                    path.to_path_buf(),
                    Arc::clone(&self.computations),
                )
                .boxed()
                .shared();
                inflight.insert(path.to_path_buf(), fut.clone());
                fut
            }
        };
        fut.await
    }

    async fn compute(
        strategy: Arc<SizeStrategy>,
        path: PathBuf,
        computations: Arc<AtomicUsize>,
    ) -> Result<u64, AnalyzeError> {
        computations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(path = %path.display(), "analyzing local package size");
        let mode = strategy.mode();
        let measured_path = path.clone();
        tokio::task::spawn_blocking(move || measure(&measured_path, mode))
            .await
            .map_err(|e| AnalyzeError::pack(path, e.to_string()))?
    }

    #[cfg(test)]
    fn computation_count(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }
}

fn measure(path: &Path, mode: SizeMode) -> Result<u64, AnalyzeError> {
    let files = pack::list_packable_files(path)?;
    match mode {
        SizeMode::Packed => {
            let (_guard, tgz) = pack::archive(path, &files)?;
            let meta = fs::metadata(&tgz).map_err(|e| AnalyzeError::pack(path, e.to_string()))?;
            Ok(meta.len())
        }
        SizeMode::Unpacked => pack::unpacked_size(path, &files),
    }
}
