//! npm registry client and coalesced metadata fetcher.

use crate::error::AnalyzeError;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Canonical public npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Per-version metadata from a packument.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionManifest {
    /// Declared dependencies (name → range) of this published version.
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    /// Distribution metadata carrying the size fields.
    #[serde(default)]
    pub dist: Dist,
}

/// The `dist` block of a published version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dist {
    /// Packed (compressed transfer) size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// Unpacked (on-disk) size in bytes; not every registry reports it.
    #[serde(rename = "unpackedSize", default)]
    pub unpacked_size: Option<u64>,
}

/// Version → manifest map for one package name.
pub type VersionMap = HashMap<String, VersionManifest>;

#[derive(Debug, Deserialize)]
struct Packument {
    #[serde(default)]
    versions: VersionMap,
}

/// Registry client for fetching package metadata.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    pub fn new(base_url: &str) -> Result<Self, AnalyzeError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AnalyzeError::registry(format!("invalid registry URL '{base_url}': {e}")))?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("hefty/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalyzeError::registry(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the full version map for a package name.
    pub async fn fetch_versions(&self, name: &str) -> Result<VersionMap, AnalyzeError> {
        // URL-encode the separator for scoped packages
        let encoded_name = if name.starts_with('@') {
            name.replace('/', "%2F")
        } else {
            name.to_string()
        };

        let url = self
            .base_url
            .join(&encoded_name)
            .map_err(|e| AnalyzeError::registry(format!("failed to build URL for '{name}': {e}")))?;

        let response = self.http.get(url.as_str()).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AnalyzeError::registry(format!("package not found: {name}")));
        }
        if !response.status().is_success() {
            return Err(AnalyzeError::registry(format!(
                "registry returned status {} for '{name}'",
                response.status()
            )));
        }

        let packument: Packument = response.json().await?;
        Ok(packument.versions)
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<VersionMap>, AnalyzeError>>>;

/// Coalescing, concurrency-bounded metadata fetcher.
///
/// One network fetch per distinct package name per run: concurrent callers
/// for the same name await a single shared in-flight future and observe the
/// same eventual success or failure. Fetches run under a semaphore so a wide
/// graph cannot open unbounded simultaneous registry connections; the permit
/// is released whether the fetch succeeds or fails.
pub struct MetaFetcher {
    client: RegistryClient,
    permits: Arc<Semaphore>,
    inflight: Mutex<HashMap<String, SharedFetch>>,
}

impl MetaFetcher {
    /// Create a fetcher with the given concurrency ceiling (floor 1).
    #[must_use]
    pub fn new(client: RegistryClient, concurrency: usize) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch (or join the in-flight fetch of) the version map for a name.
    pub async fn versions(&self, name: &str) -> Result<Arc<VersionMap>, AnalyzeError> {
        let fut = {
            // Sync lock only: the check-and-insert must not suspend, or two
            // tasks could race to start duplicate fetches.
            let mut inflight = self.inflight.lock().expect("inflight lock poisoned");
            if let Some(fut) = inflight.get(name) {
                fut.clone()
            } else {
                let fut = Self::fetch(self.client.clone(), Arc::clone(&self.permits), name.to_string())
                    .boxed()
                    .shared();
                inflight.insert(name.to_string(), fut.clone());
                fut
            }
        };
        fut.await
    }

    /// Fetch the manifest of one pinned version.
    pub async fn manifest(&self, name: &str, version: &str) -> Result<VersionManifest, AnalyzeError> {
        let versions = self.versions(name).await?;
        versions
            .get(version)
            .cloned()
            .ok_or_else(|| AnalyzeError::VersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
            })
    }

    async fn fetch(
        client: RegistryClient,
        permits: Arc<Semaphore>,
        name: String,
    ) -> Result<Arc<VersionMap>, AnalyzeError> {
        let _permit = permits
            .acquire_owned()
            .await
            .map_err(|_| AnalyzeError::registry("fetch pool closed"))?;
        tracing::debug!(package = %name, "fetching registry metadata");
        let versions = client.fetch_versions(&name).await?;
        Ok(Arc::new(versions))
    }
}
