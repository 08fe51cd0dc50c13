//! Persistent response cache for offline access.
//!
//! Responses live in named namespaces, one directory each, with one JSON
//! file per `(method, url)` key. Namespace names embed the release version,
//! so a new release never serves a previous release's assets; activation
//! deletes every namespace that does not belong to the current version.
//!
//! Two namespaces are in use at any time:
//! - static assets (pages, scripts, styles, fonts)
//! - API responses

pub mod atomic;
pub mod entry;
pub mod store;

pub use entry::{CacheEntry, CacheKey};
pub use store::CacheStore;

/// Prefix shared by every namespace this client creates.
const CACHE_PREFIX: &str = "jobcache";

/// Version identifier baked in at build time.
///
/// Set `JOBCACHE_CACHE_VERSION` when compiling a release so the namespace
/// names track the deployed asset set; otherwise the crate version is used.
pub fn build_version() -> &'static str {
    option_env!("JOBCACHE_CACHE_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// The pair of namespace names owned by one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    pub static_assets: String,
    pub api: String,
}

impl CacheNames {
    pub fn for_version(version: &str) -> Self {
        Self {
            static_assets: format!("{}-static-v{}", CACHE_PREFIX, version),
            api: format!("{}-api-v{}", CACHE_PREFIX, version),
        }
    }

    pub fn current() -> Self {
        Self::for_version(build_version())
    }

    /// Whether `namespace` belongs to this release.
    pub fn contains(&self, namespace: &str) -> bool {
        namespace == self.static_assets || namespace == self.api
    }

    pub fn all(&self) -> [&str; 2] {
        [&self.static_assets, &self.api]
    }
}
