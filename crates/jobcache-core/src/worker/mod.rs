//! The offline cache & background-sync worker.
//!
//! `OfflineWorker` sits between the application and the network:
//!
//! - every outbound request goes through [`OfflineWorker::handle_fetch`],
//!   which picks a strategy by route (liveness probe, API call, static
//!   asset) and falls back to the cache, then to a synthetic offline answer
//! - mutations that cannot be delivered are queued and replayed when a
//!   background-sync trigger arrives
//! - lifecycle events (install / activate) manage the versioned cache
//!   namespaces, and a small control channel lets the app force
//!   activation, pre-cache URLs or wipe the caches
//!
//! The worker is cheap to clone; all clones share the same stores, so each
//! event can be handled on its own task.

mod control;
mod events;
mod fallback;
mod fetch;
mod lifecycle;
mod route;
mod sync;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::cache::{CacheNames, CacheStore};
use crate::config::Config;
use crate::net::{FetchError, FetchRequest, Fetcher, StoredResponse};
use crate::notify::Notifier;
use crate::queue::ActionQueue;

pub use control::ControlMessage;
pub use events::{EventReply, WorkerEvent};
pub use fallback::{OfflineBody, OFFLINE_MESSAGE};
pub use lifecycle::WorkerState;
pub use route::Route;
pub use sync::{ReplayError, SyncReport};

/// Default bound on how long an API call may wait for the network.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(5);

/// Placeholder document served to navigations that cannot be satisfied.
pub const DEFAULT_OFFLINE_PAGE: &str = "/offline.html";

/// Subdirectory of the cache dir holding response namespaces.
const CACHES_DIR: &str = "caches";

/// Subdirectory of the cache dir holding the pending-action queue.
const QUEUE_DIR: &str = "queue";

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Origin the app is served from; relative request URLs resolve here.
    pub origin: Url,
    /// Bound for non-liveness API calls.
    pub api_timeout: Duration,
    /// Path of the offline placeholder document.
    pub offline_page: String,
    /// Static URLs cached at install time.
    pub precache: Vec<String>,
    pub names: CacheNames,
    /// `Cookie` header sent with background replays.
    pub credentials: Option<String>,
}

impl WorkerSettings {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            api_timeout: DEFAULT_API_TIMEOUT,
            offline_page: DEFAULT_OFFLINE_PAGE.to_string(),
            precache: Vec::new(),
            names: CacheNames::current(),
            credentials: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let origin = config.origin_url()?;
        Ok(Self {
            api_timeout: Duration::from_secs(config.api_timeout_secs),
            offline_page: config.offline_page.clone(),
            precache: config.precache.clone(),
            ..Self::new(origin)
        })
    }

    pub fn with_credentials(mut self, cookie: Option<String>) -> Self {
        self.credentials = cookie;
        self
    }

    /// Base URL of the REST API (`{origin}/api/`).
    pub fn api_base(&self) -> Url {
        // Joining an absolute path onto an http(s) origin cannot fail
        self.origin
            .join("/api/")
            .unwrap_or_else(|_| self.origin.clone())
    }
}

struct Inner<F, N> {
    fetcher: F,
    notifier: N,
    caches: CacheStore,
    queue: ActionQueue,
    settings: WorkerSettings,
    state: RwLock<WorkerState>,
    /// One per `ActionKind`, held for a whole sync of that kind.
    sync_locks: [Mutex<()>; 3],
}

pub struct OfflineWorker<F, N> {
    inner: Arc<Inner<F, N>>,
}

impl<F, N> Clone for OfflineWorker<F, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: Fetcher, N: Notifier> OfflineWorker<F, N> {
    pub fn new(
        fetcher: F,
        notifier: N,
        caches: CacheStore,
        queue: ActionQueue,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                notifier,
                caches,
                queue,
                settings,
                state: RwLock::new(WorkerState::Parsed),
                sync_locks: Default::default(),
            }),
        }
    }

    /// Open the worker's stores under `cache_dir`.
    pub fn open(fetcher: F, notifier: N, cache_dir: &Path, settings: WorkerSettings) -> Result<Self> {
        let caches = CacheStore::new(cache_dir.join(CACHES_DIR))
            .context("Failed to open response cache")?;
        let queue = ActionQueue::new(cache_dir.join(QUEUE_DIR))
            .context("Failed to open pending-action queue")?;
        Ok(Self::new(fetcher, notifier, caches, queue, settings))
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.inner.settings
    }

    pub fn caches(&self) -> &CacheStore {
        &self.inner.caches
    }

    pub fn queue(&self) -> &ActionQueue {
        &self.inner.queue
    }

    /// Resolve a possibly-relative URL against the origin.
    fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        self.inner
            .settings
            .origin
            .join(url)
            .map_err(|e| FetchError::InvalidRequest(format!("{}: {}", url, e)))
    }
}

#[async_trait::async_trait]
impl<F: Fetcher, N: Notifier> Fetcher for OfflineWorker<F, N> {
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse, FetchError> {
        self.handle_fetch(request).await
    }
}
