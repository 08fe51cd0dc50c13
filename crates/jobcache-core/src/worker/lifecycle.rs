use anyhow::{bail, Context, Result};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::OfflineWorker;
use crate::cache::{CacheEntry, CacheKey};
use crate::net::{FetchRequest, Fetcher};
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to take over.
    Installed,
    Activating,
    Active,
    /// Install failed; this worker will never activate.
    Redundant,
}

impl<F: Fetcher, N: Notifier> OfflineWorker<F, N> {
    pub async fn state(&self) -> WorkerState {
        *self.inner.state.read().await
    }

    async fn set_state(&self, state: WorkerState) {
        let mut guard = self.inner.state.write().await;
        debug!(from = ?*guard, to = ?state, "Worker state change");
        *guard = state;
    }

    /// Pre-cache the static URL list, make sure the API namespace exists,
    /// then take over immediately.
    pub async fn install(&self) -> Result<()> {
        self.set_state(WorkerState::Installing).await;
        let names = &self.settings().names;

        let precached = self.add_all(&names.static_assets, &self.settings().precache).await;
        let opened = self.caches().open(&names.api);

        match precached.and_then(|n| opened.map(|_| n)) {
            Ok(count) => {
                info!(count, namespace = %names.static_assets, "Pre-cached static assets");
                self.set_state(WorkerState::Installed).await;
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                return Err(e.context("Install failed"));
            }
        }

        self.skip_waiting().await
    }

    /// Activate now instead of waiting for older clients to go away.
    pub async fn skip_waiting(&self) -> Result<()> {
        match self.state().await {
            WorkerState::Active | WorkerState::Activating => Ok(()),
            WorkerState::Redundant => {
                warn!("Ignoring skip-waiting on a redundant worker");
                Ok(())
            }
            _ => self.activate().await.map(|_| ()),
        }
    }

    /// Delete every namespace that does not belong to this release, then
    /// claim clients. Returns the deleted namespace names.
    ///
    /// A namespace that cannot be deleted is logged and left for the next
    /// activation.
    pub async fn activate(&self) -> Result<Vec<String>> {
        if self.state().await == WorkerState::Redundant {
            bail!("Cannot activate a redundant worker");
        }
        self.set_state(WorkerState::Activating).await;

        let names = &self.settings().names;
        let mut deleted = Vec::new();
        for namespace in self.caches().namespaces()? {
            if names.contains(&namespace) {
                continue;
            }
            match self.caches().delete(&namespace) {
                Ok(_) => {
                    info!(namespace = %namespace, "Deleted stale cache");
                    deleted.push(namespace);
                }
                Err(e) => warn!(namespace = %namespace, error = %e, "Failed to delete stale cache"),
            }
        }

        self.set_state(WorkerState::Active).await;
        info!("Worker active");
        Ok(deleted)
    }

    /// Fetch every URL and store all of them, or none.
    ///
    /// Any network failure or non-2xx answer fails the whole batch before
    /// anything is written.
    pub async fn add_all(&self, namespace: &str, urls: &[String]) -> Result<usize> {
        let fetches = urls.iter().map(|raw| async move {
            let url = self.resolve(raw)?;
            let response = self
                .inner
                .fetcher
                .fetch(&FetchRequest::get(url.as_str()))
                .await
                .with_context(|| format!("Failed to fetch {}", url))?;
            if !response.is_ok() {
                bail!("Failed to fetch {}: HTTP {}", url, response.status);
            }
            Ok::<_, anyhow::Error>(CacheEntry::new(CacheKey::get(&url), response))
        });
        let entries = try_join_all(fetches).await?;

        self.caches().open(namespace)?;
        for entry in &entries {
            self.caches().put(namespace, entry)?;
        }
        Ok(entries.len())
    }
}
