use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::OfflineWorker;
use crate::net::Fetcher;
use crate::notify::Notifier;

/// Messages the app posts to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ControlMessage {
    /// Activate now.
    SkipWaiting,
    /// Add these URLs to the static cache.
    CacheUrls {
        #[serde(default)]
        urls: Vec<String>,
    },
    /// Delete both current namespaces.
    ClearCache,
}

impl<F: Fetcher, N: Notifier> OfflineWorker<F, N> {
    pub async fn handle_message(&self, message: &ControlMessage) -> Result<()> {
        match message {
            ControlMessage::SkipWaiting => self.skip_waiting().await,
            ControlMessage::CacheUrls { urls } => {
                let namespace = &self.settings().names.static_assets;
                let count = self.add_all(namespace, urls).await?;
                info!(count, namespace = %namespace, "Cached URLs on request");
                Ok(())
            }
            ControlMessage::ClearCache => {
                let mut first_error = None;
                for namespace in self.settings().names.all() {
                    match self.caches().delete(namespace) {
                        Ok(true) => info!(namespace, "Cleared cache"),
                        Ok(false) => warn!(namespace, "Cache to clear did not exist"),
                        Err(e) => {
                            error!(namespace, error = %e, "Failed to clear cache");
                            first_error.get_or_insert(e);
                        }
                    }
                }
                first_error.map_or(Ok(()), Err)
            }
        }
    }
}
