use std::path::PathBuf;

use anyhow::{Context, Result};
use jobcache_core::{
    ApiClient, Config, HttpFetcher, OfflineWorker, Session, WorkerSettings,
};

use crate::notifier::ConsoleNotifier;

/// The worker as the CLI runs it: real network, notifications on stderr.
pub type Worker = OfflineWorker<HttpFetcher, ConsoleNotifier>;

/// Everything a command needs: configuration, where state lives, and how
/// to print.
pub struct AppContext {
    pub config: Config,
    pub cache_dir: PathBuf,
    pub json: bool,
}

impl AppContext {
    pub fn load(origin: Option<String>, json: bool) -> Result<Self> {
        let mut config = Config::load().context("Failed to load config")?;
        if let Some(origin) = origin {
            config.origin = origin;
        }
        // Fail early on a bad origin rather than in the middle of a command
        config.origin_url()?;

        let cache_dir = config.cache_dir()?;
        Ok(Self {
            config,
            cache_dir,
            json,
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.cache_dir.join("logs")
    }

    pub fn session(&self) -> Result<Session> {
        let mut session = Session::new(self.cache_dir.clone());
        session.load()?;
        Ok(session)
    }

    /// The worker, replaying with the saved session's cookies.
    pub fn worker(&self) -> Result<Worker> {
        let session = self.session()?;
        self.worker_for(&session)
    }

    fn worker_for(&self, session: &Session) -> Result<Worker> {
        let settings =
            WorkerSettings::from_config(&self.config)?.with_credentials(session.cookie_header());
        OfflineWorker::open(HttpFetcher::new()?, ConsoleNotifier, &self.cache_dir, settings)
    }

    /// An API client that goes through the worker, authenticated with the
    /// saved session if there is one.
    pub fn api(&self) -> Result<ApiClient<Worker>> {
        let session = self.session()?;
        self.api_for(&session)
    }

    pub fn api_for(&self, session: &Session) -> Result<ApiClient<Worker>> {
        let worker = self.worker_for(session)?;
        let base = worker.settings().api_base();
        Ok(ApiClient::new(worker, base).with_session(session))
    }
}
