//! Core library for jobcache.
//!
//! This crate holds everything the AI Job Chommie client needs below the
//! presentation layer:
//!
//! - `worker`: the offline cache & background-sync manager
//! - `cache` / `queue`: durable cache namespaces and the pending-action queue
//! - `net`: the `Fetcher` transport seam and its reqwest implementation
//! - `api` / `models`: typed REST client for the job-search backend
//! - `auth`: explicit session context and keychain credentials
//! - `notify`: user-visible notifications raised by the worker

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod net;
pub mod notify;
pub mod queue;
pub mod utils;
pub mod worker;

pub use api::{ApiClient, ApiError};
pub use auth::{CredentialStore, Session, SessionData};
pub use cache::{CacheEntry, CacheKey, CacheNames, CacheStore};
pub use config::Config;
pub use net::{FetchError, FetchRequest, Fetcher, HttpFetcher, RequestMode, StoredResponse};
pub use notify::{ClickOutcome, LogNotifier, Notification, Notifier};
pub use queue::{ActionKind, ActionQueue, PendingAction};
pub use worker::{ControlMessage, OfflineWorker, SyncReport, WorkerEvent, WorkerSettings, WorkerState};
