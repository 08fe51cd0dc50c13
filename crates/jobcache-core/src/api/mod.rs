//! REST client for the job-search backend.
//!
//! `ApiClient` speaks to `{origin}/api` through any `Fetcher`: the raw
//! network, or the offline worker so reads fall back to the cache and
//! mutations made offline are queued for background sync.
//!
//! Authentication is cookie based; the client carries the session cookie
//! it is given and never stores anything itself.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
