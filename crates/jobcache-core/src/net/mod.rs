//! Network transport for the worker and the API client.
//!
//! Requests and responses are plain owned values (`FetchRequest`,
//! `StoredResponse`) so they can be cached, queued and serialized without
//! holding on to a live connection. The `Fetcher` trait is the seam between
//! the worker and the real network; `HttpFetcher` implements it on reqwest.

pub mod error;
pub mod http;
pub mod types;

use async_trait::async_trait;

pub use error::FetchError;
pub use http::HttpFetcher;
pub use types::{FetchRequest, RequestMode, StoredResponse};

/// Anything that can turn a request into a response.
///
/// Implemented by the raw network (`HttpFetcher`) and by the offline worker
/// itself, so the API client can be pointed at either.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse, FetchError>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for std::sync::Arc<T> {
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse, FetchError> {
        (**self).fetch(request).await
    }
}
