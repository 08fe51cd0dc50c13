//! reqwest-backed transport.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client, Method};
use tracing::debug;

use super::{FetchError, FetchRequest, Fetcher, StoredResponse};

/// HTTP request timeout in seconds.
/// The worker applies its own shorter bound to API calls; this only stops
/// a stalled connection from hanging forever.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Transport that sends requests over the real network.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("jobcache/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    fn build(&self, request: &FetchRequest) -> Result<reqwest::RequestBuilder, FetchError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchError::InvalidRequest(format!("bad method {}", request.method)))?;
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| FetchError::InvalidRequest(format!("{}: {}", request.url, e)))?;

        let mut headers = header::HeaderMap::new();
        for (name, value) in &request.headers {
            let name = header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::InvalidRequest(format!("header {}: {}", name, e)))?;
            let value = header::HeaderValue::from_str(value)
                .map_err(|e| FetchError::InvalidRequest(format!("header value: {}", e)))?;
            headers.append(name, value);
        }

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }
        Ok(builder)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse, FetchError> {
        debug!(method = %request.method, url = %request.url, "Network fetch");

        let response = self.build(request)?.send().await.map_err(|e| {
            if e.is_connect() {
                FetchError::Unavailable(e.to_string())
            } else {
                FetchError::Network(e)
            }
        })?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(StoredResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}
