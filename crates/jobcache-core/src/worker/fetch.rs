use std::time::Duration;

use tracing::{debug, error, info, warn};
use url::Url;

use super::fallback::{offline_api_response, offline_static_response};
use super::route::Route;
use super::OfflineWorker;
use crate::cache::{CacheEntry, CacheKey};
use crate::net::{FetchError, FetchRequest, Fetcher, StoredResponse};
use crate::notify::Notifier;
use crate::queue::PendingAction;

impl<F: Fetcher, N: Notifier> OfflineWorker<F, N> {
    /// Answer one intercepted request.
    ///
    /// GET requests always get a response: live, cached, or synthetic.
    /// Other methods go to the network untouched; their errors surface
    /// unless the request was a syncable mutation, in which case it is
    /// queued and the offline body comes back with `queued: true`.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<StoredResponse, FetchError> {
        let url = self.resolve(&request.url)?;
        let outbound = request.with_url(url.as_str());

        let response = match Route::classify(&request.method, url.path()) {
            Route::Bypass => return self.pass_through(&outbound, &url).await,
            Route::Liveness => self.serve_api(&outbound, &url, None).await,
            Route::Api => {
                let bound = self.settings().api_timeout;
                self.serve_api(&outbound, &url, Some(bound)).await
            }
            Route::Static => self.serve_static(&outbound, &url).await,
        };
        Ok(response)
    }

    async fn pass_through(
        &self,
        request: &FetchRequest,
        url: &Url,
    ) -> Result<StoredResponse, FetchError> {
        let err = match self.inner.fetcher.fetch(request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        match PendingAction::capture(request, url.path()) {
            None => Err(err),
            Some(Err(invalid)) => {
                warn!(url = %url, error = %invalid, "Cannot queue offline request");
                Err(err)
            }
            Some(Ok(action)) => match self.queue().enqueue(&action) {
                Ok(()) => {
                    info!(url = %url, kind = %action.kind, "Network unavailable, request queued");
                    Ok(offline_api_response(true))
                }
                Err(e) => {
                    error!(url = %url, error = %e, "Failed to queue offline request");
                    Err(err)
                }
            },
        }
    }

    async fn serve_api(&self, request: &FetchRequest, url: &Url, bound: Option<Duration>) -> StoredResponse {
        let names = &self.settings().names;
        let key = CacheKey::new(&request.method, url);

        match self.network_first(request, &key, &names.api, bound).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    info!(url = %url, error = %e, "API call timed out, trying cache");
                } else {
                    debug!(url = %url, error = %e, "Network failed for API, trying cache");
                }
                match self.caches().lookup(&[&names.api, &names.static_assets], &key) {
                    Some(entry) => {
                        debug!(url = %url, age = %entry.age_display(), "Serving API from cache");
                        entry.response
                    }
                    None => offline_api_response(false),
                }
            }
        }
    }

    async fn serve_static(&self, request: &FetchRequest, url: &Url) -> StoredResponse {
        let names = &self.settings().names;
        let key = CacheKey::new(&request.method, url);

        let err = match self.network_first(request, &key, &names.static_assets, None).await {
            Ok(response) => return response,
            Err(e) => e,
        };

        debug!(url = %url, error = %err, "Network failed, trying cache");
        if let Some(entry) = self.caches().lookup(&[&names.static_assets, &names.api], &key) {
            debug!(url = %url, "Serving from cache");
            return entry.response;
        }

        if request.is_navigation() {
            if let Some(page) = self.offline_page() {
                info!(url = %url, "Serving offline page");
                return page;
            }
            warn!(url = %url, "Offline page is not cached");
        }

        offline_static_response()
    }

    /// Try the network, optionally within `bound`, and cache a 2xx answer.
    ///
    /// Dropping the in-flight future on timeout cancels the request.
    async fn network_first(
        &self,
        request: &FetchRequest,
        key: &CacheKey,
        namespace: &str,
        bound: Option<Duration>,
    ) -> Result<StoredResponse, FetchError> {
        let attempt = self.inner.fetcher.fetch(request);
        let response = match bound {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .map_err(|_| FetchError::Timeout(limit))??,
            None => attempt.await?,
        };

        if response.is_ok() {
            let entry = CacheEntry::new(key.clone(), response.clone());
            if let Err(e) = self.caches().put(namespace, &entry) {
                warn!(url = %key.url, error = %e, "Failed to cache response");
            }
        }

        Ok(response)
    }

    fn offline_page(&self) -> Option<StoredResponse> {
        let names = &self.settings().names;
        let url = self.resolve(&self.settings().offline_page).ok()?;
        self.caches()
            .lookup(&[&names.static_assets], &CacheKey::get(&url))
            .map(|entry| entry.response)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{json, Value};

    use super::super::testing::{fixture, Fixture};
    use crate::net::{FetchRequest, RequestMode};
    use crate::queue::ActionKind;

    #[tokio::test]
    async fn test_cached_body_is_served_byte_for_byte_after_failure() {
        let Fixture { worker, net, _dir, .. } = fixture();
        let body: Vec<u8> = vec![0x7b, 0x22, 0x6a, 0x22, 0x3a, 0xe2, 0x82, 0xac, 0x7d, 0x00, 0xff];
        net.respond("http://app.test/api/jobs/7", 200, body.clone());

        let live = worker.handle_fetch(&FetchRequest::get("/api/jobs/7")).await.unwrap();
        assert_eq!(live.body, body);

        net.fail("http://app.test/api/jobs/7");
        let cached = worker.handle_fetch(&FetchRequest::get("/api/jobs/7")).await.unwrap();
        assert_eq!(cached.status, 200);
        assert_eq!(cached.body, body);
    }

    #[tokio::test]
    async fn test_static_asset_cached_then_served_offline() {
        let Fixture { worker, net, _dir, .. } = fixture();
        net.respond("http://app.test/js/app.js", 200, "let app = 1;");

        worker.handle_fetch(&FetchRequest::get("/js/app.js")).await.unwrap();
        net.fail("http://app.test/js/app.js");

        let resp = worker.handle_fetch(&FetchRequest::get("http://app.test/js/app.js")).await.unwrap();
        assert_eq!(resp.text(), "let app = 1;");
    }

    #[tokio::test]
    async fn test_liveness_always_tries_network_first() {
        let Fixture { worker, net, _dir, .. } = fixture();
        net.respond("http://app.test/api/health", 200, r#"{"status":"ok","n":1}"#);
        worker.handle_fetch(&FetchRequest::get("/api/health")).await.unwrap();

        net.respond("http://app.test/api/health", 200, r#"{"status":"ok","n":2}"#);
        let resp = worker.handle_fetch(&FetchRequest::get("/api/health")).await.unwrap();

        assert_eq!(resp.json::<Value>().unwrap()["n"], 2);
        assert_eq!(net.calls_to("http://app.test/api/health"), 2);
    }

    #[tokio::test]
    async fn test_liveness_falls_back_to_cache() {
        let Fixture { worker, net, _dir, .. } = fixture();
        net.respond("http://app.test/api/status", 200, "up");
        worker.handle_fetch(&FetchRequest::get("/api/status")).await.unwrap();

        net.fail("http://app.test/api/status");
        let resp = worker.handle_fetch(&FetchRequest::get("/api/status")).await.unwrap();
        assert_eq!(resp.text(), "up");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_api_without_cache_returns_offline_body() {
        let Fixture { worker, net, _dir, .. } = fixture();
        net.delay("http://app.test/api/profile", Duration::from_secs(30), 200, "{}");

        let resp = worker.handle_fetch(&FetchRequest::get("/api/profile")).await.unwrap();

        assert_eq!(resp.status, 503);
        let body: Value = resp.json().unwrap();
        assert_eq!(body["error"], "Offline");
        assert_eq!(body["cached"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_api_with_cache_serves_cache() {
        let Fixture { worker, net, _dir, .. } = fixture();
        net.respond("http://app.test/api/subscription/status", 200, r#"{"is_active":true}"#);
        worker
            .handle_fetch(&FetchRequest::get("/api/subscription/status"))
            .await
            .unwrap();

        net.delay("http://app.test/api/subscription/status", Duration::from_secs(6), 200, "late");
        let resp = worker
            .handle_fetch(&FetchRequest::get("/api/subscription/status"))
            .await
            .unwrap();
        assert_eq!(resp.text(), r#"{"is_active":true}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn test_liveness_is_not_time_bounded() {
        let Fixture { worker, net, _dir, .. } = fixture();
        net.delay("http://app.test/api/health", Duration::from_secs(20), 200, "slow but fine");

        let resp = worker.handle_fetch(&FetchRequest::get("/api/health")).await.unwrap();
        assert_eq!(resp.text(), "slow but fine");
    }

    #[tokio::test]
    async fn test_navigation_gets_offline_page() {
        let Fixture { worker, net, _dir, .. } = fixture();
        net.respond("http://app.test/offline.html", 200, "<h1>Offline</h1>");
        worker.handle_fetch(&FetchRequest::get("/offline.html")).await.unwrap();

        let resp = worker.handle_fetch(&FetchRequest::navigate("/dashboard")).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.text(), "<h1>Offline</h1>");
    }

    #[tokio::test]
    async fn test_navigation_without_offline_page_gets_generic_503() {
        let Fixture { worker, _dir, .. } = fixture();

        let resp = worker.handle_fetch(&FetchRequest::navigate("/dashboard")).await.unwrap();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.text(), "Offline - Content not available");
    }

    #[tokio::test]
    async fn test_non_navigation_miss_gets_generic_503() {
        let Fixture { worker, net, _dir, .. } = fixture();
        net.respond("http://app.test/offline.html", 200, "<h1>Offline</h1>");
        worker.handle_fetch(&FetchRequest::get("/offline.html")).await.unwrap();

        let resp = worker.handle_fetch(&FetchRequest::get("/logo.png")).await.unwrap();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.text(), "Offline - Content not available");
    }

    #[tokio::test]
    async fn test_error_statuses_are_returned_but_not_cached() {
        let Fixture { worker, net, _dir, .. } = fixture();
        net.respond("http://app.test/api/auth/me", 401, r#"{"error":"Unauthorized"}"#);

        let resp = worker.handle_fetch(&FetchRequest::get("/api/auth/me")).await.unwrap();
        assert_eq!(resp.status, 401);

        net.fail("http://app.test/api/auth/me");
        let resp = worker.handle_fetch(&FetchRequest::get("/api/auth/me")).await.unwrap();
        assert_eq!(resp.status, 503);
    }

    #[tokio::test]
    async fn test_mutation_passes_through_when_online() {
        let Fixture { worker, net, _dir, .. } = fixture();
        net.respond("http://app.test/api/jobs/search", 200, r#"{"jobs":[]}"#);

        let req = FetchRequest::json("POST", "/api/jobs/search", &json!({"keywords": "rust"})).unwrap();
        let resp = worker.handle_fetch(&req).await.unwrap();

        assert_eq!(resp.status, 200);
        assert!(worker.caches().entries(&worker.settings().names.api).unwrap().is_empty());
        assert_eq!(worker.queue().len(ActionKind::SearchJobs).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_mutation_is_queued() {
        let Fixture { worker, _dir, .. } = fixture();

        let req = FetchRequest::json("POST", "/api/jobs/99/apply", &json!({"cover_letter": "Hi"})).unwrap();
        let resp = worker.handle_fetch(&req).await.unwrap();

        assert_eq!(resp.status, 503);
        assert_eq!(resp.json::<Value>().unwrap()["queued"], true);

        let queued = worker.queue().list(ActionKind::ApplyJob).unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].payload["job_id"], "99");
    }

    #[tokio::test]
    async fn test_offline_unsyncable_mutation_surfaces_error() {
        let Fixture { worker, _dir, .. } = fixture();
        let req = FetchRequest::new("POST", "/api/auth/logout");
        assert!(worker.handle_fetch(&req).await.is_err());
        assert!(worker.queue().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_request_mode_does_not_change_cache_key() {
        let Fixture { worker, net, _dir, .. } = fixture();
        net.respond("http://app.test/", 200, "<html>home</html>");
        worker.handle_fetch(&FetchRequest::navigate("/")).await.unwrap();

        net.fail("http://app.test/");
        let mut req = FetchRequest::get("/");
        req.mode = RequestMode::Cors;
        let resp = worker.handle_fetch(&req).await.unwrap();
        assert_eq!(resp.text(), "<html>home</html>");
    }
}
