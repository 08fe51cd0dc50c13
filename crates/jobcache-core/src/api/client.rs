use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::auth::{Session, SessionData};
use crate::models::{
    Ack, Application, Job, JobSearch, PaymentConfig, PaymentInit, PaymentVerification, Plan,
    Registration, SearchResults, SubscriptionStatus, User,
};
use crate::net::{FetchRequest, Fetcher, StoredResponse};

use super::ApiError;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    job: Option<Job>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApplicationsResponse {
    Wrapped { applications: Vec<Application> },
    Bare(Vec<Application>),
}

/// Typed client for the backend's REST API.
pub struct ApiClient<F> {
    fetcher: F,
    base_url: Url,
    cookie: Option<String>,
}

impl<F: Fetcher> ApiClient<F> {
    /// `base_url` is the API root, e.g. `http://localhost:5000/api/`.
    pub fn new(fetcher: F, base_url: Url) -> Self {
        Self {
            fetcher,
            base_url,
            cookie: None,
        }
    }

    /// Send this `Cookie` header with every request.
    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn with_session(self, session: &Session) -> Self {
        let cookie = session.cookie_header();
        self.with_cookie(cookie)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid API path {}", path))
    }

    fn build(&self, method: &str, path: &str, body: Option<&Value>) -> Result<FetchRequest> {
        let url = self.endpoint(path)?;
        let mut request = match body {
            Some(body) => FetchRequest::json(method, url.as_str(), body)?,
            None => FetchRequest::new(method, url.as_str()),
        };
        request = request.with_header("Accept", "application/json");
        if let Some(cookie) = &self.cookie {
            request = request.with_header("Cookie", cookie.clone());
        }
        Ok(request)
    }

    /// Send a request and return the 2xx response, retrying on 429 with
    /// exponential backoff.
    async fn send(&self, method: &str, path: &str, body: Option<&Value>) -> Result<StoredResponse> {
        let request = self.build(method, path, body)?;
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(ApiError::from)?;

            if response.is_ok() {
                debug!(method, path, status = response.status, "API request succeeded");
                return Ok(response);
            }
            if response.status != 429 {
                return Err(ApiError::from_response(&response).into());
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited.into());
            }
            warn!(path, retry = retries, backoff_ms, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2;
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let response = self.send(method, path, body).await?;
        Self::parse(&response, path)
    }

    fn parse<T: DeserializeOwned>(response: &StoredResponse, path: &str) -> Result<T> {
        // Some endpoints answer with an empty body
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(json!({}))
                .map_err(|e| ApiError::InvalidResponse(format!("{}: empty body ({})", path, e)).into());
        }
        response
            .json()
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)).into())
    }

    // ===== Authentication =====

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionData> {
        let body = json!({ "email": email, "password": password });
        let response = self.send("POST", "auth/login", Some(&body)).await?;
        Self::session_from(&response, "auth/login")
    }

    pub async fn register(&self, registration: &Registration) -> Result<SessionData> {
        let body = serde_json::to_value(registration)?;
        let response = self.send("POST", "auth/register", Some(&body)).await?;
        Self::session_from(&response, "auth/register")
    }

    fn session_from(response: &StoredResponse, path: &str) -> Result<SessionData> {
        let auth: AuthResponse = Self::parse(response, path)?;
        let user = auth
            .user
            .ok_or_else(|| ApiError::InvalidResponse(format!("{}: no user in response", path)))?;
        Ok(SessionData::from_response(response, user))
    }

    pub async fn logout(&self) -> Result<()> {
        self.send("POST", "auth/logout", None).await?;
        Ok(())
    }

    /// The logged-in user. Fails with `Unauthorized` when the session is gone.
    pub async fn current_user(&self) -> Result<User> {
        let value: Value = self.request("GET", "auth/me", None).await?;
        // Accept both a bare user and `{user: {...}}`
        let user = match value.get("user") {
            Some(inner) if inner.is_object() => inner.clone(),
            _ => value,
        };
        serde_json::from_value(user)
            .map_err(|e| ApiError::InvalidResponse(format!("auth/me: {}", e)).into())
    }

    // ===== Profile =====

    pub async fn profile(&self) -> Result<Value> {
        self.request("GET", "profile", None).await
    }

    pub async fn update_profile(&self, profile: &Value) -> Result<Value> {
        self.request("PUT", "profile", Some(profile)).await
    }

    // ===== Jobs =====

    pub async fn search_jobs(&self, search: &JobSearch) -> Result<SearchResults> {
        let body = serde_json::to_value(search)?;
        self.request("POST", "jobs/search", Some(&body)).await
    }

    pub async fn job(&self, job_id: &str) -> Result<Job> {
        let path = format!("jobs/{}", job_id);
        let value: Value = self.request("GET", &path, None).await?;
        if value.get("job").is_some() {
            let wrapped: JobResponse = serde_json::from_value(value)?;
            if let Some(job) = wrapped.job {
                return Ok(job);
            }
            return Err(ApiError::NotFound(path).into());
        }
        Ok(serde_json::from_value(value)?)
    }

    pub async fn apply(&self, job_id: &str, application: &Value) -> Result<Ack> {
        let path = format!("jobs/{}/apply", job_id);
        self.request("POST", &path, Some(application)).await
    }

    pub async fn applications(&self) -> Result<Vec<Application>> {
        let response: ApplicationsResponse = self.request("GET", "applications", None).await?;
        Ok(match response {
            ApplicationsResponse::Wrapped { applications } => applications,
            ApplicationsResponse::Bare(applications) => applications,
        })
    }

    pub async fn update_application_status(&self, application_id: &str, status: &str) -> Result<Ack> {
        let path = format!("applications/{}", application_id);
        self.request("PUT", &path, Some(&json!({ "status": status }))).await
    }

    // ===== Payments =====

    pub async fn payment_config(&self) -> Result<PaymentConfig> {
        self.request("GET", "payment/config", None).await
    }

    pub async fn initialize_payment(&self, plan: Plan) -> Result<PaymentInit> {
        self.request("POST", "payment/initialize", Some(&json!({ "plan": plan })))
            .await
    }

    pub async fn verify_payment(&self, reference: &str) -> Result<PaymentVerification> {
        self.request("POST", "payment/verify", Some(&json!({ "reference": reference })))
            .await
    }

    pub async fn subscription_status(&self) -> Result<SubscriptionStatus> {
        self.request("GET", "subscription/status", None).await
    }

    pub async fn cancel_subscription(&self) -> Result<Ack> {
        self.request("POST", "subscription/cancel", None).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::net::FetchError;
    use crate::queue::ActionKind;
    use crate::worker::testing::{fixture, Fixture};

    /// Replays canned responses in order and records every request.
    #[derive(Default)]
    struct StubFetcher {
        replies: Mutex<VecDeque<Result<StoredResponse, FetchError>>>,
        sent: Mutex<Vec<FetchRequest>>,
    }

    impl StubFetcher {
        fn reply(&self, status: u16, body: &str) -> &Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Ok(StoredResponse::new(status, "", body)));
            self
        }

        fn reply_with(&self, response: StoredResponse) -> &Self {
            self.replies.lock().unwrap().push_back(Ok(response));
            self
        }

        fn sent(&self) -> Vec<FetchRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse, FetchError> {
            self.sent.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Unavailable(request.url.clone())))
        }
    }

    fn client() -> (ApiClient<Arc<StubFetcher>>, Arc<StubFetcher>) {
        let stub = Arc::new(StubFetcher::default());
        let base = Url::parse("http://localhost:5000/api/").unwrap();
        (ApiClient::new(stub.clone(), base), stub)
    }

    fn api_error(err: anyhow::Error) -> ApiError {
        err.downcast::<ApiError>().expect("expected an ApiError")
    }

    #[tokio::test]
    async fn test_login_captures_session_cookie() {
        let (api, stub) = client();
        stub.reply_with(
            StoredResponse::new(200, "OK", r#"{"user": {"id": 3, "email": "a@b.co"}}"#)
                .with_header("Set-Cookie", "session=s3cr3t; HttpOnly; Path=/"),
        );

        let session = api.login("a@b.co", "pw").await.unwrap();
        assert_eq!(session.user.id.as_deref(), Some("3"));
        assert_eq!(session.cookie_header().as_deref(), Some("session=s3cr3t"));

        let sent = stub.sent();
        assert_eq!(sent[0].url, "http://localhost:5000/api/auth/login");
        assert_eq!(sent[0].method, "POST");
        assert_eq!(
            sent[0].json_body().unwrap(),
            json!({"email": "a@b.co", "password": "pw"})
        );
    }

    #[tokio::test]
    async fn test_cookie_sent_on_requests() {
        let (api, stub) = client();
        let api = api.with_cookie(Some("session=s3cr3t".into()));
        stub.reply(200, r#"{"id": 3, "first_name": "Ayanda"}"#);

        let user = api.current_user().await.unwrap();
        assert_eq!(user.first_name.as_deref(), Some("Ayanda"));
        assert_eq!(stub.sent()[0].header("Cookie"), Some("session=s3cr3t"));
    }

    #[tokio::test]
    async fn test_error_text_comes_from_body() {
        let (api, stub) = client();
        stub.reply(403, r#"{"message": "Premium plan required"}"#);

        let err = api_error(api.search_jobs(&JobSearch::default()).await.unwrap_err());
        match err {
            ApiError::AccessDenied(text) => assert_eq!(text, "Premium plan required"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let (api, stub) = client();
        stub.reply(401, r#"{"error": "Not logged in"}"#);
        let err = api_error(api.current_user().await.unwrap_err());
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retries_then_succeeds() {
        let (api, stub) = client();
        stub.reply(429, "").reply(429, "").reply(200, r#"{"is_active": true}"#);

        let status = api.subscription_status().await.unwrap();
        assert!(status.is_active);
        assert_eq!(stub.sent().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_gives_up() {
        let (api, stub) = client();
        for _ in 0..=MAX_RATE_LIMIT_RETRIES {
            stub.reply(429, "");
        }
        let err = api_error(api.payment_config().await.unwrap_err());
        assert!(matches!(err, ApiError::RateLimited));
    }

    #[tokio::test]
    async fn test_network_failure() {
        let (api, _stub) = client();
        let err = api_error(api.applications().await.unwrap_err());
        assert!(matches!(err, ApiError::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_applications_bare_or_wrapped() {
        let (api, stub) = client();
        stub.reply(200, r#"[{"id": 1, "job": "Data Analyst", "status": "pending"}]"#)
            .reply(200, r#"{"applications": [{"id": 2}]}"#);

        assert_eq!(api.applications().await.unwrap()[0].job.as_deref(), Some("Data Analyst"));
        assert_eq!(api.applications().await.unwrap()[0].id.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_empty_body_acknowledgement() {
        let (api, stub) = client();
        stub.reply(200, "");
        let ack = api.cancel_subscription().await.unwrap();
        assert!(ack.message.is_none());
    }

    #[tokio::test]
    async fn test_payment_request_bodies() {
        let (api, stub) = client();
        stub.reply(200, r#"{"status": "success", "amount": 29900, "reference": "r1"}"#)
            .reply(200, r#"{"status": "success"}"#);

        let init = api.initialize_payment(Plan::Premium).await.unwrap();
        assert_eq!(init.reference.as_deref(), Some("r1"));
        assert!(api.verify_payment("r1").await.unwrap().is_success());

        let sent = stub.sent();
        assert_eq!(sent[0].json_body().unwrap(), json!({"plan": "premium"}));
        assert_eq!(sent[1].url, "http://localhost:5000/api/payment/verify");
        assert_eq!(sent[1].json_body().unwrap(), json!({"reference": "r1"}));
    }

    #[tokio::test]
    async fn test_offline_apply_through_worker_is_queued() {
        let Fixture { worker, _dir, .. } = fixture();
        let api = ApiClient::new(worker.clone(), worker.settings().api_base());

        let err = api_error(
            api.apply("42", &json!({"cover_letter": "Keen to join"}))
                .await
                .unwrap_err(),
        );

        assert!(matches!(err, ApiError::Offline { queued: true }));
        let queued = worker.queue().list(ActionKind::ApplyJob).unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].payload["application"]["cover_letter"], "Keen to join");
    }

    #[tokio::test]
    async fn test_cached_read_through_worker() {
        let Fixture { worker, net, _dir, .. } = fixture();
        net.respond("http://app.test/api/jobs/5", 200, r#"{"id": 5, "title": "Welder"}"#);
        let api = ApiClient::new(worker.clone(), worker.settings().api_base());

        assert_eq!(api.job("5").await.unwrap().title.as_deref(), Some("Welder"));
        net.fail("http://app.test/api/jobs/5");
        assert_eq!(api.job("5").await.unwrap().title.as_deref(), Some("Welder"));
    }
}
