use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

use crate::net::FetchRequest;

/// The kinds of offline action that can be replayed.
///
/// Serialized as the background-sync tag (`apply-job`, `update-profile`,
/// `search-jobs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ActionKind {
    ApplyJob,
    UpdateProfile,
    SearchJobs,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [
        ActionKind::ApplyJob,
        ActionKind::UpdateProfile,
        ActionKind::SearchJobs,
    ];

    /// Background-sync tag for this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            ActionKind::ApplyJob => "apply-job",
            ActionKind::UpdateProfile => "update-profile",
            ActionKind::SearchJobs => "search-jobs",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }

    /// Position in [`ActionKind::ALL`].
    pub fn index(&self) -> usize {
        match self {
            ActionKind::ApplyJob => 0,
            ActionKind::UpdateProfile => 1,
            ActionKind::SearchJobs => 2,
        }
    }

    /// Recognize a syncable mutation from its method and URL path.
    ///
    /// Returns the kind plus the job id for applications.
    pub fn match_request(method: &str, path: &str) -> Option<(Self, Option<String>)> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let method = method.to_ascii_uppercase();

        match (method.as_str(), segments.as_slice()) {
            ("POST", ["api", "jobs", "search"]) => Some((ActionKind::SearchJobs, None)),
            ("POST", ["api", "jobs", id, "apply"]) if !id.is_empty() => {
                Some((ActionKind::ApplyJob, Some(id.to_string())))
            }
            ("PUT", ["api", "profile"]) => Some((ActionKind::UpdateProfile, None)),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Error, Debug)]
#[error("Invalid {kind} payload: {reason}")]
pub struct InvalidPayload {
    pub kind: ActionKind,
    pub reason: String,
}

/// One queued request awaiting delivery. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PendingAction {
    pub id: String,
    pub kind: ActionKind,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn new(kind: ActionKind, payload: Value) -> Self {
        let created_at = Utc::now();
        Self {
            id: new_action_id(created_at),
            kind,
            payload,
            created_at,
        }
    }

    pub fn apply_job(job_id: &str, application: Value) -> Self {
        Self::new(
            ActionKind::ApplyJob,
            json!({ "job_id": job_id, "application": application }),
        )
    }

    pub fn update_profile(data: Value) -> Self {
        Self::new(ActionKind::UpdateProfile, json!({ "data": data }))
    }

    pub fn search_jobs(params: Value) -> Self {
        Self::new(ActionKind::SearchJobs, json!({ "params": params }))
    }

    /// Capture an outbound mutation that could not be delivered.
    ///
    /// Returns `None` for requests that are not one of the three syncable
    /// kinds; those are simply lost when offline, as they would be without
    /// the worker.
    pub fn capture(request: &FetchRequest, path: &str) -> Option<Result<Self, InvalidPayload>> {
        let (kind, job_id) = ActionKind::match_request(&request.method, path)?;
        let body = match request.json_body() {
            Ok(body) => body,
            Err(e) => {
                return Some(Err(InvalidPayload {
                    kind,
                    reason: e.to_string(),
                }))
            }
        };
        let body = if body.is_null() { json!({}) } else { body };

        Some(Ok(match kind {
            ActionKind::ApplyJob => Self::apply_job(job_id.as_deref().unwrap_or_default(), body),
            ActionKind::UpdateProfile => Self::update_profile(body),
            ActionKind::SearchJobs => Self::search_jobs(body),
        }))
    }

    /// The request that delivers this action, relative to the API base
    /// (e.g. `http://localhost:5000/api/`).
    pub fn replay_request(&self, api_base: &Url) -> Result<FetchRequest, InvalidPayload> {
        let invalid = |reason: &str| InvalidPayload {
            kind: self.kind,
            reason: reason.to_string(),
        };

        let (method, path, body) = match self.kind {
            ActionKind::ApplyJob => {
                let job_id = self
                    .payload
                    .get("job_id")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| invalid("missing job_id"))?;
                let body = self.payload.get("application").cloned().unwrap_or(json!({}));
                ("POST", format!("jobs/{}/apply", job_id), body)
            }
            ActionKind::UpdateProfile => {
                let body = self
                    .payload
                    .get("data")
                    .cloned()
                    .ok_or_else(|| invalid("missing data"))?;
                ("PUT", "profile".to_string(), body)
            }
            ActionKind::SearchJobs => {
                let body = self
                    .payload
                    .get("params")
                    .cloned()
                    .ok_or_else(|| invalid("missing params"))?;
                ("POST", "jobs/search".to_string(), body)
            }
        };

        let url = api_base
            .join(&path)
            .map_err(|e| invalid(&format!("bad url: {}", e)))?;
        FetchRequest::json(method, url.as_str(), &body).map_err(|e| invalid(&e.to_string()))
    }
}

/// Actions created by this process, in creation order.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Time-ordered id: creation millis, a per-process sequence number, then a
/// random suffix so ids from separate processes do not collide.
fn new_action_id(created_at: DateTime<Utc>) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let suffix: u16 = rand::thread_rng().gen();
    format!("{:013}-{:012x}-{:04x}", created_at.timestamp_millis(), seq, suffix)
}
