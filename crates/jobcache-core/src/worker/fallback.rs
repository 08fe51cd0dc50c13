//! Synthetic responses for when neither network nor cache can answer.

use serde::{Deserialize, Serialize};

use crate::net::StoredResponse;

/// Human-readable text in the offline API body.
pub const OFFLINE_MESSAGE: &str =
    "You are currently offline. Some features may not be available.";

const OFFLINE_ERROR: &str = "Offline";

const SERVICE_UNAVAILABLE: u16 = 503;

/// JSON body of the offline API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct OfflineBody {
    pub error: String,
    pub message: String,
    pub cached: bool,
    /// Set when the request was a mutation that has been queued for sync.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub queued: bool,
}

impl OfflineBody {
    pub fn new(queued: bool) -> Self {
        Self {
            error: OFFLINE_ERROR.to_string(),
            message: OFFLINE_MESSAGE.to_string(),
            cached: false,
            queued,
        }
    }

    /// Recognize the offline body in a response from the worker.
    pub fn from_response(response: &StoredResponse) -> Option<Self> {
        if response.status != SERVICE_UNAVAILABLE {
            return None;
        }
        response
            .json::<Self>()
            .ok()
            .filter(|body| body.error == OFFLINE_ERROR)
    }
}

pub fn offline_api_response(queued: bool) -> StoredResponse {
    // Serializing a struct of strings and bools cannot fail
    let body = serde_json::to_vec(&OfflineBody::new(queued)).unwrap_or_default();
    StoredResponse::new(SERVICE_UNAVAILABLE, "Service Unavailable", body)
        .with_header("Content-Type", "application/json")
}

pub fn offline_static_response() -> StoredResponse {
    StoredResponse::new(
        SERVICE_UNAVAILABLE,
        "Service Unavailable",
        "Offline - Content not available",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_api_body() {
        let resp = offline_api_response(false);
        assert_eq!(resp.status, 503);
        assert_eq!(resp.header("content-type"), Some("application/json"));

        let body: serde_json::Value = resp.json().unwrap();
        assert_eq!(body["error"], "Offline");
        assert_eq!(body["cached"], false);
        assert_eq!(body["message"], OFFLINE_MESSAGE);
        assert!(body.get("queued").is_none());
    }

    #[test]
    fn test_queued_flag() {
        let body = OfflineBody::from_response(&offline_api_response(true)).unwrap();
        assert!(body.queued);
    }

    #[test]
    fn test_static_fallback_is_not_the_api_body() {
        let resp = offline_static_response();
        assert_eq!(resp.status, 503);
        assert!(OfflineBody::from_response(&resp).is_none());
    }

    #[test]
    fn test_ordinary_503_is_not_offline() {
        let resp = StoredResponse::new(503, "Service Unavailable", r#"{"error":"Maintenance"}"#);
        assert!(OfflineBody::from_response(&resp).is_none());
    }
}
