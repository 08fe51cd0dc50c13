use serde_json::Value;
use thiserror::Error;

use crate::net::{FetchError, StoredResponse};
use crate::worker::OfflineBody;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - please log in again")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("{}", offline_text(.queued))]
    Offline { queued: bool },

    #[error("Network error: {0}")]
    NetworkError(#[from] FetchError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn offline_text(queued: &bool) -> &'static str {
    if *queued {
        "You are offline - the request was saved and will be sent when the connection returns"
    } else {
        "You are offline and nothing is cached for this request"
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// The server's own explanation: `message`, then `error`, then the raw
    /// (truncated) body.
    fn detail(body: &str) -> String {
        let field = serde_json::from_str::<Value>(body).ok().and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|k| v.get(k).and_then(Value::as_str).map(str::to_string))
        });
        match field {
            Some(text) if !text.is_empty() => Self::truncate_body(&text),
            _ => Self::truncate_body(body),
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = Self::detail(body);
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(detail),
            _ => ApiError::InvalidResponse(format!("HTTP {}: {}", status, detail)),
        }
    }

    /// Map a non-2xx response, recognizing the worker's offline answer.
    pub fn from_response(response: &StoredResponse) -> Self {
        match OfflineBody::from_response(response) {
            Some(body) => ApiError::Offline { queued: body.queued },
            None => Self::from_status(response.status, &response.text()),
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, ApiError::Offline { .. } | ApiError::NetworkError(_))
    }
}
