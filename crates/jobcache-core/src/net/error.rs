use std::time::Duration;

use thiserror::Error;

/// A request that never produced a response.
///
/// Non-2xx statuses are not errors at this layer; they arrive as a
/// `StoredResponse` and the caller decides what they mean.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("No response within {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Connection unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Timeout(_) => true,
            FetchError::Network(e) => e.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_timeout() {
        assert!(FetchError::Timeout(Duration::from_secs(5)).is_timeout());
        assert!(!FetchError::Unavailable("http://app.test/".into()).is_timeout());
        assert!(!FetchError::InvalidRequest("bad method".into()).is_timeout());
    }
}
