//! Data models for the job-search backend.
//!
//! The backend is loose about shapes (ids arrive as numbers or strings,
//! names as `first_name` or `firstName`), so every model here deserializes
//! leniently and keeps unknown fields out of the way.
//!
//! - `User`, `Registration`: accounts
//! - `Job`, `JobSearch`, `Application`: search and application flow
//! - `PaymentConfig`, `PaymentInit`, `SubscriptionStatus`: billing

pub mod job;
pub mod payment;
pub mod user;

pub use job::{Application, Job, JobSearch, SearchResults};
pub use payment::{PaymentConfig, PaymentInit, PaymentVerification, Plan, SubscriptionStatus};
pub use user::{Registration, User};

pub(crate) mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Accept `"42"`, `42` or null as an optional id string.
    pub fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Accept a number or a numeric string.
    pub fn opt_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }
}

/// Generic `{success, message}` acknowledgement.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct Ack {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}
