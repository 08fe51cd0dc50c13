use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::de;

/// Subscription plans offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Basic,
    Premium,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Basic => write!(f, "basic"),
            Plan::Premium => write!(f, "premium"),
        }
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Plan::Basic),
            "premium" => Ok(Plan::Premium),
            other => Err(format!("Unknown plan '{}' (expected basic or premium)", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub paystack_public_key: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Reply to `POST /payment/initialize`. `amount` is in cents.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaymentInit {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl PaymentInit {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaymentVerification {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl PaymentVerification {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SubscriptionStatus {
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub days_remaining: Option<i64>,
    #[serde(default)]
    pub subscription_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_parse() {
        assert_eq!("Premium".parse::<Plan>().unwrap(), Plan::Premium);
        assert!("gold".parse::<Plan>().is_err());
        assert_eq!(serde_json::to_value(Plan::Basic).unwrap(), "basic");
    }

    #[test]
    fn test_subscription_status_defaults() {
        let status: SubscriptionStatus = serde_json::from_str(r#"{"subscription": "basic"}"#).unwrap();
        assert!(!status.is_active);
        assert_eq!(status.days_remaining, None);
    }

    #[test]
    fn test_payment_init() {
        let init: PaymentInit =
            serde_json::from_str(r#"{"status": "success", "amount": 29900, "reference": "ref_1"}"#).unwrap();
        assert!(init.is_success());
        assert_eq!(init.amount, Some(29900.0));
    }
}
