use serde::{Deserialize, Serialize};

use super::de;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    /// `basic` or `premium`.
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub subscription_date: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            self.email.clone().unwrap_or_default()
        } else {
            parts.join(" ")
        }
    }

    /// Avatar initials: first letters of first and last name, else the
    /// first letter of the email, else `U`.
    pub fn initials(&self) -> String {
        let first_char = |s: &Option<String>| s.as_deref().and_then(|s| s.chars().next());

        let initials: String = [first_char(&self.first_name), first_char(&self.last_name)]
            .into_iter()
            .flatten()
            .collect();
        if !initials.is_empty() {
            return initials.to_uppercase();
        }

        first_char(&self.email)
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_else(|| "U".to_string())
    }

    pub fn is_premium(&self) -> bool {
        self.subscription.as_deref() == Some("premium")
    }
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}
