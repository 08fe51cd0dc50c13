//! User-visible notifications raised by the worker.
//!
//! The worker builds `Notification` values; showing them is the host's job,
//! behind the `Notifier` trait. A failure to show one is logged and never
//! propagates.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

/// Title used for push notifications.
pub const APP_TITLE: &str = "AI Job Chommie";

/// Icon and badge for every notification.
const APP_ICON: &str = "/logo.png";

/// Body shown when a push message carries no text of its own.
pub const DEFAULT_PUSH_BODY: &str = "Check out new job opportunities!";

/// The "open the app" action.
pub const ACTION_EXPLORE: &str = "explore";

/// The "just dismiss" action.
pub const ACTION_CLOSE: &str = "close";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vibrate: Vec<u32>,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// A plain notification with the app icon.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
            icon: APP_ICON.to_string(),
            badge: APP_ICON.to_string(),
            tag: None,
            vibrate: Vec::new(),
            data: Value::Null,
            actions: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Notification for an inbound push message.
    ///
    /// A payload `body` replaces the default text; payload `data` keys are
    /// merged over the defaults. Anything else in the payload is ignored.
    pub fn from_push(payload: Option<&Value>) -> Self {
        let mut data = Map::new();
        data.insert("dateOfArrival".into(), json!(Utc::now().timestamp_millis()));
        data.insert("primaryKey".into(), json!(1));

        let mut body = DEFAULT_PUSH_BODY.to_string();

        if let Some(payload) = payload {
            if let Some(text) = payload.get("body").and_then(Value::as_str) {
                if !text.is_empty() {
                    body = text.to_string();
                }
            }
            if let Some(extra) = payload.get("data").and_then(Value::as_object) {
                for (k, v) in extra {
                    data.insert(k.clone(), v.clone());
                }
            }
        }

        let action = |action: &str, title: &str| NotificationAction {
            action: action.to_string(),
            title: title.to_string(),
            icon: Some(APP_ICON.to_string()),
        };

        Self {
            vibrate: vec![200, 100, 200],
            data: Value::Object(data),
            actions: vec![action(ACTION_EXPLORE, "View Jobs"), action(ACTION_CLOSE, "Close")],
            ..Self::new(APP_TITLE).with_body(body)
        }
    }
}

/// What a click on a notification should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "url", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// Closed, nothing else.
    Dismissed,
    /// Focus an open app window, or open one at this URL.
    FocusOrOpen(String),
}

impl ClickOutcome {
    /// The notification is always closed; any action but `close` (including
    /// a click on the body itself) brings the app forward.
    pub fn for_action(action: Option<&str>) -> Self {
        match action {
            Some(ACTION_CLOSE) => ClickOutcome::Dismissed,
            _ => ClickOutcome::FocusOrOpen("/".to_string()),
        }
    }
}

/// Displays notifications to the user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<()>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    async fn show(&self, notification: &Notification) -> Result<()> {
        (**self).show(notification).await
    }
}

/// Notifier that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn show(&self, notification: &Notification) -> Result<()> {
        info!(
            title = %notification.title,
            body = %notification.body,
            tag = notification.tag.as_deref().unwrap_or(""),
            "Notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_push() {
        let n = Notification::from_push(None);
        assert_eq!(n.title, APP_TITLE);
        assert_eq!(n.body, DEFAULT_PUSH_BODY);
        assert_eq!(n.vibrate, vec![200, 100, 200]);
        assert_eq!(n.data["primaryKey"], 1);
        assert!(n.data["dateOfArrival"].is_i64());

        let actions: Vec<&str> = n.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["explore", "close"]);
    }

    #[test]
    fn test_push_payload_overrides() {
        let payload = json!({
            "body": "3 new Rust jobs in Cape Town",
            "data": {"primaryKey": 9, "jobId": "abc"},
            "title": "ignored"
        });
        let n = Notification::from_push(Some(&payload));
        assert_eq!(n.title, APP_TITLE);
        assert_eq!(n.body, "3 new Rust jobs in Cape Town");
        assert_eq!(n.data["primaryKey"], 9);
        assert_eq!(n.data["jobId"], "abc");
        assert!(n.data.get("dateOfArrival").is_some());
    }

    #[test]
    fn test_push_without_body_keeps_default() {
        let n = Notification::from_push(Some(&json!({"data": {}})));
        assert_eq!(n.body, DEFAULT_PUSH_BODY);
    }

    #[test]
    fn test_click_outcomes() {
        assert_eq!(ClickOutcome::for_action(Some("close")), ClickOutcome::Dismissed);
        assert_eq!(
            ClickOutcome::for_action(Some("explore")),
            ClickOutcome::FocusOrOpen("/".to_string())
        );
        assert_eq!(
            ClickOutcome::for_action(None),
            ClickOutcome::FocusOrOpen("/".to_string())
        );
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let n = Notification::new("Job application sent successfully!").with_tag("x");
        assert!(LogNotifier.show(&n).await.is_ok());
    }
}
