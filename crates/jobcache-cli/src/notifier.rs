use anyhow::Result;
use async_trait::async_trait;
use jobcache_core::{Notification, Notifier};
use tracing::info;

/// Shows notifications on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn show(&self, notification: &Notification) -> Result<()> {
        info!(title = %notification.title, tag = ?notification.tag, "Showing notification");
        eprintln!("{}", render(notification));
        Ok(())
    }
}

fn render(notification: &Notification) -> String {
    if notification.body.is_empty() {
        format!("[notification] {}", notification.title)
    } else {
        format!("[notification] {}: {}", notification.title, notification.body)
    }
}
