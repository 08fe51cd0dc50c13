use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::control::ControlMessage;
use super::sync::SyncReport;
use super::OfflineWorker;
use crate::net::{FetchRequest, Fetcher, StoredResponse};
use crate::notify::{ClickOutcome, Notification, Notifier};

/// Everything the host platform can ask of the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch {
        request: FetchRequest,
    },
    Sync {
        tag: String,
    },
    Push {
        #[serde(default)]
        data: Option<Value>,
    },
    NotificationClick {
        #[serde(default)]
        action: Option<String>,
    },
    Message {
        message: ControlMessage,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum EventReply {
    Installed,
    Activated { deleted: Vec<String> },
    Response { response: StoredResponse },
    Synced { report: Option<SyncReport> },
    Pushed { notification: Notification },
    Clicked { outcome: ClickOutcome },
    MessageHandled,
    Failed { error: String },
}

impl EventReply {
    fn failed(error: impl std::fmt::Display) -> Self {
        EventReply::Failed {
            error: format!("{:#}", error),
        }
    }
}

impl<F: Fetcher, N: Notifier> OfflineWorker<F, N> {
    /// Handle one event to completion.
    pub async fn dispatch(&self, event: WorkerEvent) -> EventReply {
        match event {
            WorkerEvent::Install => match self.install().await {
                Ok(()) => EventReply::Installed,
                Err(e) => EventReply::failed(e),
            },
            WorkerEvent::Activate => match self.activate().await {
                Ok(deleted) => EventReply::Activated { deleted },
                Err(e) => EventReply::failed(e),
            },
            WorkerEvent::Fetch { request } => match self.handle_fetch(&request).await {
                Ok(response) => EventReply::Response { response },
                Err(e) => EventReply::failed(e),
            },
            WorkerEvent::Sync { tag } => match self.handle_sync(&tag).await {
                Ok(report) => EventReply::Synced { report },
                Err(e) => EventReply::failed(e),
            },
            WorkerEvent::Push { data } => EventReply::Pushed {
                notification: self.handle_push(data.as_ref()).await,
            },
            WorkerEvent::NotificationClick { action } => EventReply::Clicked {
                outcome: self.handle_notification_click(action.as_deref()),
            },
            WorkerEvent::Message { message } => match self.handle_message(&message).await {
                Ok(()) => EventReply::MessageHandled,
                Err(e) => EventReply::failed(e),
            },
        }
    }

    /// Show the notification for an inbound push message.
    pub async fn handle_push(&self, data: Option<&Value>) -> Notification {
        let notification = Notification::from_push(data);
        info!(body = %notification.body, "Push received");
        self.notify(&notification).await;
        notification
    }

    pub fn handle_notification_click(&self, action: Option<&str>) -> ClickOutcome {
        let outcome = ClickOutcome::for_action(action);
        debug!(action = action.unwrap_or(""), outcome = ?outcome, "Notification clicked");
        outcome
    }
}

impl<F, N> OfflineWorker<F, N>
where
    F: Fetcher + 'static,
    N: Notifier + 'static,
{
    /// Handle events until the sender side closes, one task per event.
    ///
    /// Replies carry the caller's correlation value and arrive in
    /// completion order, not submission order. Returns once every spawned
    /// handler has finished.
    pub async fn serve<T: Send + 'static>(
        &self,
        mut events: mpsc::Receiver<(T, WorkerEvent)>,
        replies: mpsc::Sender<(T, EventReply)>,
    ) {
        let mut handlers = JoinSet::new();

        while let Some((id, event)) = events.recv().await {
            let worker = self.clone();
            let replies = replies.clone();
            handlers.spawn(async move {
                let reply = worker.dispatch(event).await;
                if replies.send((id, reply)).await.is_err() {
                    debug!("Reply channel closed");
                }
            });
        }

        while let Some(joined) = handlers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Event handler panicked");
            }
        }
    }
}
