use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::OfflineWorker;
use crate::net::{FetchError, Fetcher, StoredResponse};
use crate::notify::{Notification, Notifier};
use crate::queue::{ActionKind, PendingAction};

const APPLICATION_SENT: &str = "Job application sent successfully!";
const APPLICATION_TAG: &str = "job-application-success";
const SEARCH_RESULTS_TAG: &str = "job-search-results";

/// Why a queued action could not be delivered this time round.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Network error: {0}")]
    Network(#[from] FetchError),

    #[error("Server rejected the request with HTTP {status}")]
    Rejected { status: u16 },

    #[error("{0}")]
    InvalidPayload(String),
}

/// Outcome of one sync trigger for one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SyncReport {
    pub kind: ActionKind,
    /// Ids delivered and removed from the queue.
    pub replayed: Vec<String>,
    /// Ids still queued for the next trigger.
    pub retained: Vec<String>,
    pub notifications: usize,
}

impl SyncReport {
    fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            replayed: Vec::new(),
            retained: Vec::new(),
            notifications: 0,
        }
    }
}

impl<F: Fetcher, N: Notifier> OfflineWorker<F, N> {
    /// Handle a background-sync trigger by tag. Unknown tags are ignored.
    pub async fn handle_sync(&self, tag: &str) -> Result<Option<SyncReport>> {
        match ActionKind::from_tag(tag) {
            Some(kind) => self.sync(kind).await.map(Some),
            None => {
                warn!(tag, "Ignoring unknown sync tag");
                Ok(None)
            }
        }
    }

    /// Replay every pending action of `kind`, oldest first.
    ///
    /// Each action is attempted once. Delivered actions are removed; the
    /// rest stay queued untouched. Syncs of the same kind run one at a
    /// time, so a trigger that arrives mid-sync only sees what is left.
    pub async fn sync(&self, kind: ActionKind) -> Result<SyncReport> {
        let _running = self.inner.sync_locks[kind.index()].lock().await;
        let pending = self.queue().list(kind)?;
        let mut report = SyncReport::new(kind);
        if pending.is_empty() {
            debug!(kind = %kind, "Nothing to sync");
            return Ok(report);
        }

        info!(kind = %kind, count = pending.len(), "Replaying queued actions");
        for action in pending {
            match self.replay(&action).await {
                Ok(response) => {
                    if let Err(e) = self.queue().remove(kind, &action.id) {
                        error!(id = %action.id, error = %e, "Replayed action could not be removed");
                    }
                    report.notifications += self.announce(&action, &response).await;
                    report.replayed.push(action.id);
                }
                Err(e) => {
                    warn!(kind = %kind, id = %action.id, error = %e, "Replay failed, keeping action");
                    report.retained.push(action.id);
                }
            }
        }

        Ok(report)
    }

    /// Sync all three kinds concurrently.
    pub async fn sync_all(&self) -> Result<Vec<SyncReport>> {
        let (apply, profile, search) = futures::join!(
            self.sync(ActionKind::ApplyJob),
            self.sync(ActionKind::UpdateProfile),
            self.sync(ActionKind::SearchJobs),
        );
        Ok(vec![apply?, profile?, search?])
    }

    /// Deliver one action straight to the network.
    ///
    /// Replays never go through the cache strategies, so a failed replay
    /// cannot enqueue a duplicate.
    async fn replay(&self, action: &PendingAction) -> Result<StoredResponse, ReplayError> {
        let mut request = action
            .replay_request(&self.settings().api_base())
            .map_err(|e| ReplayError::InvalidPayload(e.to_string()))?;
        if let Some(cookie) = &self.settings().credentials {
            request = request.with_header("Cookie", cookie.clone());
        }

        let response = self.inner.fetcher.fetch(&request).await?;
        if !response.is_ok() {
            return Err(ReplayError::Rejected {
                status: response.status,
            });
        }
        debug!(kind = %action.kind, id = %action.id, status = response.status, "Replayed action");
        Ok(response)
    }

    /// Raise the user-visible notification for a delivered action, if any.
    async fn announce(&self, action: &PendingAction, response: &StoredResponse) -> usize {
        let notification = match action.kind {
            ActionKind::ApplyJob => Notification::new(APPLICATION_SENT).with_tag(APPLICATION_TAG),
            ActionKind::SearchJobs => {
                let found = response
                    .json::<Value>()
                    .ok()
                    .and_then(|body| body.get("jobs").and_then(Value::as_array).map(Vec::len))
                    .unwrap_or(0);
                if found == 0 {
                    return 0;
                }
                Notification::new(format!("Found {} new job matches!", found))
                    .with_tag(SEARCH_RESULTS_TAG)
            }
            ActionKind::UpdateProfile => return 0,
        };

        if self.notify(&notification).await {
            1
        } else {
            0
        }
    }

    /// Show a notification; failures are logged and swallowed.
    pub(crate) async fn notify(&self, notification: &Notification) -> bool {
        match self.inner.notifier.show(notification).await {
            Ok(()) => true,
            Err(e) => {
                error!(title = %notification.title, error = %e, "Failed to show notification");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::testing::{fixture, fixture_with, Fixture};
    use super::*;

    #[tokio::test]
    async fn test_overlapping_triggers_deliver_once() {
        let Fixture { worker, net, notes, _dir } = fixture();
        let action = PendingAction::apply_job("9", json!({"cover_letter": "hi"}));
        worker.queue().enqueue(&action).unwrap();
        net.delay(
            "http://app.test/api/jobs/9/apply",
            std::time::Duration::from_millis(50),
            200,
            r#"{"success":true}"#,
        );

        let (first, second) = futures::join!(
            worker.handle_sync("apply-job"),
            worker.handle_sync("apply-job")
        );
        let first = first.unwrap().unwrap();
        let second = second.unwrap().unwrap();

        assert_eq!(net.calls_to("http://app.test/api/jobs/9/apply"), 1);
        assert_eq!(first.replayed.len() + second.replayed.len(), 1);
        assert_eq!(notes.shown().len(), 1);
        assert!(worker.queue().list(ActionKind::ApplyJob).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_failed_action_remains() {
        let Fixture { worker, net, notes, _dir } = fixture();
        let a = PendingAction::apply_job("1", json!({"cover_letter": "A"}));
        let b = PendingAction::apply_job("2", json!({"cover_letter": "B"}));
        let c = PendingAction::apply_job("3", json!({"cover_letter": "C"}));
        for action in [&a, &b, &c] {
            worker.queue().enqueue(action).unwrap();
        }
        net.respond("http://app.test/api/jobs/1/apply", 200, r#"{"success":true}"#);
        net.fail("http://app.test/api/jobs/2/apply");
        net.respond("http://app.test/api/jobs/3/apply", 201, r#"{"success":true}"#);

        let report = worker.sync(ActionKind::ApplyJob).await.unwrap();

        let mut replayed = report.replayed.clone();
        replayed.sort();
        let mut expected = vec![a.id.clone(), c.id.clone()];
        expected.sort();
        assert_eq!(replayed, expected);
        assert_eq!(report.retained, vec![b.id.clone()]);
        let left = worker.queue().list(ActionKind::ApplyJob).unwrap();
        assert_eq!(left, vec![b]);

        let shown = notes.shown();
        assert_eq!(shown.len(), 2);
        assert!(shown.iter().all(|n| n.title == APPLICATION_SENT));
        assert!(shown.iter().all(|n| n.tag.as_deref() == Some(APPLICATION_TAG)));
    }

    #[tokio::test]
    async fn test_action_survives_failed_syncs_until_success() {
        let Fixture { worker, net, _dir, .. } = fixture();
        let action = PendingAction::update_profile(json!({"firstName": "Thandi"}));
        worker.queue().enqueue(&action).unwrap();

        net.fail("http://app.test/api/profile");
        worker.handle_sync("update-profile").await.unwrap();
        net.respond("http://app.test/api/profile", 500, "");
        worker.handle_sync("update-profile").await.unwrap();
        assert_eq!(worker.queue().len(ActionKind::UpdateProfile).unwrap(), 1);

        net.respond("http://app.test/api/profile", 200, "{}");
        let report = worker.handle_sync("update-profile").await.unwrap().unwrap();
        assert_eq!(report.replayed, vec![action.id]);
        assert!(worker.queue().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_replay_sends_queued_request() {
        let Fixture { worker, net, _dir, .. } = fixture_with(|s| {
            s.credentials = Some("sid=abc".into());
        });
        let action = PendingAction::update_profile(json!({"location": "Durban"}));
        worker.queue().enqueue(&action).unwrap();
        net.respond("http://app.test/api/profile", 200, "{}");

        worker.sync(ActionKind::UpdateProfile).await.unwrap();

        let sent = net.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, "PUT");
        assert_eq!(sent[0].header("Cookie"), Some("sid=abc"));
        assert_eq!(sent[0].json_body().unwrap(), json!({"location": "Durban"}));
    }

    #[tokio::test]
    async fn test_search_notification_counts_jobs() {
        let Fixture { worker, net, notes, _dir } = fixture();
        worker
            .queue()
            .enqueue(&PendingAction::search_jobs(json!({"keywords": "rust"})))
            .unwrap();
        net.respond(
            "http://app.test/api/jobs/search",
            200,
            r#"{"jobs":[{"id":1},{"id":2},{"id":3}]}"#,
        );

        let report = worker.sync(ActionKind::SearchJobs).await.unwrap();

        assert_eq!(report.notifications, 1);
        let shown = notes.shown();
        assert_eq!(shown[0].title, "Found 3 new job matches!");
        assert_eq!(shown[0].tag.as_deref(), Some(SEARCH_RESULTS_TAG));
    }

    #[tokio::test]
    async fn test_empty_search_result_is_silent() {
        let Fixture { worker, net, notes, _dir } = fixture();
        worker
            .queue()
            .enqueue(&PendingAction::search_jobs(json!({})))
            .unwrap();
        net.respond("http://app.test/api/jobs/search", 200, r#"{"jobs":[]}"#);

        let report = worker.sync(ActionKind::SearchJobs).await.unwrap();
        assert_eq!(report.replayed.len(), 1);
        assert!(notes.shown().is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_keep_action() {
        let Fixture { worker, net, notes, _dir } = fixture();
        notes.fail_next();
        worker
            .queue()
            .enqueue(&PendingAction::apply_job("5", json!({})))
            .unwrap();
        net.respond("http://app.test/api/jobs/5/apply", 200, "{}");

        let report = worker.sync(ActionKind::ApplyJob).await.unwrap();
        assert_eq!(report.notifications, 0);
        assert!(worker.queue().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_unknown_tag_is_ignored() {
        let Fixture { worker, _dir, .. } = fixture();
        assert!(worker.handle_sync("sync-everything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sync_all_covers_every_kind() {
        let Fixture { worker, net, _dir, .. } = fixture();
        worker.queue().enqueue(&PendingAction::apply_job("8", json!({}))).unwrap();
        worker.queue().enqueue(&PendingAction::update_profile(json!({}))).unwrap();
        net.respond("http://app.test/api/jobs/8/apply", 200, "{}");
        net.respond("http://app.test/api/profile", 200, "{}");

        let reports = worker.sync_all().await.unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports.iter().map(|r| r.replayed.len()).sum::<usize>(), 2);
        assert!(worker.queue().is_empty().unwrap());
    }
}
