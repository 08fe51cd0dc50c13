//! In-memory fakes for the worker tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tempfile::TempDir;
use url::Url;

use super::{OfflineWorker, WorkerSettings};
use crate::net::{FetchError, FetchRequest, Fetcher, StoredResponse};
use crate::notify::{Notification, Notifier};

pub const ORIGIN: &str = "http://app.test/";

#[derive(Clone)]
enum Script {
    Respond(StoredResponse),
    Fail,
    Delay(Duration, StoredResponse),
}

/// Answers by exact URL. Unscripted URLs behave like an unreachable host.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<FetchRequest>>,
}

impl ScriptedFetcher {
    fn set(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
    }

    pub fn respond(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.set(url, Script::Respond(StoredResponse::new(status, "", body)));
    }

    pub fn fail(&self, url: &str) {
        self.set(url, Script::Fail);
    }

    pub fn delay(&self, url: &str, wait: Duration, status: u16, body: impl Into<Vec<u8>>) {
        self.set(url, Script::Delay(wait, StoredResponse::new(status, "", body)));
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| r.url == url).count()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse, FetchError> {
        self.calls.lock().unwrap().push(request.clone());
        let script = self.scripts.lock().unwrap().get(&request.url).cloned();

        match script {
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Delay(wait, response)) => {
                tokio::time::sleep(wait).await;
                Ok(response)
            }
            Some(Script::Fail) | None => Err(FetchError::Unavailable(request.url.clone())),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<Notification>>,
    fail_next: AtomicBool,
}

impl RecordingNotifier {
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, notification: &Notification) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            bail!("notifications are blocked");
        }
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub type TestWorker = OfflineWorker<Arc<ScriptedFetcher>, Arc<RecordingNotifier>>;

pub struct Fixture {
    pub worker: TestWorker,
    pub net: Arc<ScriptedFetcher>,
    pub notes: Arc<RecordingNotifier>,
    pub _dir: TempDir,
}

pub fn fixture() -> Fixture {
    fixture_with(|_| {})
}

pub fn fixture_with(configure: impl FnOnce(&mut WorkerSettings)) -> Fixture {
    let dir = TempDir::new().unwrap();
    let net = Arc::new(ScriptedFetcher::default());
    let notes = Arc::new(RecordingNotifier::default());

    let mut settings = WorkerSettings::new(Url::parse(ORIGIN).unwrap());
    configure(&mut settings);

    let worker = OfflineWorker::open(net.clone(), notes.clone(), dir.path(), settings).unwrap();
    Fixture {
        worker,
        net,
        notes,
        _dir: dir,
    }
}
