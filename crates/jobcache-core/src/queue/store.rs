use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::action::{ActionKind, PendingAction};
use crate::cache::atomic;

/// File-backed FIFO of pending actions, one directory per kind.
///
/// Layout: `{root}/{kind-tag}/{id}.json`.
#[derive(Debug, Clone)]
pub struct ActionQueue {
    root: PathBuf,
}

impl ActionQueue {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create queue directory {}", root.display()))?;
        Ok(Self { root })
    }

    fn kind_dir(&self, kind: ActionKind) -> PathBuf {
        self.root.join(kind.tag())
    }

    fn action_path(&self, kind: ActionKind, id: &str) -> PathBuf {
        self.kind_dir(kind).join(format!("{}.json", id))
    }

    pub fn enqueue(&self, action: &PendingAction) -> Result<()> {
        atomic::write_json(&self.action_path(action.kind, &action.id), action)?;
        info!(kind = %action.kind, id = %action.id, "Queued action for background sync");
        Ok(())
    }

    /// Pending actions of one kind, oldest first.
    pub fn list(&self, kind: ActionKind) -> Result<Vec<PendingAction>> {
        let dir = self.kind_dir(kind);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut actions = Vec::new();
        for item in fs::read_dir(&dir).with_context(|| format!("Failed to list {} queue", kind))? {
            let path = item?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match atomic::read_json::<PendingAction>(&path) {
                Ok(Some(action)) => actions.push(action),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable queued action"),
            }
        }

        actions.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(actions)
    }

    /// Every pending action across all kinds.
    pub fn list_all(&self) -> Result<Vec<PendingAction>> {
        let mut all = Vec::new();
        for kind in ActionKind::ALL {
            all.extend(self.list(kind)?);
        }
        Ok(all)
    }

    /// Remove one action. Returns whether it was still queued.
    pub fn remove(&self, kind: ActionKind, id: &str) -> Result<bool> {
        let removed = atomic::remove(&self.action_path(kind, id))?;
        debug!(kind = %kind, id, removed, "Removed queued action");
        Ok(removed)
    }

    /// Drop every action of one kind. Returns how many were removed.
    pub fn clear(&self, kind: ActionKind) -> Result<usize> {
        let mut removed = 0;
        for action in self.list(kind)? {
            if self.remove(kind, &action.id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn len(&self, kind: ActionKind) -> Result<usize> {
        Ok(self.list(kind)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        for kind in ActionKind::ALL {
            if self.len(kind)? > 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
