use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::atomic;
use crate::models::User;
use crate::net::StoredResponse;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// What the backend handed us at login: its session cookies and the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub user: User,
    /// `(name, value)` pairs from `Set-Cookie`.
    pub cookies: Vec<(String, String)>,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    /// Capture the cookies set by a login or register response.
    ///
    /// Only the `name=value` part of each `Set-Cookie` is kept; a later
    /// cookie with the same name replaces the earlier one.
    pub fn from_response(response: &StoredResponse, user: User) -> Self {
        let mut cookies: Vec<(String, String)> = Vec::new();
        for header in response.header_values("Set-Cookie") {
            let pair = header.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            cookies.retain(|(n, _)| n != name);
            cookies.push((name.to_string(), value.trim().to_string()));
        }

        Self {
            user,
            cookies,
            created_at: Utc::now(),
        }
    }

    /// Value for a `Cookie` request header, if any cookies were set.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk. Returns whether one was found.
    pub fn load(&mut self) -> Result<bool> {
        self.data = atomic::read_json(&self.session_path()).context("Failed to load session")?;
        Ok(self.data.is_some())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            atomic::write_json(&self.session_path(), data).context("Failed to save session")?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        atomic::remove(&self.session_path())?;
        Ok(())
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    pub fn user(&self) -> Option<&User> {
        self.data.as_ref().map(|d| &d.user)
    }

    pub fn cookie_header(&self) -> Option<String> {
        self.data.as_ref().and_then(SessionData::cookie_header)
    }

    pub fn is_valid(&self) -> bool {
        self.data.is_some()
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}
