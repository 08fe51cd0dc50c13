use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::net::StoredResponse;

/// Identity of a cached response: request method plus normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
}

impl CacheKey {
    /// Build a key from an absolute URL.
    ///
    /// The fragment never reaches the server, so it is dropped; the query
    /// string is kept verbatim.
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
        }
    }

    pub fn get(url: &Url) -> Self {
        Self::new("GET", url)
    }

    /// Stable file name for this key.
    pub fn file_stem(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b" ");
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A stored response and when it was captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub response: StoredResponse,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: CacheKey, response: StoredResponse) -> Self {
        Self {
            key,
            response,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Includes clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_key_drops_fragment_keeps_query() {
        let key = CacheKey::get(&url("http://localhost:5000/index.html?v=2#top"));
        assert_eq!(key.url, "http://localhost:5000/index.html?v=2");
        assert_eq!(key.method, "GET");
    }

    #[test]
    fn test_file_stem_depends_on_method_and_url() {
        let u = url("http://localhost:5000/api/status");
        let get = CacheKey::get(&u);
        let head = CacheKey::new("head", &u);
        assert_ne!(get.file_stem(), head.file_stem());
        assert_eq!(get.file_stem(), CacheKey::get(&u).file_stem());
        assert_eq!(get.file_stem().len(), 64);
    }

    #[test]
    fn test_age_display() {
        let key = CacheKey::get(&url("http://localhost/"));
        let mut entry = CacheEntry::new(key, StoredResponse::new(200, "OK", "x"));
        assert_eq!(entry.age_display(), "just now");

        entry.cached_at = Utc::now() - Duration::minutes(5);
        assert_eq!(entry.age_display(), "5m ago");

        entry.cached_at = Utc::now() - Duration::minutes(95);
        assert_eq!(entry.age_display(), "2h ago");

        entry.cached_at = Utc::now() - Duration::hours(30);
        assert_eq!(entry.age_display(), "1d ago");
    }
}
