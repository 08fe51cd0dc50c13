use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::atomic;
use super::entry::{CacheEntry, CacheKey};

/// File-backed cache namespaces.
///
/// Layout: `{root}/{namespace}/{sha256(method url)}.json`. Each put is an
/// atomic file replace, so concurrent handlers working on different keys
/// never see each other's partial writes.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache directory {}", root.display()))?;
        Ok(Self { root })
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    fn entry_path(&self, namespace: &str, key: &CacheKey) -> PathBuf {
        self.namespace_dir(namespace)
            .join(format!("{}.json", key.file_stem()))
    }

    /// Create the namespace if it does not exist yet.
    pub fn open(&self, namespace: &str) -> Result<()> {
        let dir = self.namespace_dir(namespace);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache namespace {}", namespace))
    }

    pub fn has(&self, namespace: &str) -> bool {
        self.namespace_dir(namespace).is_dir()
    }

    /// All namespace names, sorted.
    pub fn namespaces(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to list {}", self.root.display()))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Store an entry, replacing whatever was cached for the same key.
    pub fn put(&self, namespace: &str, entry: &CacheEntry) -> Result<()> {
        let path = self.entry_path(namespace, &entry.key);
        atomic::write_json(&path, entry)?;
        debug!(namespace, url = %entry.key.url, "Cached response");
        Ok(())
    }

    pub fn get(&self, namespace: &str, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(namespace, key);
        let entry: Option<CacheEntry> = atomic::read_json(&path)?;
        // Guard against a hash collision handing back another URL's body
        Ok(entry.filter(|e| e.key == *key))
    }

    /// Look the key up in each namespace in turn; first hit wins.
    ///
    /// Unreadable entries are logged and skipped rather than failing the
    /// lookup, since a lookup only ever happens on the fallback path.
    pub fn lookup(&self, namespaces: &[&str], key: &CacheKey) -> Option<CacheEntry> {
        for namespace in namespaces {
            match self.get(namespace, key) {
                Ok(Some(entry)) => return Some(entry),
                Ok(None) => {}
                Err(e) => {
                    warn!(namespace, url = %key.url, error = %e, "Unreadable cache entry");
                }
            }
        }
        None
    }

    /// Every readable entry in a namespace, oldest first.
    pub fn entries(&self, namespace: &str) -> Result<Vec<CacheEntry>> {
        let dir = self.namespace_dir(namespace);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for item in fs::read_dir(&dir)
            .with_context(|| format!("Failed to list namespace {}", namespace))?
        {
            let path = item?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match atomic::read_json::<CacheEntry>(&path) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => debug!(path = %path.display(), error = %e, "Skipping cache file"),
            }
        }
        entries.sort_by(|a, b| a.cached_at.cmp(&b.cached_at));
        Ok(entries)
    }

    /// Delete a whole namespace. Returns whether it existed.
    pub fn delete(&self, namespace: &str) -> Result<bool> {
        let dir = self.namespace_dir(namespace);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)
            .with_context(|| format!("Failed to delete cache namespace {}", namespace))?;
        Ok(true)
    }
}
