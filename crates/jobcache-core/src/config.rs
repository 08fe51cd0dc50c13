//! Application configuration management.
//!
//! Configuration is stored at `~/.config/jobcache/config.json`; a missing
//! file means defaults. `JOBCACHE_ORIGIN` in the environment (or a `.env`
//! file loaded by the binary) overrides the configured origin.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "jobcache";

const CONFIG_FILE: &str = "config.json";

pub const ORIGIN_ENV: &str = "JOBCACHE_ORIGIN";

const DEFAULT_ORIGIN: &str = "http://localhost:5000";

/// App shell cached at install time.
const DEFAULT_PRECACHE: &[&str] = &[
    "/",
    "/index.html",
    "/offline.html",
    "/manifest.json",
    "/logo.png",
    "/professional-styles.css",
    "/api.js",
    "/payments.js",
    "/js/app.js",
    "/js/auth.js",
    "/js/threejs-background.js",
    "/js/ui-components.js",
    "https://fonts.googleapis.com/css2?family=Orbitron:wght@400;700;900&family=Exo+2:wght@300;400;600;800&display=swap",
    "https://cdnjs.cloudflare.com/ajax/libs/three.js/r128/three.min.js",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the web app and its `/api` are served from.
    pub origin: String,
    pub api_timeout_secs: u64,
    pub offline_page: String,
    pub precache: Vec<String>,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            api_timeout_secs: 5,
            offline_page: "/offline.html".to_string(),
            precache: DEFAULT_PRECACHE.iter().map(|s| s.to_string()).collect(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply the environment override.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        if let Ok(origin) = std::env::var(ORIGIN_ENV) {
            if !origin.trim().is_empty() {
                config.origin = origin.trim().to_string();
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// The origin as a URL, with a trailing slash so relative joins land
    /// under it.
    pub fn origin_url(&self) -> Result<Url> {
        let mut origin = Url::parse(&self.origin)
            .with_context(|| format!("Invalid origin '{}'", self.origin))?;
        if !matches!(origin.scheme(), "http" | "https") {
            anyhow::bail!("Origin must be http or https: {}", self.origin);
        }
        if !origin.path().ends_with('/') {
            let path = format!("{}/", origin.path());
            origin.set_path(&path);
        }
        Ok(origin)
    }
}
