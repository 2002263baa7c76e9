//! Application configuration management.
//!
//! Configuration is an explicit value handed to the sync engine and the
//! asset cache controller; nothing reads it from global state. It is stored
//! as JSON at `~/.config/speciescache/config.json` and every field has a
//! default, so a missing or partial file is fine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::ControllerConfig;
use crate::sync::SyncOptions;

/// Application name used for config/data directory paths
const APP_NAME: &str = "speciescache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `base_url`
pub const BASE_URL_ENV: &str = "SPECIESCACHE_BASE_URL";

/// Environment variable overriding `data_dir`
pub const DATA_DIR_ENV: &str = "SPECIESCACHE_DATA_DIR";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_BUNDLE_PATH: &str = "/api/bundle";
pub const DEFAULT_MEDIA_CONCURRENCY: usize = 4;

/// Current asset cache generation. Bump to invalidate all cached assets.
pub const DEFAULT_CACHE_NAME: &str = "species-app-v1";

/// Where the application shell is served from.
pub const DEFAULT_SCOPE: &str = "http://127.0.0.1:8080/";

pub const DEFAULT_NAVIGATION_FALLBACKS: &[&str] = &["./home.html", "./index.html"];

/// Application shell precached on install.
pub const DEFAULT_PRECACHE_MANIFEST: &[&str] = &[
    "./",
    "./index.html",
    "./home.html",
    "./specie.html",
    "./tetum.html",
    "./tutorial.html",
    "./video.html",
    "./login.html",
    "./language.html",
    "./imagepreview.html",
    "./manifest.json",
    "./css/login.css",
    "./css/language.css",
    "./css/responsive.css",
    "./scripts/specieslist.js",
    "./scripts/filterCarousel.js",
    "./scripts/sw-register.js",
    "./scripts/imageCache.js",
    "./scripts/preloadImages.js",
    "./scripts/config.js",
    "./scripts/db.js",
    "./scripts/bundleSync.js",
    "./icons/icon-192x192.png",
    "./icons/icon-512x512.png",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub bundle_path: String,
    pub media_concurrency: usize,
    pub cache_name: String,
    pub scope: String,
    pub precache_manifest: Vec<String>,
    pub navigation_fallbacks: Vec<String>,
    /// Overrides the platform data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            bundle_path: DEFAULT_BUNDLE_PATH.to_string(),
            media_concurrency: DEFAULT_MEDIA_CONCURRENCY,
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            precache_manifest: DEFAULT_PRECACHE_MANIFEST.iter().map(|s| s.to_string()).collect(),
            navigation_fallbacks: DEFAULT_NAVIGATION_FALLBACKS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Load from `path`, or defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply `SPECIESCACHE_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                self.base_url = base_url.trim().to_string();
            }
        }
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.data_dir = Some(PathBuf::from(dir.trim()));
            }
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::cache_dir)
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Directory of the local store partitions.
    pub fn store_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("store"))
    }

    /// Directory holding asset cache generations.
    pub fn asset_cache_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("assets"))
    }

    pub fn sync_options(&self, force: bool) -> SyncOptions {
        SyncOptions {
            base_url: self.base_url.clone(),
            bundle_path: self.bundle_path.clone(),
            media_concurrency: self.media_concurrency,
            force,
            on_progress: None,
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            cache_name: self.cache_name.clone(),
            scope: self.scope.clone(),
            manifest: self.precache_manifest.clone(),
            navigation_fallbacks: self.navigation_fallbacks.clone(),
        }
    }
}
