//! App configuration, persisted as JSON under the data directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

fn default_feed_page_size() -> usize {
    10
}

fn default_status_cache_ttl_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Overrides `~/.kendraa` as the root for the database and storage
    /// buckets.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_feed_page_size")]
    pub feed_page_size: usize,

    #[serde(default = "default_status_cache_ttl_secs")]
    pub status_cache_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            feed_page_size: default_feed_page_size(),
            status_cache_ttl_secs: default_status_cache_ttl_secs(),
        }
    }
}

impl AppConfig {
    /// Load `~/.kendraa/config.json`, writing defaults on first run.
    pub fn load() -> Result<Self, ServiceError> {
        let home = dirs::home_dir()
            .ok_or_else(|| ServiceError::Storage("home directory not found".into()))?;
        Self::load_from(&home.join(".kendraa").join("config.json"))
    }

    /// Load from an explicit path, creating the file with defaults when it
    /// doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self, ServiceError> {
        if path.exists() {
            let raw = fs::read_to_string(path)
                .map_err(|e| ServiceError::Storage(format!("read config: {}", e)))?;
            let config: AppConfig = serde_json::from_str(&raw)
                .map_err(|e| ServiceError::Validation(format!("malformed config: {}", e)))?;
            Ok(config)
        } else {
            let config = AppConfig::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ServiceError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ServiceError::Storage(format!("create config dir: {}", e)))?;
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| ServiceError::Storage(format!("serialize config: {}", e)))?;
        fs::write(path, raw).map_err(|e| ServiceError::Storage(format!("write config: {}", e)))?;
        Ok(())
    }

    /// Root directory for the database and storage buckets.
    pub fn resolved_data_dir(&self) -> Result<PathBuf, ServiceError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".kendraa"))
                .ok_or_else(|| ServiceError::Storage("home directory not found".into())),
        }
    }
}
