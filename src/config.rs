// src/config.rs

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Runtime settings. Every field has a default, so a YAML file only needs to
/// list what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub listing_url: String,
    pub download_base: String,
    /// Substring every published archive name carries.
    pub file_family: String,
    pub cache_dir: PathBuf,
    pub cache_ttl_days: i64,
    pub listing_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub district_code: String,
    pub start_year: i32,
    pub end_year: i32,
    pub output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listing_url:
                "https://dpi.wi.gov/wisedash/download-files/type?field_wisedash_upload_type_value=PreACT"
                    .to_string(),
            download_base: "https://dpi.wi.gov/sites/default/files/wise/downloads/".to_string(),
            file_family: "preact_secure_statewide_certified".to_string(),
            cache_dir: PathBuf::from("cache"),
            cache_ttl_days: 30,
            listing_timeout_secs: 10,
            download_timeout_secs: 30,
            user_agent: "Mozilla/5.0".to_string(),
            max_retries: 0,
            retry_backoff_ms: 500,
            district_code: "6174".to_string(),
            start_year: 2020,
            end_year: 2024,
            output: PathBuf::from("output/waukesha_preact.json"),
        }
    }
}

impl Config {
    /// Load settings from a YAML file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Duration::try_days(config.cache_ttl_days).with_context(|| {
            format!(
                "cache_ttl_days = {} in {} is out of range",
                config.cache_ttl_days,
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Out-of-range day counts saturate; `load` rejects them up front.
    pub fn cache_ttl(&self) -> Duration {
        Duration::try_days(self.cache_ttl_days).unwrap_or(Duration::MAX)
    }

    pub fn listing_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.listing_timeout_secs)
    }

    pub fn download_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.download_timeout_secs)
    }
}
