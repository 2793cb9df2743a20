//! Configuration management for channel-archiver
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! Secrets never live in the file; it only names the environment variables
//! that hold them, and [`Config::credentials`] resolves them once at startup.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Channel to archive (username or numeric id)
    #[serde(default)]
    pub channel: String,

    /// Local archive layout
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Message history gateway
    #[serde(default)]
    pub source: SourceConfig,

    /// OCR vendor
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Path the config was loaded from (internal, not user-editable)
    #[serde(skip)]
    pub config_file: PathBuf,
}

/// Archive layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// JSON document holding every archived record
    #[serde(default = "default_messages_file")]
    pub messages_file: PathBuf,

    /// Directory downloaded images are stored in
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

/// Message source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the history gateway
    #[serde(default = "default_source_base_url")]
    pub base_url: String,

    /// Messages requested per history page
    #[serde(default = "default_source_page_size")]
    pub page_size: u32,

    /// Request timeout in seconds
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,

    /// Environment variable name for the API id
    #[serde(default = "default_api_id_env")]
    pub api_id_env: String,

    /// Environment variable name for the API hash
    #[serde(default = "default_api_hash_env")]
    pub api_hash_env: String,

    /// Environment variable name for the session token
    #[serde(default = "default_session_env")]
    pub session_env: String,
}

/// OCR configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Analyze endpoint; read from `endpoint_env` when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_ocr_endpoint_env")]
    pub endpoint_env: String,

    /// Environment variable name for the subscription key
    #[serde(default = "default_ocr_subscription_key_env")]
    pub subscription_key_env: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_ocr_timeout")]
    pub timeout_secs: u64,

    /// Idle delay between status polls in milliseconds
    #[serde(default = "default_ocr_poll_interval")]
    pub poll_interval_ms: u64,

    /// HTTP 429 responses tolerated within one recognition job
    #[serde(default = "default_ocr_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,

    /// Wall-clock ceiling for one recognition job in seconds
    #[serde(default = "default_ocr_max_job_secs")]
    pub max_job_secs: u64,

    /// Wait used when a 429 has no usable Retry-After header, in seconds
    #[serde(default = "default_ocr_default_retry_after")]
    pub default_retry_after_secs: u64,

    /// Client-side pacing of OCR requests (unset = unpaced)
    #[serde(default)]
    pub requests_per_minute: Option<u32>,
}

/// Secrets and endpoints resolved from the environment
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_id: String,
    pub api_hash: String,
    pub session: String,
    pub ocr_subscription_key: String,
    pub ocr_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel: String::new(),
            archive: ArchiveConfig::default(),
            source: SourceConfig::default(),
            ocr: OcrConfig::default(),
            config_file: PathBuf::from(default_config_file_name()),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            messages_file: default_messages_file(),
            media_dir: default_media_dir(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_base_url(),
            page_size: default_source_page_size(),
            timeout_secs: default_source_timeout(),
            api_id_env: default_api_id_env(),
            api_hash_env: default_api_hash_env(),
            session_env: default_session_env(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            endpoint_env: default_ocr_endpoint_env(),
            subscription_key_env: default_ocr_subscription_key_env(),
            timeout_secs: default_ocr_timeout(),
            poll_interval_ms: default_ocr_poll_interval(),
            max_rate_limit_retries: default_ocr_max_rate_limit_retries(),
            max_job_secs: default_ocr_max_job_secs(),
            default_retry_after_secs: default_ocr_default_retry_after(),
            requests_per_minute: None,
        }
    }
}

impl OcrConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_job_duration(&self) -> Duration {
        Duration::from_secs(self.max_job_secs)
    }
}

impl Config {
    /// Get the default config file path (working directory)
    pub fn default_config_path() -> PathBuf {
        PathBuf::from(default_config_file_name())
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.config_file = config_path.to_path_buf();

        config.validate()?;
        Ok(config)
    }

    /// Load configuration if the file exists, otherwise fall back to defaults
    ///
    /// Either way the returned config has passed `validate`.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        debug!("No config file found at {:?}, using defaults", config_path);
        let config = Config {
            config_file: config_path.to_path_buf(),
            ..Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.config_file, content)?;
        info!("Saved config to {:?}", self.config_file);
        Ok(())
    }

    /// Resolve secrets from the environment variables the config names
    pub fn credentials(&self) -> Result<Credentials> {
        let ocr_endpoint = match &self.ocr.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => require_env(&self.ocr.endpoint_env)?,
        };
        Url::parse(&ocr_endpoint)
            .map_err(|e| Error::Config(format!("Invalid OCR endpoint '{}': {}", ocr_endpoint, e)))?;

        Ok(Credentials {
            api_id: require_env(&self.source.api_id_env)?,
            api_hash: require_env(&self.source.api_hash_env)?,
            session: require_env(&self.source.session_env)?,
            ocr_subscription_key: require_env(&self.ocr.subscription_key_env)?,
            ocr_endpoint,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.channel.trim().is_empty() {
            return Err(Error::Config("channel must be set".to_string()));
        }

        if self.source.page_size == 0 {
            return Err(Error::Config(
                "source.page_size must be positive".to_string(),
            ));
        }

        Url::parse(&self.source.base_url).map_err(|e| {
            Error::Config(format!(
                "source.base_url '{}' is not a valid URL: {}",
                self.source.base_url, e
            ))
        })?;

        if let Some(endpoint) = &self.ocr.endpoint {
            Url::parse(endpoint).map_err(|e| {
                Error::Config(format!("ocr.endpoint '{}' is not a valid URL: {}", endpoint, e))
            })?;
        }

        if self.ocr.poll_interval_ms == 0 {
            return Err(Error::Config(
                "ocr.poll_interval_ms must be positive".to_string(),
            ));
        }

        if self.ocr.max_rate_limit_retries == 0 {
            return Err(Error::Config(
                "ocr.max_rate_limit_retries must be positive".to_string(),
            ));
        }

        if self.ocr.max_job_secs == 0 {
            return Err(Error::Config(
                "ocr.max_job_secs must be positive".to_string(),
            ));
        }

        if self.ocr.requests_per_minute == Some(0) {
            return Err(Error::Config(
                "ocr.requests_per_minute must be positive when set".to_string(),
            ));
        }

        Ok(())
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config(format!(
            "Environment variable {} is not set",
            name
        ))),
    }
}
