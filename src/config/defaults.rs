//! Default values for configuration

use std::path::PathBuf;

/// Default config file name, looked up in the working directory
pub fn default_config_file_name() -> &'static str {
    "channel-archiver.toml"
}

/// Default archive document
pub fn default_messages_file() -> PathBuf {
    PathBuf::from("messages.json")
}

/// Default directory for downloaded images
pub fn default_media_dir() -> PathBuf {
    PathBuf::from("images")
}

/// Default history gateway URL for local development
pub fn default_source_base_url() -> String {
    "http://127.0.0.1:8081".to_string()
}

/// Messages requested per history page
pub fn default_source_page_size() -> u32 {
    100
}

/// Request timeout for the history gateway in seconds
pub fn default_source_timeout() -> u64 {
    60
}

pub fn default_api_id_env() -> String {
    "API_ID".to_string()
}

pub fn default_api_hash_env() -> String {
    "API_HASH".to_string()
}

pub fn default_session_env() -> String {
    "SESSION_STRING".to_string()
}

/// Environment variable holding the OCR endpoint when the file leaves it unset
pub fn default_ocr_endpoint_env() -> String {
    "ENDPOINT".to_string()
}

pub fn default_ocr_subscription_key_env() -> String {
    "SUBSCRIPTION_KEY".to_string()
}

/// Per-request timeout for OCR calls in seconds
pub fn default_ocr_timeout() -> u64 {
    30
}

/// Idle delay between status polls in milliseconds
pub fn default_ocr_poll_interval() -> u64 {
    1000
}

/// HTTP 429 responses tolerated within one recognition job
pub fn default_ocr_max_rate_limit_retries() -> u32 {
    30
}

/// Wall-clock ceiling for one recognition job (submit + poll) in seconds
pub fn default_ocr_max_job_secs() -> u64 {
    600
}

/// Fallback wait when a 429 carries no usable Retry-After header
pub fn default_ocr_default_retry_after() -> u64 {
    1
}
