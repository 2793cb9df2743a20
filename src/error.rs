//! Custom error types for channel-archiver

use thiserror::Error;

/// Main error type for archiver operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Terminal OCR failure or a non-retryable HTTP status from the vendor
    #[error("Failed to recognize texts in the image: {0}")]
    Recognition(String),

    #[error("Download failed: {0}")]
    Download(String),

    /// The message source is unreachable, rejected our session, or yielded
    /// history that breaks the newest-first ordering
    #[error("Message source unavailable: {0}")]
    Source(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

/// Result type alias for channel-archiver
pub type Result<T> = std::result::Result<T, Error>;
