//! Text recognition on archived images
//!
//! This module provides:
//! - A trait for recognizers
//! - An HTTP client for the two-phase submit/poll read API
//! - Rate-limit handling with per-job ceilings

mod client;
mod retry;

pub use client::*;
pub use retry::*;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for text recognizers
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize text lines on an image, top-to-bottom and page by page
    async fn recognize(&self, image: Vec<u8>) -> Result<Vec<String>>;
}
