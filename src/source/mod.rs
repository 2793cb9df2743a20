//! Message source abstraction
//!
//! This module provides:
//! - The raw message shape yielded by the channel history
//! - A trait for history iteration and attachment download
//! - An HTTP client for the history gateway
//! - Rendering of formatted text into the platform's HTML markup

mod formatting;
mod http;

pub use formatting::*;
pub use http::*;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A photo attachment reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    /// Opaque reference used to download the file
    pub file_id: String,
    /// Stable identifier across re-uploads; part of the local filename
    pub file_unique_id: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Link preview attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebPage {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub photo: Option<Photo>,
}

/// One message as yielded by the channel history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub caption_entities: Vec<MessageEntity>,
    #[serde(default)]
    pub photo: Option<Photo>,
    #[serde(default)]
    pub web_page: Option<WebPage>,
}

impl RawMessage {
    /// HTML rendering of the message text, falling back to the caption
    pub fn html_text(&self) -> Option<String> {
        let from_text = self
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| render_html(t, &self.entities));

        from_text.or_else(|| {
            self.caption
                .as_deref()
                .filter(|c| !c.is_empty())
                .map(|c| render_html(c, &self.caption_entities))
        })
    }
}

/// Trait for channel message sources
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Iterate the channel history, newest message first
    fn history(&self) -> BoxStream<'_, Result<RawMessage>>;

    /// Download a photo's bytes to `dest`, replacing anything already there
    async fn download(&self, photo: &Photo, dest: &Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_text_prefers_text_over_caption() {
        let message = RawMessage {
            id: 1,
            text: Some("body".to_string()),
            caption: Some("caption".to_string()),
            ..Default::default()
        };
        assert_eq!(message.html_text().as_deref(), Some("body"));
    }

    #[test]
    fn test_html_text_falls_back_to_caption() {
        let message = RawMessage {
            id: 1,
            caption: Some("a < b".to_string()),
            caption_entities: vec![MessageEntity::new(EntityKind::Bold, 0, 1)],
            ..Default::default()
        };
        assert_eq!(message.html_text().as_deref(), Some("<b>a</b> &lt; b"));
    }

    #[test]
    fn test_html_text_absent() {
        let message = RawMessage {
            id: 1,
            text: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(message.html_text(), None);
    }

    #[test]
    fn test_raw_message_deserializes_sparse_json() {
        let json = r#"{
            "id": 42,
            "caption": "look",
            "web_page": {"site_name": "Example", "photo": {"file_id": "f", "file_unique_id": "u"}}
        }"#;
        let message: RawMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.id, 42);
        assert!(message.photo.is_none());
        let page = message.web_page.unwrap();
        assert_eq!(page.site_name.as_deref(), Some("Example"));
        assert_eq!(page.photo.unwrap().file_unique_id, "u");
    }
}
