//! In-memory collaborators shared by unit tests

use crate::error::{Error, Result};
use crate::ocr::TextRecognizer;
use crate::source::{MessageSource, Photo, RawMessage, WebPage};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn photo(unique_id: &str) -> Photo {
    Photo {
        file_id: format!("file-{}", unique_id),
        file_unique_id: unique_id.to_string(),
        width: Some(1280),
        height: Some(720),
        file_size: None,
    }
}

pub fn text_message(id: i64, text: &str) -> RawMessage {
    RawMessage {
        id,
        text: Some(text.to_string()),
        ..Default::default()
    }
}

pub fn photo_message(id: i64, caption: &str, unique_id: &str) -> RawMessage {
    RawMessage {
        id,
        caption: Some(caption.to_string()),
        photo: Some(photo(unique_id)),
        ..Default::default()
    }
}

pub fn preview_message(id: i64, page: WebPage) -> RawMessage {
    RawMessage {
        id,
        web_page: Some(page),
        ..Default::default()
    }
}

/// Source replaying a fixed history; downloads write `image-{unique id}`
pub struct VecSource {
    messages: Mutex<Vec<RawMessage>>,
    downloads: AtomicUsize,
    fail_downloads: bool,
}

impl VecSource {
    /// `messages` must already be newest-first
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self {
            messages: Mutex::new(messages),
            downloads: AtomicUsize::new(0),
            fail_downloads: false,
        }
    }

    pub fn failing_downloads(mut self) -> Self {
        self.fail_downloads = true;
        self
    }

    /// Publish a new message at the head of the history
    pub fn publish(&self, message: RawMessage) {
        self.messages.lock().unwrap().insert(0, message);
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSource for VecSource {
    fn history(&self) -> BoxStream<'_, Result<RawMessage>> {
        let messages = self.messages.lock().unwrap().clone();
        stream::iter(messages.into_iter().map(Ok)).boxed()
    }

    async fn download(&self, photo: &Photo, dest: &Path) -> Result<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.fail_downloads {
            return Err(Error::Download(format!("{}: unavailable", photo.file_unique_id)));
        }
        tokio::fs::write(dest, format!("image-{}", photo.file_unique_id)).await?;
        Ok(())
    }
}

/// Recognizer returning `["text of", <image bytes>]`, optionally failing on a given call
pub struct FakeRecognizer {
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl FakeRecognizer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on_call: None,
        }
    }

    /// Fail the `n`th call (1-based)
    pub fn failing_on(n: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on_call: Some(n),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRecognizer for FakeRecognizer {
    async fn recognize(&self, image: Vec<u8>) -> Result<Vec<String>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(Error::Recognition("status failed".to_string()));
        }
        Ok(vec![
            "text of".to_string(),
            String::from_utf8_lossy(&image).into_owned(),
        ])
    }
}
