//! Message normalization
//!
//! Turns one raw channel message into an [`ArchiveRecord`]. Media is the
//! message's own photo, or failing that the photo of its link preview, in
//! which case the preview's site name, title and description are appended to
//! the text. Any media is materialized locally and run through OCR before the
//! record is returned, so a record is either complete or not produced at all.

use crate::archive::ArchiveRecord;
use crate::error::Result;
use crate::media::MediaStore;
use crate::ocr::TextRecognizer;
use crate::source::{escape_html, MessageSource, Photo, RawMessage};
use tracing::debug;

/// Builds archive records from raw messages
pub struct Normalizer<'a> {
    source: &'a dyn MessageSource,
    recognizer: &'a dyn TextRecognizer,
    media: &'a MediaStore,
}

impl<'a> Normalizer<'a> {
    pub fn new(
        source: &'a dyn MessageSource,
        recognizer: &'a dyn TextRecognizer,
        media: &'a MediaStore,
    ) -> Self {
        Self {
            source,
            recognizer,
            media,
        }
    }

    pub async fn normalize(&self, message: &RawMessage) -> Result<ArchiveRecord> {
        let (text, photo) = compose_text(message);

        let mut record = ArchiveRecord::text_only(message.id, text);
        if let Some(photo) = photo {
            let filename = self
                .media
                .ensure_local(self.source, photo, message.id)
                .await?;
            let ocr = self.recognize_file(&filename).await?;
            record.media = Some(filename);
            record.ocr = Some(ocr);
        }

        Ok(record)
    }

    /// Recognize text on an already downloaded image
    pub async fn recognize_file(&self, filename: &str) -> Result<String> {
        let image = self.media.read(filename).await?;
        let lines = self.recognizer.recognize(image).await?;
        debug!("Recognized {} lines in {}", lines.len(), filename);
        Ok(lines.join("\n"))
    }
}

/// Final record text and the photo to archive, if any
pub fn compose_text(message: &RawMessage) -> (String, Option<&Photo>) {
    let mut text = message.html_text().unwrap_or_default();

    let photo = if let Some(photo) = &message.photo {
        Some(photo)
    } else if let Some(page) = &message.web_page {
        for field in [&page.site_name, &page.title, &page.description]
            .into_iter()
            .flatten()
        {
            text.push('\n');
            text.push_str(&escape_html(field));
        }
        page.photo.as_ref()
    } else {
        None
    };

    (text.trim().to_string(), photo)
}
