use super::{MessageSource, Photo, RawMessage};
use crate::config::{Credentials, SourceConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct HistoryPage {
    #[serde(default)]
    messages: Vec<RawMessage>,
}

/// Message source backed by an HTTP history gateway
///
/// The gateway owns the platform session; this client only pages through
/// `channels/{channel}/messages` newest-first and fetches `files/{file_id}`.
pub struct HttpMessageSource {
    client: Client,
    base_url: Url,
    channel: String,
    page_size: u32,
    api_id: String,
    api_hash: String,
    session: String,
}

impl HttpMessageSource {
    pub fn new(config: &SourceConfig, channel: &str, credentials: &Credentials) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| Error::Source(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            channel: channel.to_string(),
            page_size: config.page_size,
            api_id: credentials.api_id.clone(),
            api_hash: credentials.api_hash.clone(),
            session: credentials.session.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid source base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-Api-Id", &self.api_id)
            .header("X-Api-Hash", &self.api_hash)
            .bearer_auth(&self.session)
    }

    async fn fetch_page(&self, offset_id: i64) -> Result<Vec<RawMessage>> {
        let url = self.endpoint(&["channels", &self.channel, "messages"])?;
        debug!("Fetching history page: offset_id={}", offset_id);

        let response = self
            .authorized(self.client.get(url))
            .query(&[
                ("offset_id", offset_id.to_string()),
                ("limit", self.page_size.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Source(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Source(format!(
                "session rejected for channel '{}' (HTTP {})",
                self.channel, status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Source(format!("HTTP {}: {}", status, body)));
        }

        let page: HistoryPage = response
            .json()
            .await
            .map_err(|e| Error::Source(format!("Malformed history page: {}", e)))?;
        Ok(page.messages)
    }
}

struct Cursor {
    offset_id: i64,
    buffered: VecDeque<RawMessage>,
    exhausted: bool,
}

impl HttpMessageSource {
    /// Yield the next buffered message, fetching a page when the buffer runs dry
    async fn advance(&self, mut cursor: Cursor) -> Result<Option<(RawMessage, Cursor)>> {
        loop {
            if let Some(message) = cursor.buffered.pop_front() {
                return Ok(Some((message, cursor)));
            }
            if cursor.exhausted {
                return Ok(None);
            }

            let page = self.fetch_page(cursor.offset_id).await?;
            let Some(last) = page.last() else {
                return Ok(None);
            };
            if cursor.offset_id != 0 && last.id >= cursor.offset_id {
                return Err(Error::Source(format!(
                    "history page did not advance past id {}",
                    cursor.offset_id
                )));
            }

            cursor.offset_id = last.id;
            cursor.exhausted = page.len() < self.page_size as usize;
            cursor.buffered.extend(page);
        }
    }
}

#[async_trait]
impl MessageSource for HttpMessageSource {
    fn history(&self) -> BoxStream<'_, Result<RawMessage>> {
        let cursor = Cursor {
            offset_id: 0,
            buffered: VecDeque::new(),
            exhausted: false,
        };

        stream::try_unfold(cursor, move |cursor| self.advance(cursor)).boxed()
    }

    async fn download(&self, photo: &Photo, dest: &Path) -> Result<()> {
        let url = self.endpoint(&["files", &photo.file_id])?;
        debug!("Downloading {} to {:?}", photo.file_unique_id, dest);

        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|e| Error::Download(format!("{}: {}", photo.file_unique_id, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download(format!(
                "{}: HTTP {}",
                photo.file_unique_id, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Download(format!("{}: {}", photo.file_unique_id, e)))?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}
