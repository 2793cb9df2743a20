//! Incremental channel synchronization
//!
//! The channel history arrives newest-first. A steady-state sync scans it
//! down to the archive's resume point (its highest id), then normalizes the
//! new messages oldest-first, saving the whole archive after each record. An
//! interrupted run therefore leaves a contiguous archive whose resume point
//! is still correct.

use crate::archive::Archive;
use crate::error::{Error, Result};
use crate::media::MediaStore;
use crate::normalize::Normalizer;
use crate::ocr::TextRecognizer;
use crate::source::{MessageSource, RawMessage};
use futures::TryStreamExt;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Outcome of a sync, dump or backfill run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Records newly added to the archive
    pub added: usize,
    /// History messages already present in the archive
    pub skipped: usize,
    /// Existing records whose OCR text was filled in
    pub amended: usize,
    /// Highest archived id after the run
    pub last_id: Option<i64>,
}

/// Guards the newest-first ordering the resume point relies on
#[derive(Debug, Default)]
struct HistoryOrder {
    previous: Option<i64>,
}

impl HistoryOrder {
    fn check(&mut self, id: i64) -> Result<()> {
        if let Some(previous) = self.previous {
            if id >= previous {
                return Err(Error::Source(format!(
                    "history out of order: message {} followed {}",
                    id, previous
                )));
            }
        }
        self.previous = Some(id);
        Ok(())
    }
}

/// Sole writer of the archive document
pub struct SyncEngine<'a> {
    source: &'a dyn MessageSource,
    normalizer: Normalizer<'a>,
    archive_path: PathBuf,
    progress: ProgressBar,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        source: &'a dyn MessageSource,
        recognizer: &'a dyn TextRecognizer,
        media: &'a MediaStore,
        archive_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            normalizer: Normalizer::new(source, recognizer, media),
            archive_path: archive_path.into(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report each stored record on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Archive every message newer than the archive's last record
    pub async fn sync_new(&self, archive: &mut Archive) -> Result<SyncStats> {
        let last_id = archive.last_id().ok_or_else(|| {
            Error::Archive(format!(
                "{} is empty; seed it with `dump` first",
                self.archive_path.display()
            ))
        })?;
        info!("Resuming after message {}", last_id);

        let pending = self.scan_newer_than(last_id).await?;
        info!("{} new messages", pending.len());

        let mut stats = SyncStats::default();
        for message in pending.iter().rev() {
            self.store(archive, message).await?;
            stats.added += 1;
        }

        stats.last_id = archive.last_id();
        Ok(stats)
    }

    /// Newest-first messages above the resume point
    async fn scan_newer_than(&self, last_id: i64) -> Result<Vec<RawMessage>> {
        let mut history = self.source.history();
        let mut order = HistoryOrder::default();
        let mut pending = Vec::new();

        while let Some(message) = history.try_next().await? {
            order.check(message.id)?;
            if message.id <= last_id {
                debug!("Reached archived message {}", message.id);
                break;
            }
            pending.push(message);
        }

        Ok(pending)
    }

    /// Seed the archive from the whole channel history
    ///
    /// Messages already archived are skipped, so an interrupted dump can be
    /// rerun to completion.
    pub async fn dump_all(&self, archive: &mut Archive) -> Result<SyncStats> {
        let mut history = self.source.history();
        let mut order = HistoryOrder::default();
        let mut stats = SyncStats::default();

        while let Some(message) = history.try_next().await? {
            order.check(message.id)?;
            if archive.contains(message.id) {
                debug!("Message {} already archived", message.id);
                stats.skipped += 1;
                continue;
            }
            self.store(archive, &message).await?;
            stats.added += 1;
        }

        stats.last_id = archive.last_id();
        Ok(stats)
    }

    /// Fill in OCR text for records whose media was never recognized
    pub async fn backfill_ocr(&self, archive: &mut Archive) -> Result<SyncStats> {
        let mut stats = SyncStats::default();

        for id in archive.missing_ocr() {
            let Some(mut record) = archive.get(id).cloned() else {
                continue;
            };
            let Some(filename) = record.media.clone() else {
                continue;
            };

            record.ocr = Some(self.normalizer.recognize_file(&filename).await?);
            archive.insert(record);
            archive.save(&self.archive_path)?;
            stats.amended += 1;
            self.progress.inc(1);
            info!("Recognized {}", filename);
        }

        stats.last_id = archive.last_id();
        Ok(stats)
    }

    async fn store(&self, archive: &mut Archive, message: &RawMessage) -> Result<()> {
        let record = self.normalizer.normalize(message).await?;
        archive.insert(record);
        archive.save(&self.archive_path)?;
        self.progress.inc(1);
        self.progress.set_message(format!("message {}", message.id));
        info!("Archived message {}", message.id);
        Ok(())
    }
}
