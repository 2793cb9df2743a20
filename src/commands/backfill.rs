//! Backfill command - recognize text on archived images that lack it

use crate::archive::Archive;
use crate::config::Config;
use crate::error::Result;
use crate::media::MediaStore;
use crate::ocr::TextRecognizer;
use crate::source::MessageSource;
use crate::sync::{SyncEngine, SyncStats};
use indicatif::ProgressBar;
use tracing::info;

/// Execute OCR backfill over the existing archive
pub async fn cmd_backfill_ocr(
    config: &Config,
    source: &dyn MessageSource,
    recognizer: &dyn TextRecognizer,
    progress: ProgressBar,
) -> Result<SyncStats> {
    let archive_path = &config.archive.messages_file;
    let mut archive = Archive::load(archive_path)?;
    let pending = archive.missing_ocr().len();
    info!("{} archived images have no OCR text", pending);

    let media = MediaStore::new(&config.archive.media_dir);
    let engine =
        SyncEngine::new(source, recognizer, &media, archive_path).with_progress(progress.clone());
    let stats = engine.backfill_ocr(&mut archive).await?;
    progress.finish_and_clear();

    Ok(stats)
}

/// Print backfill stats to console
pub fn print_backfill_stats(stats: &SyncStats) {
    println!("\n🔎 OCR Backfill Complete\n");
    println!("Images recognized: {}", stats.amended);
}
