//! Dump command - seed the archive from the entire channel history

use crate::archive::Archive;
use crate::config::Config;
use crate::error::Result;
use crate::media::MediaStore;
use crate::ocr::TextRecognizer;
use crate::source::MessageSource;
use crate::sync::{SyncEngine, SyncStats};
use indicatif::ProgressBar;
use tracing::info;

/// Execute a full history dump, skipping messages already archived
pub async fn cmd_dump(
    config: &Config,
    source: &dyn MessageSource,
    recognizer: &dyn TextRecognizer,
    progress: ProgressBar,
) -> Result<SyncStats> {
    let archive_path = &config.archive.messages_file;
    let mut archive = Archive::load_or_empty(archive_path)?;
    let media = MediaStore::new(&config.archive.media_dir);

    info!(
        "Dumping channel '{}' into {:?} ({} records already present)",
        config.channel,
        archive_path,
        archive.len()
    );

    let engine =
        SyncEngine::new(source, recognizer, &media, archive_path).with_progress(progress.clone());
    let stats = engine.dump_all(&mut archive).await?;
    progress.finish_and_clear();

    Ok(stats)
}

/// Print dump stats to console
pub fn print_dump_stats(stats: &SyncStats) {
    println!("\n📥 Dump Complete\n");
    println!("Messages archived: {}", stats.added);
    println!("Already present: {}", stats.skipped);
    if let Some(last_id) = stats.last_id {
        println!("Newest message: {}", last_id);
    }
}
