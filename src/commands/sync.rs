//! Sync command - archive messages newer than the archive's last record

use crate::archive::Archive;
use crate::config::Config;
use crate::error::Result;
use crate::media::MediaStore;
use crate::ocr::TextRecognizer;
use crate::source::MessageSource;
use crate::sync::{SyncEngine, SyncStats};
use indicatif::ProgressBar;
use tracing::info;

/// Execute a steady-state incremental sync
pub async fn cmd_sync(
    config: &Config,
    source: &dyn MessageSource,
    recognizer: &dyn TextRecognizer,
    progress: ProgressBar,
) -> Result<SyncStats> {
    let archive_path = &config.archive.messages_file;
    let mut archive = Archive::load(archive_path)?;
    let media = MediaStore::new(&config.archive.media_dir);

    info!(
        "Syncing channel '{}' into {:?} ({} records)",
        config.channel,
        archive_path,
        archive.len()
    );

    let engine =
        SyncEngine::new(source, recognizer, &media, archive_path).with_progress(progress.clone());
    let stats = engine.sync_new(&mut archive).await?;
    progress.finish_and_clear();

    info!("Added {} messages", stats.added);
    Ok(stats)
}

/// Print the run summary: the number of records added
pub fn print_sync_stats(stats: &SyncStats) {
    println!("{}", stats.added);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveRecord;
    use crate::error::Error;
    use crate::test_support::{photo_message, text_message, FakeRecognizer, VecSource};
    use tempfile::TempDir;

    fn test_config(tmp: &TempDir) -> Config {
        let mut config = Config {
            channel: "demo".to_string(),
            ..Config::default()
        };
        config.archive.messages_file = tmp.path().join("messages.json");
        config.archive.media_dir = tmp.path().join("images");
        config
    }

    #[tokio::test]
    async fn test_cmd_sync_updates_archive_file() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        Archive::from_records(vec![ArchiveRecord::text_only(1, "hello")])
            .save(&config.archive.messages_file)
            .unwrap();

        let source = VecSource::new(vec![
            photo_message(3, "caption", "c3"),
            text_message(2, "world"),
            text_message(1, "hello"),
        ]);
        let recognizer = FakeRecognizer::new();

        let stats = cmd_sync(&config, &source, &recognizer, ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(stats.added, 2);
        assert_eq!(stats.last_id, Some(3));
        assert!(tmp.path().join("images").join("3-c3.jpg").exists());
        let archive = Archive::load(&config.archive.messages_file).unwrap();
        assert_eq!(archive.len(), 3);
    }

    #[tokio::test]
    async fn test_cmd_sync_without_archive_fails() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let source = VecSource::new(vec![text_message(1, "hello")]);
        let recognizer = FakeRecognizer::new();

        let result = cmd_sync(&config, &source, &recognizer, ProgressBar::hidden()).await;
        assert!(matches!(result, Err(Error::Archive(_))));
    }
}
