//! Local media storage
//!
//! Images are stored once under the media directory as
//! `{message_id}-{file_unique_id}.jpg`. Downloads land in a temporary file
//! next to the destination and are renamed into place, so an existing
//! filename always refers to a complete download.

use crate::error::{Error, Result};
use crate::source::{MessageSource, Photo};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Local filename for a message's photo
///
/// `file_unique_id` comes from the message source and must stay a single
/// path component inside the media directory.
pub fn media_filename(message_id: i64, photo: &Photo) -> Result<String> {
    let unique_id = photo.file_unique_id.as_str();
    if unique_id.is_empty()
        || unique_id.contains("..")
        || unique_id.contains(['/', '\\', '\0'])
    {
        return Err(Error::Download(format!(
            "message {}: unsafe file id {:?}",
            message_id, unique_id
        )));
    }
    Ok(format!("{}-{}.jpg", message_id, unique_id))
}

/// Directory of downloaded message images
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Make sure the photo exists locally, downloading it only if absent
    pub async fn ensure_local(
        &self,
        source: &dyn MessageSource,
        photo: &Photo,
        message_id: i64,
    ) -> Result<String> {
        let filename = media_filename(message_id, photo)?;
        let dest = self.path_of(&filename);

        if tokio::fs::try_exists(&dest).await? {
            debug!("Media already present: {}", filename);
            return Ok(filename);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let partial = NamedTempFile::new_in(&self.dir)?.into_temp_path();
        source.download(photo, &partial).await?;
        partial
            .persist(&dest)
            .map_err(|e| Error::Download(format!("{}: {}", filename, e.error)))?;

        debug!("Downloaded media: {}", filename);
        Ok(filename)
    }

    pub async fn read(&self, filename: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.path_of(filename)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{photo, VecSource};
    use tempfile::TempDir;

    #[test]
    fn test_media_filename() {
        assert_eq!(media_filename(42, &photo("AQADxyz")).unwrap(), "42-AQADxyz.jpg");
    }

    #[test]
    fn test_media_filename_rejects_path_components() {
        for bad in ["../x", "a/b", "a\\b", "..", ""] {
            assert!(
                matches!(media_filename(1, &photo(bad)), Err(Error::Download(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_unsafe_file_id_never_downloads() {
        let tmp = TempDir::new().unwrap();
        let store = MediaStore::new(tmp.path().join("images"));
        let source = VecSource::new(vec![]);

        let result = store.ensure_local(&source, &photo("../escape"), 5).await;
        assert!(matches!(result, Err(Error::Download(_))));
        assert_eq!(source.download_count(), 0);
        assert!(!tmp.path().join("5-..").exists());
        assert!(!tmp.path().join("escape.jpg").exists());
    }

    #[tokio::test]
    async fn test_ensure_local_downloads_once() {
        let tmp = TempDir::new().unwrap();
        let store = MediaStore::new(tmp.path().join("images"));
        let source = VecSource::new(vec![]);
        let p = photo("u1");

        let first = store.ensure_local(&source, &p, 7).await.unwrap();
        let second = store.ensure_local(&source, &p, 7).await.unwrap();

        assert_eq!(first, "7-u1.jpg");
        assert_eq!(second, first);
        assert_eq!(source.download_count(), 1);
        assert_eq!(store.read(&first).await.unwrap(), b"image-u1".to_vec());
    }

    #[tokio::test]
    async fn test_existing_file_skips_network() {
        let tmp = TempDir::new().unwrap();
        let store = MediaStore::new(tmp.path());
        std::fs::write(tmp.path().join("3-u3.jpg"), b"cached").unwrap();
        let source = VecSource::new(vec![]);

        let name = store.ensure_local(&source, &photo("u3"), 3).await.unwrap();
        assert_eq!(name, "3-u3.jpg");
        assert_eq!(source.download_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_file() {
        let tmp = TempDir::new().unwrap();
        let store = MediaStore::new(tmp.path());
        let source = VecSource::new(vec![]).failing_downloads();

        let result = store.ensure_local(&source, &photo("u4"), 4).await;
        assert!(matches!(result, Err(Error::Download(_))));
        assert!(!tmp.path().join("4-u4.jpg").exists());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
