//! Durable message archive
//!
//! The archive is a single JSON array of records, sorted ascending by id
//! with no duplicate ids. Every save rewrites the whole document through a
//! temporary file in the same directory followed by a rename, so readers
//! only ever see a complete document.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// One archived message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub id: i64,
    #[serde(default)]
    pub text: String,
    /// Local filename of the message image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// Text recognized on `media`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr: Option<String>,
}

impl ArchiveRecord {
    pub fn text_only(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            media: None,
            ocr: None,
        }
    }
}

/// Ordered collection of archived records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    records: Vec<ArchiveRecord>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an archive from records in any order; later duplicates win
    pub fn from_records(mut records: Vec<ArchiveRecord>) -> Self {
        // Stable sort keeps input order within an id, so the last one is kept
        records.sort_by_key(|r| r.id);
        let mut deduped: Vec<ArchiveRecord> = Vec::with_capacity(records.len());
        for record in records {
            match deduped.last_mut() {
                Some(last) if last.id == record.id => *last = record,
                _ => deduped.push(record),
            }
        }
        Self { records: deduped }
    }

    /// Load an archive document
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading archive from {:?}", path);

        if !path.exists() {
            return Err(Error::Archive(format!(
                "Archive not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let records: Vec<ArchiveRecord> = serde_json::from_str(&content).map_err(|e| {
            Error::Archive(format!("{} is not a valid archive: {}", path.display(), e))
        })?;
        Ok(Self::from_records(records))
    }

    /// Load an archive document, treating a missing file as empty
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Rewrite the whole archive document
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let content = serde_json::to_string_pretty(&self.records)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;

        debug!("Saved {} records to {:?}", self.records.len(), path);
        Ok(())
    }

    /// Insert a record, replacing any existing record with the same id
    pub fn insert(&mut self, record: ArchiveRecord) {
        match self.records.binary_search_by_key(&record.id, |r| r.id) {
            Ok(idx) => self.records[idx] = record,
            Err(idx) => self.records.insert(idx, record),
        }
    }

    /// Highest archived id
    pub fn last_id(&self) -> Option<i64> {
        self.records.last().map(|r| r.id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.records.binary_search_by_key(&id, |r| r.id).is_ok()
    }

    pub fn get(&self, id: i64) -> Option<&ArchiveRecord> {
        self.records
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// Ids of records that have media but no recognized text
    pub fn missing_ocr(&self) -> Vec<i64> {
        self.records
            .iter()
            .filter(|r| r.media.is_some() && r.ocr.is_none())
            .map(|r| r.id)
            .collect()
    }

    pub fn records(&self) -> &[ArchiveRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_insert_keeps_order_and_unique_ids() {
        let mut archive = Archive::new();
        archive.insert(ArchiveRecord::text_only(5, "five"));
        archive.insert(ArchiveRecord::text_only(2, "two"));
        archive.insert(ArchiveRecord::text_only(9, "nine"));
        archive.insert(ArchiveRecord::text_only(2, "two again"));

        let ids: Vec<i64> = archive.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
        assert_eq!(archive.get(2).unwrap().text, "two again");
        assert_eq!(archive.last_id(), Some(9));
        assert!(archive.contains(5));
        assert!(!archive.contains(6));
    }

    #[test]
    fn test_from_records_later_duplicate_wins() {
        let archive = Archive::from_records(vec![
            ArchiveRecord::text_only(7, "first"),
            ArchiveRecord::text_only(3, "three"),
            ArchiveRecord::text_only(7, "second"),
        ]);

        let ids: Vec<i64> = archive.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 7]);
        assert_eq!(archive.get(7).unwrap().text, "second");
    }

    #[test]
    fn test_from_records_large_reversed_input() {
        let records: Vec<ArchiveRecord> = (0..20_000)
            .rev()
            .map(|id| ArchiveRecord::text_only(id, "x"))
            .collect();

        let start = std::time::Instant::now();
        let archive = Archive::from_records(records);
        assert!(start.elapsed() < std::time::Duration::from_millis(200));

        assert_eq!(archive.len(), 20_000);
        assert_eq!(archive.records()[0].id, 0);
        assert_eq!(archive.last_id(), Some(19_999));
    }

    #[test]
    fn test_serialization_omits_missing_media() {
        let records = vec![
            ArchiveRecord::text_only(1, "hello"),
            ArchiveRecord {
                id: 2,
                text: "pic".to_string(),
                media: Some("2-abc.jpg".to_string()),
                ocr: Some("line one\nline two".to_string()),
            },
        ];
        let json = serde_json::to_value(&records).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"id": 1, "text": "hello"},
                {"id": 2, "text": "pic", "media": "2-abc.jpg", "ocr": "line one\nline two"}
            ])
        );
    }

    #[test]
    fn test_save_load_pretty_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("messages.json");
        let archive = Archive::from_records(vec![
            ArchiveRecord::text_only(3, "草"),
            ArchiveRecord::text_only(1, "hello"),
        ]);

        archive.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[\n  {\n    \"id\": 1,"));
        assert!(content.contains("\"草\""));

        let loaded = Archive::load(&path).unwrap();
        assert_eq!(loaded, archive);

        // Only the document itself remains in the directory
        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_load_sorts_unsorted_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("messages.json");
        std::fs::write(&path, r#"[{"id": 4, "text": "b"}, {"id": 1, "text": "a"}]"#).unwrap();

        let archive = Archive::load(&path).unwrap();
        assert_eq!(archive.records()[0].id, 1);
        assert_eq!(archive.last_id(), Some(4));
    }

    #[test]
    fn test_load_errors() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.json");
        assert!(matches!(Archive::load(&missing), Err(Error::Archive(_))));
        assert!(Archive::load_or_empty(&missing).unwrap().is_empty());

        let broken = tmp.path().join("broken.json");
        std::fs::write(&broken, "[{\"id\": 1,").unwrap();
        assert!(matches!(Archive::load(&broken), Err(Error::Archive(_))));
    }

    #[test]
    fn test_missing_ocr() {
        let archive = Archive::from_records(vec![
            ArchiveRecord::text_only(1, "plain"),
            ArchiveRecord {
                id: 2,
                text: String::new(),
                media: Some("2-a.jpg".to_string()),
                ocr: None,
            },
            ArchiveRecord {
                id: 3,
                text: String::new(),
                media: Some("3-b.jpg".to_string()),
                ocr: Some("done".to_string()),
            },
        ]);
        assert_eq!(archive.missing_ocr(), vec![2]);
    }
}
