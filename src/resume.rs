//! Persisted resume position for a triage session

use crate::error::{Result, ShortlistError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DEFAULT_SESSION: &str = "default";

/// What is needed to pick a pass back up where it stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub images_root: PathBuf,
    pub output_dir: PathBuf,
    pub current_index: usize,
    pub total_images: usize,
    pub saved_at: DateTime<Utc>,
    /// Image under the cursor; found again by path after a rescan
    #[serde(default)]
    pub current_image: Option<PathBuf>,
    /// Scan setting that produced the indexed list
    #[serde(default)]
    pub skip_hidden: bool,
}

impl ResumeRecord {
    pub fn new(
        images_root: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        current_index: usize,
        total_images: usize,
    ) -> Self {
        Self {
            images_root: images_root.into(),
            output_dir: output_dir.into(),
            current_index,
            total_images,
            saved_at: Utc::now(),
            current_image: None,
            skip_hidden: false,
        }
    }
}

/// One JSON file per session key.
#[derive(Debug, Clone)]
pub struct ResumeStore {
    path: PathBuf,
}

impl ResumeStore {
    /// Default state directory (~/.local/share/shortlist/sessions on Linux)
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("shortlist").join("sessions"))
    }

    pub fn for_session(state_dir: &Path, session_key: &str) -> Self {
        let key = sanitize_key(session_key);
        Self {
            path: state_dir.join(format!("{}.json", key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored record.
    ///
    /// `Ok(None)` when no session was saved yet, [`ShortlistError::ResumeCorrupt`]
    /// when the file exists but cannot be parsed.
    pub fn load(&self) -> Result<Option<ResumeRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ShortlistError::resume_corrupt(&self.path, e)),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| ShortlistError::resume_corrupt(&self.path, e))
    }

    /// Replaces the stored record via write-temp-then-rename
    pub fn save(&self, record: &ResumeRecord) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| ShortlistError::ConfigError("resume path has no parent".to_string()))?;
        fs::create_dir_all(dir)?;

        let contents = serde_json::to_string_pretty(record).map_err(|e| {
            ShortlistError::ConfigError(format!("Failed to serialize resume record: {}", e))
        })?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(
            "saved resume cursor {} to {}",
            record.current_index,
            self.path.display()
        );
        Ok(())
    }
}

fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        DEFAULT_SESSION.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResumeStore::for_session(temp_dir.path(), "photos");
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResumeStore::for_session(temp_dir.path(), "photos");
        let mut record = ResumeRecord::new("/photos", "/shortlist", 41, 120);
        record.current_image = Some(PathBuf::from("/photos/day2/IMG_0042.jpg"));
        record.skip_hidden = true;

        store.save(&record).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded, record);
    }

    #[test]
    fn test_save_overwrites_previous_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResumeStore::for_session(temp_dir.path(), "photos");
        let record = ResumeRecord::new("/photos", "/shortlist", 0, 10);

        store.save(&record).unwrap();
        store
            .save(&ResumeRecord::new("/photos", "/shortlist", 7, 10))
            .unwrap();

        assert_eq!(store.load().unwrap().unwrap().current_index, 7);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResumeStore::for_session(temp_dir.path(), "photos");
        store
            .save(&ResumeRecord::new("/photos", "/out", 3, 9))
            .unwrap();

        let entries: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("photos.json")]);
    }

    #[test]
    fn test_record_file_is_readable_json() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResumeStore::for_session(temp_dir.path(), "photos");
        store
            .save(&ResumeRecord::new("/photos", "/out", 3, 9))
            .unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"images_root\": \"/photos\""));
        assert!(text.contains("\"current_index\": 3"));
    }

    #[test]
    fn test_record_without_image_fields_loads() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResumeStore::for_session(temp_dir.path(), "photos");
        fs::write(
            store.path(),
            r#"{"images_root":"/photos","output_dir":"/out","current_index":2,
               "total_images":5,"saved_at":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();

        let record = store.load().unwrap().unwrap();
        assert_eq!(record.current_index, 2);
        assert!(record.current_image.is_none());
        assert!(!record.skip_hidden);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResumeStore::for_session(temp_dir.path(), "photos");
        fs::write(store.path(), "{ not json").unwrap();

        let result = store.load();
        assert!(matches!(result, Err(ShortlistError::ResumeCorrupt { .. })));
    }

    #[test]
    fn test_session_keys_are_separate_files() {
        let temp_dir = TempDir::new().unwrap();
        let a = ResumeStore::for_session(temp_dir.path(), "trip");
        let b = ResumeStore::for_session(temp_dir.path(), "wedding");

        a.save(&ResumeRecord::new("/trip", "/out", 1, 2)).unwrap();

        assert!(a.load().unwrap().is_some());
        assert!(b.load().unwrap().is_none());
    }

    #[test]
    fn test_session_key_is_sanitized() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResumeStore::for_session(temp_dir.path(), "../../etc/passwd");
        assert_eq!(store.path(), temp_dir.path().join("etcpasswd.json"));

        let store = ResumeStore::for_session(temp_dir.path(), "///");
        assert_eq!(store.path(), temp_dir.path().join("default.json"));
    }
}
