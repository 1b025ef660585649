use std::fs;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::{LibraryError, LibraryResult};
use crate::models::{ConversationRecord, ConversationSummary};
use crate::utils::{is_conversation_file_name, safe_open_file};

/// Maximum size of a single stored conversation file: 256MB
const MAX_CONVERSATION_FILE_BYTES: u64 = 256 * 1024 * 1024;

/// Writes bytes to `path` atomically (temp file + rename)
///
/// The temp file lives next to the target so the rename never crosses filesystems. Its
/// dot-prefixed name keeps it out of conversation listings.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no file name"))?;
    let temp = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&temp, bytes)?;
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    Ok(())
}

/// Per-conversation files of one conversation-set
#[derive(Debug, Clone)]
pub struct ConversationStore {
    dir: PathBuf,
}

impl ConversationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Conversation file names, newest first
    ///
    /// File names start with a `YYYY.MM.DD` stamp, so reverse lexical order is date order.
    pub fn file_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && is_conversation_file_name(name)
            {
                names.push(name.to_string());
            }
        }

        names.sort_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Loads one stored conversation file
    pub fn load(&self, file_name: &str) -> Result<ConversationRecord> {
        let path = self.dir.join(file_name);
        let file = safe_open_file(&path, MAX_CONVERSATION_FILE_BYTES)?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse conversation file: {}", file_name))
    }

    /// Loads every conversation in the set, newest first
    ///
    /// Unreadable files are logged and skipped. Fails if more than half of the files cannot
    /// be loaded.
    pub fn load_all(&self) -> LibraryResult<Vec<(String, ConversationRecord)>> {
        let names = self.file_names()?;
        let total = names.len();
        let mut records = Vec::with_capacity(total);
        let mut failed = 0;

        for name in names {
            match self.load(&name) {
                Ok(record) => records.push((name, record)),
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "skipping unreadable conversation file");
                    failed += 1;
                }
            }
        }

        if total > 0 && (failed as f64) / (total as f64) > 0.5 {
            return Err(LibraryError::CorruptSet { failed, total });
        }

        Ok(records)
    }

    /// Listing entries for every conversation, most recently active first
    pub fn summaries(&self) -> LibraryResult<Vec<ConversationSummary>> {
        let mut summaries: Vec<ConversationSummary> = self
            .load_all()?
            .iter()
            .map(|(name, record)| ConversationSummary::from_record(record, name))
            .collect();
        summaries.sort_by(|a, b| b.recency().cmp(&a.recency()));
        Ok(summaries)
    }

    /// Finds a conversation by id
    pub fn find(&self, conversation_id: &str) -> LibraryResult<Option<(String, ConversationRecord)>> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|(_, record)| record.conversation_id() == conversation_id))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2024.01.01_a.json");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert!(!dir.path().join(".2024.01.01_a.json.tmp").exists());
    }

    #[test]
    fn test_file_names_newest_first_and_filtered() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "2023.05.01_old.json", "{}");
        write(dir.path(), "2024.02.01_new.json", "{}");
        write(dir.path(), "assets.json", "{}");
        write(dir.path(), ".2024.03.01_tmp.json.tmp", "{}");

        let store = ConversationStore::new(dir.path());
        assert_eq!(store.file_names().unwrap(), vec!["2024.02.01_new.json", "2023.05.01_old.json"]);
    }

    #[test]
    fn test_find_by_id() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "2024.01.01_a.json", r#"{"id": "a", "title": "A"}"#);
        write(dir.path(), "2024.01.02_b.json", r#"{"id": "b", "title": "B"}"#);

        let store = ConversationStore::new(dir.path());
        let (name, record) = store.find("a").unwrap().unwrap();
        assert_eq!(name, "2024.01.01_a.json");
        assert_eq!(record.display_title(), "A");
        assert!(store.find("zzz").unwrap().is_none());
    }

    #[test]
    fn test_load_all_skips_a_few_bad_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "2024.01.01_a.json", r#"{"id": "a"}"#);
        write(dir.path(), "2024.01.02_b.json", r#"{"id": "b"}"#);
        write(dir.path(), "2024.01.03_c.json", "not json");

        let store = ConversationStore::new(dir.path());
        assert_eq!(store.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_load_all_fails_when_most_files_are_bad() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "2024.01.01_a.json", r#"{"id": "a"}"#);
        write(dir.path(), "2024.01.02_b.json", "garbage");
        write(dir.path(), "2024.01.03_c.json", "garbage");

        let store = ConversationStore::new(dir.path());
        let err = store.load_all().unwrap_err();
        assert!(matches!(err, LibraryError::CorruptSet { failed: 2, total: 3 }));
    }
}
