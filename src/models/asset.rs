use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Index value: a bare filename or an object carrying at least `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetIndexEntry {
    Name(String),
    Described {
        name: String,
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
}

impl AssetIndexEntry {
    pub fn filename(&self) -> &str {
        match self {
            AssetIndexEntry::Name(name) => name,
            AssetIndexEntry::Described { name, .. } => name,
        }
    }
}

/// Where a loaded asset index came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetIndexSource {
    IndexFile,
    HtmlFallback,
    Empty,
}

/// Mapping from exact asset-pointer strings to stored filenames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetIndex {
    entries: HashMap<String, AssetIndexEntry>,
    source: AssetIndexSource,
}

impl AssetIndex {
    pub fn empty() -> Self {
        Self { entries: HashMap::new(), source: AssetIndexSource::Empty }
    }

    pub fn new(entries: HashMap<String, AssetIndexEntry>, source: AssetIndexSource) -> Self {
        Self { entries, source }
    }

    /// Filename mapped to the exact pointer string, if any
    pub fn filename_for(&self, pointer: &str) -> Option<&str> {
        self.entries.get(pointer).map(AssetIndexEntry::filename).filter(|name| !name.is_empty())
    }

    pub fn source(&self) -> AssetIndexSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &HashMap<String, AssetIndexEntry> {
        &self.entries
    }
}

impl Default for AssetIndex {
    fn default() -> Self {
        Self::empty()
    }
}

/// Outcome of resolving one asset pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetResolution {
    /// Absolute path of the resolved file and its path relative to the media root
    Found { path: PathBuf, relative: PathBuf },
    NotFound,
}

impl AssetResolution {
    pub fn is_found(&self) -> bool {
        matches!(self, AssetResolution::Found { .. })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            AssetResolution::Found { path, .. } => Some(path),
            AssetResolution::NotFound => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_entry_accepts_both_shapes() {
        let json = r#"{
            "file-service://file-a": "file-a.png",
            "sediment://file_b": {"name": "file_b.dat", "size": 12}
        }"#;
        let entries: HashMap<String, AssetIndexEntry> = serde_json::from_str(json).unwrap();
        let index = AssetIndex::new(entries, AssetIndexSource::IndexFile);

        assert_eq!(index.filename_for("file-service://file-a"), Some("file-a.png"));
        assert_eq!(index.filename_for("sediment://file_b"), Some("file_b.dat"));
        assert_eq!(index.filename_for("file-service://missing"), None);
        assert_eq!(index.source(), AssetIndexSource::IndexFile);
    }

    #[test]
    fn test_empty_filename_is_treated_as_missing() {
        let mut entries = HashMap::new();
        entries.insert("file-service://x".to_string(), AssetIndexEntry::Name(String::new()));
        let index = AssetIndex::new(entries, AssetIndexSource::IndexFile);
        assert_eq!(index.filename_for("file-service://x"), None);
    }
}
