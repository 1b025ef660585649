use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One entry of a validated archive
///
/// `relative_path` has already passed path validation: no `..`, no root, no control characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntry {
    pub relative_path: PathBuf,
    pub size_bytes: u64,
    pub is_directory: bool,
}

/// Entry listing produced by the validator and reused by later stages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveListing {
    pub entries: Vec<ExtractedEntry>,
    pub archive_bytes: u64,
    pub total_compressed: u64,
    pub total_uncompressed: u64,
}

impl ArchiveListing {
    pub fn file_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_directory).count()
    }
}
