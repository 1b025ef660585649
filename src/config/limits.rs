use serde::{Deserialize, Serialize};

const GIB: u64 = 1024 * 1024 * 1024;

/// Maximum archive size accepted for ingestion: 2GB
const MAX_ARCHIVE_BYTES: u64 = 2 * GIB;

/// Maximum uncompressed/compressed ratio before an archive is treated as a zip bomb
const MAX_COMPRESSION_RATIO: f64 = 100.0;

/// Maximum total uncompressed size: 8GB
const MAX_UNCOMPRESSED_BYTES: u64 = 8 * GIB;

/// Maximum number of entries in one archive (security: prevent resource exhaustion)
const MAX_ENTRIES: usize = 100_000;

/// Maximum size of the conversation document: 1GB
const MAX_DOCUMENT_BYTES: u64 = GIB;

/// Resource ceilings enforced while validating and extracting an archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestLimits {
    pub max_archive_bytes: u64,
    pub max_compression_ratio: f64,
    pub max_uncompressed_bytes: u64,
    pub max_entries: usize,
    pub max_document_bytes: u64,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_archive_bytes: MAX_ARCHIVE_BYTES,
            max_compression_ratio: MAX_COMPRESSION_RATIO,
            max_uncompressed_bytes: MAX_UNCOMPRESSED_BYTES,
            max_entries: MAX_ENTRIES,
            max_document_bytes: MAX_DOCUMENT_BYTES,
        }
    }
}
