//! Pre-extraction archive validation.
//!
//! Every check here runs against the in-memory bytes and the central directory only. Nothing
//! is written to disk until [`validate_archive`] has returned a listing.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. archive size against `max_archive_bytes`
//! 2. leading container signature
//! 3. expansion heuristics: entry count, compression ratio, total uncompressed size
//! 4. entry paths: no traversal, no absolute paths, no control characters

use std::io::Cursor;

use zip::ZipArchive;

use crate::config::IngestLimits;
use crate::error::ValidationError;
use crate::models::{ArchiveListing, ExtractedEntry};
use crate::utils::validate_entry_path;

/// Local file header, empty-archive end record and spanned-archive marker
pub const ZIP_SIGNATURES: [&[u8; 4]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

/// Returns true if the bytes start with a recognized zip signature
pub fn has_zip_signature(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && ZIP_SIGNATURES.iter().any(|sig| bytes[..4] == sig[..])
}

/// Uncompressed/compressed ratio, with the compressed total floored at one byte
pub fn compression_ratio(total_compressed: u64, total_uncompressed: u64) -> f64 {
    total_uncompressed as f64 / total_compressed.max(1) as f64
}

/// Applies the zip-bomb heuristics to central-directory totals
///
/// # Errors
///
/// Returns the first exceeded limit: ratio, then total uncompressed size, then entry count.
pub fn check_expansion(
    total_compressed: u64,
    total_uncompressed: u64,
    entry_count: usize,
    limits: &IngestLimits,
) -> Result<(), ValidationError> {
    let ratio = compression_ratio(total_compressed, total_uncompressed);
    if ratio > limits.max_compression_ratio {
        return Err(ValidationError::ZipBomb { ratio, limit: limits.max_compression_ratio });
    }

    if total_uncompressed > limits.max_uncompressed_bytes {
        return Err(ValidationError::UncompressedTooLarge {
            total: total_uncompressed,
            limit: limits.max_uncompressed_bytes,
        });
    }

    if entry_count > limits.max_entries {
        return Err(ValidationError::TooManyEntries { count: entry_count, limit: limits.max_entries });
    }

    Ok(())
}

/// Validates an archive held in memory and returns its entry listing
///
/// `declared_size` is the size reported by the caller (e.g. an upload's content length); the
/// larger of it and the actual byte count is checked against the limit.
///
/// # Errors
///
/// Returns a [`ValidationError`] describing the first failed check. Unsafe paths are
/// reported by entry index only.
pub fn validate_archive(
    bytes: &[u8],
    declared_size: Option<u64>,
    limits: &IngestLimits,
) -> Result<ArchiveListing, ValidationError> {
    let size = declared_size.unwrap_or(0).max(bytes.len() as u64);
    if size > limits.max_archive_bytes {
        return Err(ValidationError::Oversize { size, limit: limits.max_archive_bytes });
    }

    if !has_zip_signature(bytes) {
        return Err(ValidationError::BadSignature);
    }

    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| ValidationError::Unreadable(e.to_string()))?;

    // Refuse huge central directories before walking them
    let entry_count = archive.len();
    if entry_count > limits.max_entries {
        return Err(ValidationError::TooManyEntries { count: entry_count, limit: limits.max_entries });
    }

    let mut raw_entries = Vec::with_capacity(entry_count);
    let mut total_compressed: u64 = 0;
    let mut total_uncompressed: u64 = 0;

    for i in 0..entry_count {
        let entry = archive.by_index_raw(i).map_err(|e| ValidationError::Unreadable(e.to_string()))?;
        total_compressed = total_compressed.saturating_add(entry.compressed_size());
        total_uncompressed = total_uncompressed.saturating_add(entry.size());
        raw_entries.push((entry.name().to_string(), entry.size(), entry.is_dir()));
    }

    check_expansion(total_compressed, total_uncompressed, entry_count, limits)?;

    let mut entries = Vec::with_capacity(raw_entries.len());
    for (index, (name, size_bytes, is_directory)) in raw_entries.into_iter().enumerate() {
        let relative_path = validate_entry_path(&name).ok_or(ValidationError::UnsafePath { index })?;
        entries.push(ExtractedEntry { relative_path, size_bytes, is_directory });
    }

    Ok(ArchiveListing {
        entries,
        archive_bytes: bytes.len() as u64,
        total_compressed,
        total_uncompressed,
    })
}
