use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{IngestResult, ValidationError};
use crate::models::ArchiveListing;

const COPY_BUFFER_BYTES: usize = 64 * 1024;

/// Extracts a validated archive into `workspace`
///
/// Entries are written only under the paths recorded in `listing`, never under the raw
/// names from the archive. Each entry is read at most one byte past its declared size; an
/// entry that keeps producing data fails the whole extraction.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// - [`ValidationError::SizeMismatch`] if an entry expands beyond its declared size
/// - [`ValidationError::Unreadable`] if an entry's compressed stream is corrupt
/// - I/O errors from the workspace filesystem
pub fn extract_archive(bytes: &[u8], listing: &ArchiveListing, workspace: &Path) -> IngestResult<u64> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| ValidationError::Unreadable(e.to_string()))?;
    let mut written: u64 = 0;

    for (index, expected) in listing.entries.iter().enumerate() {
        let target = workspace.join(&expected.relative_path);

        if expected.is_directory {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let entry = archive.by_index(index).map_err(|e| ValidationError::Unreadable(e.to_string()))?;
        let mut limited = entry.take(expected.size_bytes.saturating_add(1));
        let mut output = File::create(&target)?;
        let copied = copy_entry(&mut limited, &mut output)?;

        if copied > expected.size_bytes {
            return Err(ValidationError::SizeMismatch.into());
        }
        written += copied;
    }

    tracing::debug!(workspace = %workspace.display(), bytes = written, "archive extracted");
    Ok(written)
}

/// Copies one entry, mapping read failures to [`ValidationError::Unreadable`] and write
/// failures to I/O errors
fn copy_entry(reader: &mut impl Read, writer: &mut impl Write) -> IngestResult<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER_BYTES];
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ValidationError::Unreadable(e.to_string()).into()),
        };
        writer.write_all(&buffer[..n])?;
        total += n as u64;
    }

    writer.flush()?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::models::ExtractedEntry;

    fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            for (name, data) in files {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn entry(path: &str, size: u64) -> ExtractedEntry {
        ExtractedEntry { relative_path: PathBuf::from(path), size_bytes: size, is_directory: false }
    }

    #[test]
    fn test_extracts_into_workspace() {
        let bytes = build_zip(&[("a/conversations.json", b"[]"), ("a/file-x.png", b"abc")]);
        let listing = ArchiveListing {
            entries: vec![entry("a/conversations.json", 2), entry("a/file-x.png", 3)],
            ..ArchiveListing::default()
        };
        let dir = TempDir::new().unwrap();

        let written = extract_archive(&bytes, &listing, dir.path()).unwrap();

        assert_eq!(written, 5);
        assert_eq!(fs::read(dir.path().join("a/file-x.png")).unwrap(), b"abc");
    }

    #[test]
    fn test_entry_larger_than_declared_is_rejected() {
        let bytes = build_zip(&[("big.bin", &[7u8; 64])]);
        let listing = ArchiveListing { entries: vec![entry("big.bin", 10)], ..ArchiveListing::default() };
        let dir = TempDir::new().unwrap();

        let err = extract_archive(&bytes, &listing, dir.path()).unwrap_err();
        assert!(matches!(err, crate::error::IngestError::Validation(ValidationError::SizeMismatch)));
    }
}
