//! Typed errors for ingestion and library access.
//!
//! # Error Handling Strategy
//!
//! - **Validation failures** ([`ValidationError`]) reject the whole archive before a single
//!   byte is extracted. `Display` carries sizes and counts for logs; [`ValidationError::user_message`]
//!   is the generic sentence shown to end users and never includes entry paths.
//!
//! - **Structure failures** ([`StructureError`]) happen after extraction into the temporary
//!   workspace. The workspace is still torn down.
//!
//! - **Per-record failures** while splitting are counted in the split report and logged;
//!   they never surface as an error.
//!
//! - **Resource failures** (disk full, permission denied) are propagated unmodified as
//!   [`std::io::Error`].

use std::io;

use thiserror::Error;

use crate::ingest::PipelineStage;

/// Reasons an archive is rejected before extraction
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("archive is {size} bytes, limit is {limit} bytes")]
    Oversize { size: u64, limit: u64 },

    #[error("archive does not start with a known container signature")]
    BadSignature,

    #[error("archive could not be read as a zip container: {0}")]
    Unreadable(String),

    #[error("compression ratio {ratio:.1} exceeds limit of {limit:.1}")]
    ZipBomb { ratio: f64, limit: f64 },

    #[error("entry expands beyond its declared size")]
    SizeMismatch,

    #[error("archive expands to {total} bytes, limit is {limit} bytes")]
    UncompressedTooLarge { total: u64, limit: u64 },

    #[error("archive has {count} entries, limit is {limit}")]
    TooManyEntries { count: usize, limit: usize },

    // Entry index only: the offending path is never echoed back.
    #[error("archive entry #{index} has an unsafe path")]
    UnsafePath { index: usize },
}

impl ValidationError {
    /// Generic message suitable for end users
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::Oversize { .. } => "The uploaded archive is too large.",
            ValidationError::BadSignature | ValidationError::Unreadable(_) => {
                "The uploaded file is not a supported archive."
            }
            ValidationError::ZipBomb { .. }
            | ValidationError::SizeMismatch
            | ValidationError::UncompressedTooLarge { .. }
            | ValidationError::TooManyEntries { .. } => {
                "The uploaded archive expands to an unsafe size."
            }
            ValidationError::UnsafePath { .. } => "The uploaded archive contains unsafe file paths.",
        }
    }
}

/// Reasons an extracted archive cannot be turned into a conversation-set
#[derive(Debug, Error)]
pub enum StructureError {
    #[error("no conversation document found in archive")]
    MissingConversationDocument,

    #[error("conversation document is not a top-level array")]
    NotAnArray,

    #[error("conversation document is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Everything that can fail an ingestion run
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("structure error: {0}")]
    Structure(#[from] StructureError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("ingestion cancelled before {stage}")]
    Cancelled { stage: PipelineStage },
}

impl IngestError {
    /// Short tag naming the failure class, used in progress events and logs
    pub fn reason_tag(&self) -> &'static str {
        match self {
            IngestError::Validation(_) => "validation",
            IngestError::Structure(_) => "structure",
            IngestError::Io(_) => "resource",
            IngestError::Cancelled { .. } => "cancelled",
        }
    }

    /// Message safe to show to end users
    pub fn user_message(&self) -> String {
        match self {
            IngestError::Validation(e) => e.user_message().to_string(),
            IngestError::Structure(StructureError::MissingConversationDocument) => {
                "The archive does not contain a conversations document.".to_string()
            }
            IngestError::Structure(_) => "The conversations document is malformed.".to_string(),
            IngestError::Io(_) => "The archive could not be stored.".to_string(),
            IngestError::Cancelled { .. } => "The import was cancelled.".to_string(),
        }
    }
}

/// Errors from read-side library operations
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("conversation-set not found: {0}")]
    SetNotFound(String),

    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("{failed} of {total} conversation files could not be read")]
    CorruptSet { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
pub type LibraryResult<T> = std::result::Result<T, LibraryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_never_echo_details() {
        let errors = vec![
            ValidationError::Oversize { size: 10, limit: 5 },
            ValidationError::ZipBomb { ratio: 150.0, limit: 100.0 },
            ValidationError::UnsafePath { index: 3 },
            ValidationError::TooManyEntries { count: 9, limit: 2 },
        ];

        for err in errors {
            let msg = err.user_message();
            assert!(!msg.contains("150"));
            assert!(!msg.contains('#'));
            assert!(!msg.is_empty());
        }
    }

    #[test]
    fn test_unsafe_path_display_has_no_path() {
        let err = ValidationError::UnsafePath { index: 7 };
        assert_eq!(err.to_string(), "archive entry #7 has an unsafe path");
    }

    #[test]
    fn test_reason_tags() {
        let err = IngestError::from(StructureError::NotAnArray);
        assert_eq!(err.reason_tag(), "structure");
        assert_eq!(err.user_message(), "The conversations document is malformed.");

        let err = IngestError::Cancelled { stage: PipelineStage::Splitting };
        assert_eq!(err.reason_tag(), "cancelled");
    }
}
