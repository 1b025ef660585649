use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::CollisionPolicy;
use crate::error::StructureError;
use crate::models::ConversationHeader;
use crate::storage::write_atomic;
use crate::utils::{date_stamp, slugify_title};

/// Counts from one split run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitReport {
    /// Files written
    pub processed: usize,
    /// Records left alone because their file already existed
    pub skipped: usize,
    /// Records that failed to parse or write
    pub errors: usize,
    /// Names of the written files, newest record first
    pub files: Vec<String>,
}

/// `{YYYY.MM.DD}_{slug}.json` for a record
pub fn conversation_file_name(record: &ConversationHeader) -> String {
    let title = record.title.as_deref().unwrap_or_default();
    format!("{}_{}.json", date_stamp(record.recency()), slugify_title(title))
}

/// Splits the conversation document into one file per record under `output_dir`
///
/// Each record is written verbatim (pretty-printed) so fields this crate does not model
/// survive. Only the header fields are read to name the file, so a malformed message graph
/// does not stop a record from being stored. Records are handled newest-first. A record
/// that cannot be parsed or written is logged and counted in `errors`; the rest of the
/// batch continues.
///
/// # Errors
///
/// Fails only if the document is not JSON or not a top-level array.
pub fn split_conversations(
    document: &str,
    output_dir: &Path,
    policy: CollisionPolicy,
) -> Result<SplitReport, StructureError> {
    let parsed: Value = serde_json::from_str(document)?;
    let Value::Array(items) = parsed else {
        return Err(StructureError::NotAnArray);
    };

    let mut report = SplitReport::default();
    let mut planned: Vec<(f64, String, Value)> = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        match ConversationHeader::deserialize(&item) {
            Ok(record) => planned.push((record.recency(), conversation_file_name(&record), item)),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping malformed conversation record");
                report.errors += 1;
            }
        }
    }

    // Stable, so records with equal timestamps keep document order
    planned.sort_by(|a, b| b.0.total_cmp(&a.0));

    for (_, file_name, item) in planned {
        let target = output_dir.join(&file_name);

        if policy == CollisionPolicy::Skip && target.exists() {
            tracing::debug!(file = %file_name, "conversation file exists, skipping");
            report.skipped += 1;
            continue;
        }

        let written = serde_json::to_vec_pretty(&item)
            .map_err(std::io::Error::from)
            .and_then(|bytes| write_atomic(&target, &bytes));
        match written {
            Ok(()) => {
                report.processed += 1;
                report.files.push(file_name);
            }
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "failed to write conversation file");
                report.errors += 1;
            }
        }
    }

    tracing::info!(
        processed = report.processed,
        skipped = report.skipped,
        errors = report.errors,
        "conversation document split"
    );

    Ok(report)
}
