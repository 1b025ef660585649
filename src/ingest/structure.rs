//! Structure detection over an extracted workspace.
//!
//! Finds the conversation document, strips wrapping folders and classifies the remaining
//! entries as companion files, media or other.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::IngestLimits;
use crate::error::StructureError;
use crate::models::ArchiveListing;
use crate::utils::{safe_open_file, strip_wrapper, top_level_segment};

pub const CONVERSATION_DOCUMENT: &str = "conversations.json";
pub const COMPANION_HTML: &str = "chat.html";
pub const ASSET_INDEX_FILE: &str = "assets.json";
pub const LEGACY_MEDIA_DIR: &str = "dalle-generations";

const MEDIA_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "heic", "wav", "mp3", "m4a", "ogg", "webm",
    "mp4", "mov", "dat", "pdf",
];

/// How an extracted file is treated when the set is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    ConversationDocument,
    CompanionHtml,
    AssetIndex,
    Media,
    Other,
}

/// Detected layout of an extracted archive
///
/// All paths are relative to the workspace root and still include the wrapper.
#[derive(Debug, Clone, Default)]
pub struct ArchiveLayout {
    pub wrapper: Option<PathBuf>,
    pub conversation_document: PathBuf,
    pub companion_html: Option<PathBuf>,
    pub asset_index: Option<PathBuf>,
    pub media: Vec<PathBuf>,
    pub other: Vec<PathBuf>,
}

impl ArchiveLayout {
    /// Path with the wrapping folder removed, as it will be stored
    pub fn relocated(&self, path: &Path) -> PathBuf {
        strip_wrapper(path, self.wrapper.as_deref())
    }
}

/// Returns true for files that belong in the media root
///
/// Matches the export's own naming (`file-…`, `file_…`), the legacy image folder, per-user
/// folders (`user-…`) and common media extensions.
pub fn is_media_path(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    if name.starts_with("file-") || name.starts_with("file_") {
        return true;
    }

    let in_media_folder = path
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| c.as_os_str().to_str())
        .any(|segment| segment == LEGACY_MEDIA_DIR || segment.starts_with("user-"));
    if in_media_folder {
        return true;
    }

    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Finds the common wrapping folder(s) shared by every entry
///
/// A level counts as a wrapper only if every entry lives strictly inside it; a lone
/// top-level file is never a wrapper.
pub fn detect_wrapper(listing: &ArchiveListing) -> Option<PathBuf> {
    let files: Vec<&Path> = listing
        .entries
        .iter()
        .filter(|e| !e.is_directory)
        .map(|e| e.relative_path.as_path())
        .collect();
    if files.is_empty() {
        return None;
    }

    let mut wrapper = PathBuf::new();
    loop {
        let remaining: Vec<PathBuf> =
            files.iter().map(|p| strip_wrapper(p, Some(wrapper.as_path()))).collect();
        let Some(first) = remaining.first().and_then(|p| top_level_segment(p)) else {
            break;
        };

        let shared = remaining
            .iter()
            .all(|p| p.components().count() > 1 && top_level_segment(p) == Some(first));
        if !shared {
            break;
        }
        wrapper.push(first);
    }

    if wrapper.as_os_str().is_empty() { None } else { Some(wrapper) }
}

/// Detects the archive layout and loads the conversation document
///
/// Candidates named `conversations.json` are tried in listing order; the first one that is
/// a regular file within the size limit and decodes as text without NUL bytes wins. Other
/// candidates are logged and ignored.
///
/// # Errors
///
/// Returns [`StructureError::MissingConversationDocument`] if no candidate qualifies.
pub fn detect_structure(
    workspace: &Path,
    listing: &ArchiveListing,
    limits: &IngestLimits,
) -> Result<(ArchiveLayout, String), StructureError> {
    let mut layout = ArchiveLayout { wrapper: detect_wrapper(listing), ..ArchiveLayout::default() };
    let mut document: Option<String> = None;

    for entry in listing.entries.iter().filter(|e| !e.is_directory) {
        let path = &entry.relative_path;
        match classify(path) {
            EntryKind::ConversationDocument => {
                if document.is_some() {
                    tracing::debug!(path = %path.display(), "ignoring extra conversation document");
                    continue;
                }
                match load_document(&workspace.join(path), limits.max_document_bytes) {
                    Ok(text) => {
                        layout.conversation_document = path.clone();
                        document = Some(text);
                    }
                    Err(reason) => {
                        tracing::warn!(path = %path.display(), %reason, "skipping conversation document candidate");
                    }
                }
            }
            EntryKind::CompanionHtml if layout.companion_html.is_none() => {
                layout.companion_html = Some(path.clone());
            }
            EntryKind::AssetIndex if layout.asset_index.is_none() => {
                layout.asset_index = Some(path.clone());
            }
            EntryKind::Media => layout.media.push(path.clone()),
            _ => layout.other.push(path.clone()),
        }
    }

    let document = document.ok_or(StructureError::MissingConversationDocument)?;

    tracing::info!(
        wrapper = ?layout.wrapper,
        media = layout.media.len(),
        other = layout.other.len(),
        companion_html = layout.companion_html.is_some(),
        asset_index = layout.asset_index.is_some(),
        "archive structure detected"
    );

    Ok((layout, document))
}

fn classify(path: &Path) -> EntryKind {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(CONVERSATION_DOCUMENT) => EntryKind::ConversationDocument,
        Some(COMPANION_HTML) => EntryKind::CompanionHtml,
        Some(ASSET_INDEX_FILE) => EntryKind::AssetIndex,
        _ if is_media_path(path) => EntryKind::Media,
        _ => EntryKind::Other,
    }
}

fn load_document(path: &Path, max_bytes: u64) -> anyhow::Result<String> {
    let mut file = safe_open_file(path, max_bytes)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let text = String::from_utf8(bytes).map_err(|_| anyhow::anyhow!("not valid UTF-8 text"))?;
    if text.contains('\0') {
        anyhow::bail!("contains NUL bytes");
    }
    Ok(text)
}
