//! The ingestion state machine.
//!
//! `Received → Validating → Extracting → StructureDetected → Splitting → Finalizing → Committed`
//!
//! Any failure moves to `Failed` with a reason tag. The extraction workspace is a temporary
//! directory under the layout's staging dir and is removed on every exit path.
//!
//! Cancellation is checked before each transition. Files already written by `Splitting` or
//! `Finalizing` are not rolled back when a later check fires: re-running the same archive is
//! safe (at-least-once), but a cancelled run may leave a partially populated set behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use uuid::Uuid;

use super::extractor::extract_archive;
use super::progress::{CancellationToken, PipelineStage, ProgressEvent, ProgressSink};
use super::splitter::{SplitReport, split_conversations};
use super::structure::{ArchiveLayout, detect_structure};
use super::validator::validate_archive;
use crate::assets::{extract_assets_json, parse_index_json};
use crate::config::{CollisionPolicy, IngestLimits};
use crate::error::{IngestError, IngestResult};
use crate::models::AssetIndexSource;
use crate::storage::{SetRoots, StorageLayout, write_atomic};
use crate::utils::set_id_from_name;

/// Outcome of a committed ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub set_id: String,
    pub split: SplitReport,
    /// Media files relocated into the media root
    pub media_files: usize,
    /// Extracted files that were neither media nor companion files; not stored
    pub other_files: usize,
    /// Where the stored asset index came from
    pub asset_index_source: AssetIndexSource,
}

/// Temporary extraction directory, removed when dropped
///
/// Removal failures are logged, never propagated.
struct Workspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    fn create(staging: &Path) -> IngestResult<Self> {
        fs::create_dir_all(staging)?;
        let dir = tempfile::Builder::new().prefix("ingest-").tempdir_in(staging)?;
        tracing::debug!(workspace = %dir.path().display(), "workspace created");
        Ok(Self { path: dir.path().to_path_buf(), dir: Some(dir) })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take()
            && let Err(e) = dir.close()
        {
            tracing::warn!(workspace = %self.path.display(), error = %e, "failed to remove workspace");
        }
    }
}

/// One ingestion run against a storage layout
pub struct IngestPipeline<'a> {
    layout: &'a dyn StorageLayout,
    limits: &'a IngestLimits,
    policy: CollisionPolicy,
    sink: &'a dyn ProgressSink,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> IngestPipeline<'a> {
    pub fn new(
        layout: &'a dyn StorageLayout,
        limits: &'a IngestLimits,
        policy: CollisionPolicy,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self { layout, limits, policy, sink, cancel: None }
    }

    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Runs the full pipeline over an archive held in memory
    ///
    /// `set_name` is reduced to a filesystem-safe id; a name with nothing usable gets a
    /// random id.
    ///
    /// # Errors
    ///
    /// Returns the failure that moved the run to `Failed`. A `Failed` progress event carrying
    /// the user-facing message is emitted before returning.
    pub fn run(
        &self,
        bytes: &[u8],
        declared_size: Option<u64>,
        set_name: &str,
    ) -> IngestResult<IngestReport> {
        let set_id =
            set_id_from_name(set_name).unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let span = tracing::info_span!("ingest", set_id = %set_id);
        let _entered = span.enter();

        match self.run_stages(bytes, declared_size, &set_id) {
            Ok(report) => {
                self.emit(
                    PipelineStage::Committed,
                    format!("Imported {} conversations", report.split.processed),
                );
                tracing::info!(
                    processed = report.split.processed,
                    skipped = report.split.skipped,
                    errors = report.split.errors,
                    media = report.media_files,
                    "ingestion committed"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(reason = e.reason_tag(), error = %e, "ingestion failed");
                self.emit(PipelineStage::Failed, e.user_message());
                Err(e)
            }
        }
    }

    fn run_stages(
        &self,
        bytes: &[u8],
        declared_size: Option<u64>,
        set_id: &str,
    ) -> IngestResult<IngestReport> {
        self.emit(PipelineStage::Received, format!("Received {} bytes", bytes.len()));

        self.enter(PipelineStage::Validating, "Validating archive".to_string())?;
        let listing = validate_archive(bytes, declared_size, self.limits)?;

        self.enter(PipelineStage::Extracting, format!("Extracting {} entries", listing.entries.len()))?;
        let workspace = Workspace::create(&self.layout.staging_dir())?;
        extract_archive(bytes, &listing, workspace.path())?;

        self.check_cancelled(PipelineStage::StructureDetected)?;
        let (archive_layout, document) = detect_structure(workspace.path(), &listing, self.limits)?;
        self.emit(
            PipelineStage::StructureDetected,
            format!(
                "Found conversation document and {} media files",
                archive_layout.media.len()
            ),
        );

        self.enter(PipelineStage::Splitting, "Splitting conversations".to_string())?;
        let roots = self.layout.roots(set_id);
        fs::create_dir_all(&roots.set_root)?;
        fs::create_dir_all(&roots.media_root)?;
        let split = match split_conversations(&document, &roots.set_root, self.policy) {
            Ok(split) => split,
            Err(e) => {
                // Only removes directories this run left empty
                let _ = fs::remove_dir(&roots.media_root);
                let _ = fs::remove_dir(&roots.set_root);
                return Err(e.into());
            }
        };
        drop(document);

        self.enter(PipelineStage::Finalizing, "Storing media and asset index".to_string())?;
        let media_files = relocate_media(workspace.path(), &archive_layout, &roots.media_root)?;
        let asset_index_source = store_companions(workspace.path(), &archive_layout, &roots)?;

        if !archive_layout.other.is_empty() {
            tracing::debug!(count = archive_layout.other.len(), "ignoring non-media files");
        }

        Ok(IngestReport {
            set_id: set_id.to_string(),
            split,
            media_files,
            other_files: archive_layout.other.len(),
            asset_index_source,
        })
    }

    fn enter(&self, stage: PipelineStage, message: String) -> IngestResult<()> {
        self.check_cancelled(stage)?;
        self.emit(stage, message);
        Ok(())
    }

    fn check_cancelled(&self, stage: PipelineStage) -> IngestResult<()> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(IngestError::Cancelled { stage }),
            _ => Ok(()),
        }
    }

    fn emit(&self, stage: PipelineStage, message: String) {
        tracing::debug!(%stage, %message, "pipeline transition");
        self.sink.report(ProgressEvent { stage, percentage: stage.percentage(), message });
    }
}

/// Moves media files into the media root with the wrapper stripped
fn relocate_media(workspace: &Path, layout: &ArchiveLayout, media_root: &Path) -> IngestResult<usize> {
    let mut moved = 0;
    for relative in &layout.media {
        let target = media_root.join(layout.relocated(relative));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        move_file(&workspace.join(relative), &target)?;
        moved += 1;
    }
    Ok(moved)
}

/// Stores the companion HTML page and the asset index
///
/// When the archive has no index file, the index embedded in the HTML page is extracted
/// and stored in its place so later loads skip the HTML scan. Companion files left by an
/// earlier import of the same set are removed when this archive has no replacement, so the
/// stored index always matches the reported source.
fn store_companions(
    workspace: &Path,
    layout: &ArchiveLayout,
    roots: &SetRoots,
) -> IngestResult<AssetIndexSource> {
    let mut html: Option<String> = None;
    if let Some(relative) = &layout.companion_html {
        let source = workspace.join(relative);
        fs::copy(&source, roots.companion_html_path())?;
        html = fs::read_to_string(&source).ok();
    } else {
        remove_if_present(&roots.companion_html_path())?;
    }

    if let Some(relative) = &layout.asset_index {
        let bytes = fs::read(workspace.join(relative))?;
        match std::str::from_utf8(&bytes).map_err(anyhow::Error::from).and_then(parse_index_json) {
            Ok(_) => {
                write_atomic(&roots.index_path, &bytes)?;
                return Ok(AssetIndexSource::IndexFile);
            }
            Err(e) => tracing::warn!(error = %e, "archive asset index is unusable, ignoring it"),
        }
    }

    if let Some(entries) = html.as_deref().and_then(extract_assets_json) {
        let bytes = serde_json::to_vec_pretty(&entries).map_err(std::io::Error::from)?;
        write_atomic(&roots.index_path, &bytes)?;
        return Ok(AssetIndexSource::HtmlFallback);
    }

    remove_if_present(&roots.index_path)?;
    Ok(AssetIndexSource::Empty)
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale companion file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Renames within the filesystem, copying when the rename crosses devices
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}
