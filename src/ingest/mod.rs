//! Archive ingestion: validation, extraction, structure detection and splitting.
//!
//! [`IngestPipeline`] drives the stages in order and reports each transition to a
//! [`ProgressSink`]. The stage functions are public so hosts can run them individually
//! (e.g. validate an upload before accepting it).

pub mod extractor;
pub mod pipeline;
pub mod progress;
pub mod splitter;
pub mod structure;
pub mod validator;

pub use extractor::extract_archive;
pub use pipeline::{IngestPipeline, IngestReport};
pub use progress::{
    CancellationToken, ChannelProgress, NoopProgress, PipelineStage, ProgressEvent, ProgressSink,
};
pub use splitter::{SplitReport, conversation_file_name, split_conversations};
pub use structure::{ArchiveLayout, EntryKind, detect_structure, is_media_path};
pub use validator::{check_expansion, compression_ratio, has_zip_signature, validate_archive};
