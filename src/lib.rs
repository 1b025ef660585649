//! chatvault - secure ingestion and browsing of chat-export archives
//!
//! This library turns a chat-export zip archive into a stored conversation-set and serves
//! it back. It supports:
//!
//! - Validating untrusted archives (size, signature, zip-bomb ratio, entry paths) before
//!   anything is extracted
//! - Locating the conversation document and media in any archive layout, including nested
//!   wrapper directories
//! - Splitting the conversation document into one file per conversation
//! - Resolving asset pointers to stored media files, with a bounded search cache
//! - Rendering conversations to sanitized HTML and searching them
//!
//! # Example
//!
//! ```no_run
//! use chatvault::{ConversationLibrary, LibraryConfig, NoopProgress, SearchOptions};
//!
//! let library = ConversationLibrary::new(LibraryConfig::new("/srv/chatvault"));
//! let bytes = std::fs::read("export.zip")?;
//! let report = library.ingest_archive(&bytes, "my export", &NoopProgress)?;
//!
//! for result in library.search_conversations(&report.set_id, "rust", &SearchOptions::default())? {
//!     println!("{}", result.summary.title);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod assets;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod library;
pub mod models;
pub mod render;
pub mod search;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use config::{CollisionPolicy, IngestLimits, LibraryConfig};
pub use error::{IngestError, LibraryError, StructureError, ValidationError};
pub use ingest::{CancellationToken, ChannelProgress, NoopProgress, PipelineStage, ProgressEvent, ProgressSink};
pub use library::ConversationLibrary;
pub use models::{AssetResolution, ConversationSummary, SearchOptions, SearchResult, SearchScope, Transcript};
pub use storage::{NestedLayout, SharedMediaLayout, StorageLayout};
