//! Data models for chat-export archives and conversation-sets.
//!
//! This module defines the data structures used throughout the crate:
//!
//! - [`ExtractedEntry`] / [`ArchiveListing`] - validated archive contents
//! - [`ConversationRecord`] - one conversation with its message graph (an id-keyed arena)
//! - [`AssetIndex`] - asset-pointer to filename mapping for a conversation-set
//! - [`Transcript`] - ordered, sanitized rendering of a conversation
//! - [`SearchResult`] - ranked search output
//!
//! Conversation records use serde with lenient deserializers (see [`deserializers`]) because
//! export files vary in how they encode timestamps and ids.

pub mod archive;
pub mod asset;
pub mod conversation;
pub mod deserializers;
pub mod search;
pub mod transcript;

pub use archive::{ArchiveListing, ExtractedEntry};
pub use asset::{AssetIndex, AssetIndexEntry, AssetIndexSource, AssetResolution};
pub use conversation::{
    Author, ConversationHeader, ConversationRecord, ConversationSummary, MessageContent,
    MessageNode, MessageRecord,
};
pub use search::{MatchLocation, SearchMatch, SearchOptions, SearchResult, SearchScope};
pub use transcript::{RenderedMessage, Transcript};
