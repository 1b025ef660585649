//! Conversation rendering: message-graph traversal, sanitized markdown and media parts.
//!
//! Rendering never fails. Malformed graphs, empty content and unresolved assets degrade to
//! shorter transcripts or placeholder blocks.

pub mod content;
pub mod markdown;
pub mod transcript;

pub use content::{MediaKind, RenderContext, RenderedBody, content_text, render_content};
pub use markdown::{escape_html, is_safe_url, render_markdown};
pub use transcript::{
    ASSISTANT_LABEL, MessageView, author_label, build_transcript, ordered_messages, walk_nodes,
};

/// Default URL prefix for media elements; hosts serve the media root under it
pub const DEFAULT_MEDIA_URL_PREFIX: &str = "/media";
