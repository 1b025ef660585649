//! Conversation search.
//!
//! Conversations are first reduced to [`SearchableConversation`]s (title plus the plain text
//! of each displayable message) and then scored in parallel.
//!
//! # Scoring
//!
//! - title: 10 per hit
//! - message: 2 per hit, +3 when the whole message equals the query, +1 when the user wrote it
//!
//! Matching is case-insensitive substring counting.

pub mod scoring;

pub use scoring::{
    CONTENT_HIT_SCORE, EXACT_MESSAGE_BONUS, SNIPPET_CONTEXT_CHARS, SearchableConversation,
    SearchableMessage, TITLE_HIT_SCORE, USER_AUTHOR_BONUS, score_conversation, search,
    snippet_around,
};
