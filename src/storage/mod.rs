//! On-disk storage for conversation-sets.
//!
//! [`StorageLayout`] maps a set id to its directories; [`ConversationStore`] reads the
//! per-conversation files written by the splitter.

pub mod layout;
pub mod store;

pub use layout::{NestedLayout, SetRoots, SharedMediaLayout, StorageLayout};
pub use store::{ConversationStore, write_atomic};
