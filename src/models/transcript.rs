use serde::{Deserialize, Serialize};

/// A rendered message, ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub node_id: String,
    pub role: String,
    pub author_label: String,
    pub create_time: Option<f64>,
    /// Sanitized HTML body
    pub html: String,
    /// Plain text of the textual parts, used for search
    pub text: String,
}

/// Ordered, sanitized view of one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub title: String,
    pub create_time: Option<f64>,
    pub update_time: Option<f64>,
    pub messages: Vec<RenderedMessage>,
}
