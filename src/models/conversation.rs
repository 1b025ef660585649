use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::deserializers::{
    deserialize_epoch_seconds, deserialize_lenient_id, deserialize_null_as_default,
};
use crate::utils::dates::epoch_to_datetime;

/// One conversation from the export's conversation document
///
/// The message graph is an arena: `mapping` owns every node and edges are node ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationRecord {
    #[serde(default, deserialize_with = "deserialize_lenient_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_epoch_seconds")]
    pub create_time: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_epoch_seconds")]
    pub update_time: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub mapping: HashMap<String, MessageNode>,
    #[serde(default)]
    pub current_node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ConversationRecord {
    /// Stable identifier: `id`, falling back to `conversation_id`
    pub fn conversation_id(&self) -> &str {
        if !self.id.is_empty() {
            return &self.id;
        }
        self.conversation_id.as_deref().unwrap_or_default()
    }

    /// Timestamp used for filing and recency: update time, then create time, then zero
    pub fn recency(&self) -> f64 {
        self.update_time.or(self.create_time).unwrap_or(0.0)
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().filter(|t| !t.trim().is_empty()).unwrap_or("Untitled")
    }
}

/// The fields needed to file a record, without its message graph
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationHeader {
    #[serde(default, deserialize_with = "deserialize_lenient_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_epoch_seconds")]
    pub create_time: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_epoch_seconds")]
    pub update_time: Option<f64>,
}

impl ConversationHeader {
    pub fn recency(&self) -> f64 {
        self.update_time.or(self.create_time).unwrap_or(0.0)
    }
}

/// A node in the message graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageNode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<MessageRecord>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub children: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_epoch_seconds")]
    pub create_time: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub author: Author,
    #[serde(default, deserialize_with = "deserialize_epoch_seconds")]
    pub create_time: Option<f64>,
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub recipient: Option<String>,
}

impl MessageRecord {
    /// System messages the user wrote themselves (custom instructions)
    pub fn is_user_system_message(&self) -> bool {
        self.metadata.get("is_user_system_message").and_then(Value::as_bool).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub role: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

/// Message body; `parts` holds strings and typed objects (asset pointers, transcriptions)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub content_type: String,
    #[serde(default)]
    pub parts: Option<Vec<Value>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Lightweight listing entry for a stored conversation file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    pub file_name: String,
    pub message_count: usize,
}

impl ConversationSummary {
    pub fn from_record(record: &ConversationRecord, file_name: &str) -> Self {
        Self {
            id: record.conversation_id().to_string(),
            title: record.display_title().to_string(),
            create_time: record.create_time.and_then(epoch_to_datetime),
            update_time: record.update_time.and_then(epoch_to_datetime),
            file_name: file_name.to_string(),
            message_count: record.mapping.values().filter(|n| n.message.is_some()).count(),
        }
    }

    /// Most recent known timestamp, for recency ordering
    pub fn recency(&self) -> Option<DateTime<Utc>> {
        self.update_time.or(self.create_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_parses_minimal_export_shape() {
        let json = r#"{
            "id": "conv-1",
            "title": "Trip plan",
            "create_time": 1700000000.25,
            "update_time": null,
            "mapping": {
                "root": {"id": "root", "message": null, "parent": null, "children": ["m1"]},
                "m1": {
                    "id": "m1",
                    "parent": "root",
                    "children": [],
                    "message": {
                        "id": "m1",
                        "author": {"role": "user"},
                        "create_time": 1700000001,
                        "content": {"content_type": "text", "parts": ["Hello"]},
                        "metadata": {}
                    }
                }
            }
        }"#;

        let record: ConversationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.conversation_id(), "conv-1");
        assert_eq!(record.mapping.len(), 2);
        assert_eq!(record.recency(), 1700000000.25);
        let m1 = record.mapping["m1"].message.as_ref().unwrap();
        assert_eq!(m1.author.role, "user");
        assert!(!m1.is_user_system_message());
    }

    #[test]
    fn test_record_falls_back_to_conversation_id() {
        let record: ConversationRecord =
            serde_json::from_str(r#"{"conversation_id": "abc", "mapping": {}}"#).unwrap();
        assert_eq!(record.conversation_id(), "abc");
        assert_eq!(record.recency(), 0.0);
        assert_eq!(record.display_title(), "Untitled");
    }

    #[test]
    fn test_record_tolerates_null_graph_fields() {
        let record: ConversationRecord = serde_json::from_str(
            r#"{"id": "n", "mapping": {
                "a": {"children": null, "message": {"author": null,
                    "content": {"content_type": null, "parts": ["hi"]}}}
            }}"#,
        )
        .unwrap();
        let node = &record.mapping["a"];
        assert!(node.children.is_empty());
        let message = node.message.as_ref().unwrap();
        assert_eq!(message.author.role, "");
        assert_eq!(message.content.as_ref().unwrap().content_type, "");

        let record: ConversationRecord = serde_json::from_str(r#"{"id": "m", "mapping": null}"#).unwrap();
        assert!(record.mapping.is_empty());
    }

    #[test]
    fn test_user_system_message_flag() {
        let message: MessageRecord = serde_json::from_str(
            r#"{"author": {"role": "system"}, "metadata": {"is_user_system_message": true}}"#,
        )
        .unwrap();
        assert!(message.is_user_system_message());
    }

    #[test]
    fn test_summary_counts_only_nodes_with_messages() {
        let mut record = ConversationRecord { id: "c".into(), ..Default::default() };
        record.mapping.insert("a".into(), MessageNode::default());
        record.mapping.insert(
            "b".into(),
            MessageNode { message: Some(MessageRecord::default()), ..Default::default() },
        );

        let summary = ConversationSummary::from_record(&record, "1970.01.01_untitled.json");
        assert_eq!(summary.message_count, 1);
        assert_eq!(summary.title, "Untitled");
        assert!(summary.recency().is_none());
    }
}
