use std::collections::HashSet;

use super::content::{RenderContext, render_content};
use crate::models::{
    Author, ConversationRecord, MessageNode, MessageRecord, RenderedMessage, Transcript,
};

pub const ASSISTANT_LABEL: &str = "ChatGPT";

/// Display name for a message author
pub fn author_label(author: &Author) -> String {
    match author.role.as_str() {
        "user" => "You".to_string(),
        "assistant" => ASSISTANT_LABEL.to_string(),
        "system" => "System".to_string(),
        "tool" => author
            .name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Tool")
            .to_string(),
        other if other.is_empty() => "Unknown".to_string(),
        other => other.to_string(),
    }
}

/// A graph node that carries a displayable message
#[derive(Debug, Clone, Copy)]
pub struct MessageView<'a> {
    pub node_id: &'a str,
    pub node: &'a MessageNode,
    pub message: &'a MessageRecord,
}

impl MessageView<'_> {
    /// Sort key: message create time, then node create time, then zero
    pub fn timestamp(&self) -> f64 {
        self.message.create_time.or(self.node.create_time).unwrap_or(0.0)
    }
}

/// Node ids in depth-first order from every parentless node
///
/// Roots are nodes without a parent or whose parent is missing from the mapping; they are
/// visited in id order. Each node is visited once, so cycles terminate. A graph where every
/// node has a parent inside the mapping yields nothing.
pub fn walk_nodes(record: &ConversationRecord) -> Vec<&str> {
    let mut roots: Vec<&str> = record
        .mapping
        .iter()
        .filter(|(_, node)| match node.parent.as_deref() {
            None => true,
            Some(parent) => !record.mapping.contains_key(parent),
        })
        .map(|(id, _)| id.as_str())
        .collect();
    roots.sort_unstable();

    let mut visited: HashSet<&str> = HashSet::with_capacity(record.mapping.len());
    let mut order = Vec::with_capacity(record.mapping.len());

    for root in roots {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some((key, node)) = record.mapping.get_key_value(id) else {
                continue;
            };
            order.push(key.as_str());
            // Reverse so the first child is visited first
            for child in node.children.iter().rev() {
                if !visited.contains(child.as_str()) {
                    stack.push(child.as_str());
                }
            }
        }
    }

    order
}

/// Displayable messages in transcript order
///
/// System messages are left out unless flagged as written by the user. The result is stably
/// sorted by [`MessageView::timestamp`].
pub fn ordered_messages(record: &ConversationRecord) -> Vec<MessageView<'_>> {
    let mut views: Vec<MessageView<'_>> = walk_nodes(record)
        .into_iter()
        .filter_map(|node_id| {
            let node = record.mapping.get(node_id)?;
            let message = node.message.as_ref()?;
            message.content.as_ref()?;
            if message.author.role == "system" && !message.is_user_system_message() {
                return None;
            }
            Some(MessageView { node_id, node, message })
        })
        .collect();

    views.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));
    views
}

/// Builds the sanitized transcript of a conversation
///
/// Messages whose body renders to nothing (e.g. content without parts) are dropped.
pub fn build_transcript(record: &ConversationRecord, ctx: &RenderContext<'_>) -> Transcript {
    let messages = ordered_messages(record)
        .into_iter()
        .filter_map(|view| {
            let content = view.message.content.as_ref()?;
            let body = render_content(content, ctx);
            if body.is_empty() {
                return None;
            }
            Some(RenderedMessage {
                node_id: view.node_id.to_string(),
                role: view.message.author.role.clone(),
                author_label: author_label(&view.message.author),
                create_time: view.message.create_time.or(view.node.create_time),
                html: body.html,
                text: body.text,
            })
        })
        .collect();

    Transcript {
        id: record.conversation_id().to_string(),
        title: record.display_title().to_string(),
        create_time: record.create_time,
        update_time: record.update_time,
        messages,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use super::*;
    use crate::assets::{AssetResolver, AssetSearchCache};
    use crate::models::AssetIndex;

    fn record(value: serde_json::Value) -> ConversationRecord {
        serde_json::from_value(value).unwrap()
    }

    fn message(role: &str, text: &str, time: f64) -> serde_json::Value {
        json!({
            "author": {"role": role},
            "create_time": time,
            "content": {"content_type": "text", "parts": [text]},
            "metadata": {}
        })
    }

    fn transcript(record: &ConversationRecord) -> Transcript {
        let cache = AssetSearchCache::new(4);
        let index = AssetIndex::empty();
        let ctx = RenderContext {
            resolver: AssetResolver::new(&cache),
            media_root: Path::new("/nonexistent-media-root"),
            index: &index,
            media_url_prefix: "/media",
        };
        build_transcript(record, &ctx)
    }

    #[test]
    fn test_author_labels() {
        let tool = Author { role: "tool".into(), name: Some("browser".into()), ..Default::default() };
        assert_eq!(author_label(&tool), "browser");
        let unnamed = Author { role: "tool".into(), ..Default::default() };
        assert_eq!(author_label(&unnamed), "Tool");
        let assistant = Author { role: "assistant".into(), ..Default::default() };
        assert_eq!(author_label(&assistant), "ChatGPT");
    }

    #[test]
    fn test_transcript_orders_by_time_and_hides_system() {
        let rec = record(json!({
            "id": "c",
            "title": "T",
            "mapping": {
                "root": {"parent": null, "children": ["sys"]},
                "sys": {"parent": "root", "children": ["u"], "message": message("system", "hidden", 0.5)},
                "u": {"parent": "sys", "children": ["a"], "message": message("user", "question", 2.0)},
                "a": {"parent": "u", "children": [], "message": message("assistant", "answer", 1.0)}
            }
        }));

        let t = transcript(&rec);
        let texts: Vec<&str> = t.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["answer", "question"]);
        assert_eq!(t.messages[1].author_label, "You");
    }

    #[test]
    fn test_user_system_message_is_kept() {
        let mut sys = message("system", "custom instructions", 1.0);
        sys["metadata"] = json!({"is_user_system_message": true});
        let rec = record(json!({
            "mapping": {"s": {"parent": null, "children": [], "message": sys}}
        }));

        assert_eq!(transcript(&rec).messages.len(), 1);
    }

    #[test]
    fn test_cycle_terminates() {
        let rec = record(json!({
            "mapping": {
                "root": {"parent": null, "children": ["a"]},
                "a": {"parent": "root", "children": ["b"], "message": message("user", "one", 1.0)},
                "b": {"parent": "a", "children": ["a"], "message": message("assistant", "two", 2.0)}
            }
        }));

        assert_eq!(walk_nodes(&rec), vec!["root", "a", "b"]);
        assert_eq!(transcript(&rec).messages.len(), 2);
    }

    #[test]
    fn test_no_parentless_node_yields_empty_transcript() {
        let rec = record(json!({
            "mapping": {
                "a": {"parent": "b", "children": ["b"], "message": message("user", "one", 1.0)},
                "b": {"parent": "a", "children": ["a"], "message": message("assistant", "two", 2.0)}
            }
        }));

        assert!(transcript(&rec).messages.is_empty());
    }

    #[test]
    fn test_content_without_parts_is_dropped() {
        let rec = record(json!({
            "mapping": {
                "a": {"parent": null, "children": [], "message": {
                    "author": {"role": "user"},
                    "content": {"content_type": "text"}
                }}
            }
        }));

        assert!(transcript(&rec).messages.is_empty());
    }

    #[test]
    fn test_node_time_is_fallback_sort_key() {
        let mut late = message("user", "late", 0.0);
        late["create_time"] = serde_json::Value::Null;
        let rec = record(json!({
            "mapping": {
                "r": {"parent": null, "children": ["x", "y"]},
                "x": {"parent": "r", "children": [], "create_time": 5.0, "message": late},
                "y": {"parent": "r", "children": [], "message": message("assistant", "early", 1.0)}
            }
        }));

        let texts: Vec<String> = transcript(&rec).messages.into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["early", "late"]);
    }
}
