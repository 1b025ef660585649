//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;

use chatvault::{ConversationLibrary, LibraryConfig};
use serde_json::{Value, json};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builder for in-memory chat-export zip archives
pub struct ExportArchiveBuilder {
    files: Vec<(String, Vec<u8>)>,
    method: CompressionMethod,
}

impl ExportArchiveBuilder {
    /// Create a builder for an empty archive using deflate compression
    pub fn new() -> Self {
        Self { files: Vec::new(), method: CompressionMethod::Deflated }
    }

    /// Store entries without compression
    pub fn stored(mut self) -> Self {
        self.method = CompressionMethod::Stored;
        self
    }

    /// Add an entry with raw bytes
    pub fn with_file(mut self, name: &str, data: &[u8]) -> Self {
        self.files.push((name.to_string(), data.to_vec()));
        self
    }

    /// Add a conversations.json entry built from the given conversations
    pub fn with_conversations(self, name: &str, conversations: &[ConversationBuilder]) -> Self {
        let document = conversation_document(conversations);
        self.with_file(name, &document)
    }

    /// Add a companion HTML page that embeds an asset index
    pub fn with_html_index(self, name: &str, index: &Value) -> Self {
        let html = format!(
            "<html><head><script>var jsonData = [];\nvar assetsJson = {};\n</script></head></html>",
            index
        );
        self.with_file(name, html.as_bytes())
    }

    /// Build the zip archive bytes
    pub fn build(self) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            let options = SimpleFileOptions::default().compression_method(self.method);
            for (name, data) in &self.files {
                writer.start_file(name.as_str(), options).expect("Failed to start zip entry");
                writer.write_all(data).expect("Failed to write zip entry");
            }
            writer.finish().expect("Failed to finish zip");
        }
        cursor.into_inner()
    }

    /// Build and write the archive to `path`
    pub fn write_to(self, path: &Path) {
        std::fs::write(path, self.build()).expect("Failed to write archive");
    }
}

impl Default for ExportArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one conversation record with a linear message chain
pub struct ConversationBuilder {
    id: String,
    title: Option<String>,
    create_time: Option<f64>,
    update_time: Option<f64>,
    messages: Vec<Value>,
}

impl ConversationBuilder {
    /// Create a conversation with default times
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: Some(title.to_string()),
            create_time: Some(1_700_000_000.0),
            update_time: Some(1_700_000_000.0),
            messages: Vec::new(),
        }
    }

    pub fn untitled(mut self) -> Self {
        self.title = None;
        self
    }

    pub fn created(mut self, secs: f64) -> Self {
        self.create_time = Some(secs);
        self
    }

    pub fn updated(mut self, secs: f64) -> Self {
        self.update_time = Some(secs);
        self
    }

    /// Remove both timestamps
    pub fn without_times(mut self) -> Self {
        self.create_time = None;
        self.update_time = None;
        self
    }

    /// Append a plain text message
    pub fn with_message(self, role: &str, text: &str) -> Self {
        self.with_content(role, json!({"content_type": "text", "parts": [text]}))
    }

    /// Append an image pointer message
    pub fn with_image(self, role: &str, pointer: &str) -> Self {
        self.with_content(
            role,
            json!({
                "content_type": "multimodal_text",
                "parts": [{"content_type": "image_asset_pointer", "asset_pointer": pointer}]
            }),
        )
    }

    /// Append a message with arbitrary content
    pub fn with_content(mut self, role: &str, content: Value) -> Self {
        let time = self.create_time.unwrap_or(0.0) + self.messages.len() as f64 + 1.0;
        self.messages.push(json!({
            "id": format!("msg-{}", self.messages.len()),
            "author": {"role": role, "name": null, "metadata": {}},
            "create_time": time,
            "content": content,
            "metadata": {}
        }));
        self
    }

    /// Convert to export JSON with a `root` node and one node per message
    pub fn to_json(&self) -> Value {
        let mut mapping = serde_json::Map::new();
        let node_ids: Vec<String> = (0..self.messages.len()).map(|i| format!("node-{}", i)).collect();

        let root_children: Vec<&String> = node_ids.first().into_iter().collect();
        mapping.insert(
            "root".to_string(),
            json!({"id": "root", "message": null, "parent": null, "children": root_children}),
        );
        for (i, message) in self.messages.iter().enumerate() {
            let parent = if i == 0 { "root".to_string() } else { node_ids[i - 1].clone() };
            let children: Vec<&String> = node_ids.get(i + 1).into_iter().collect();
            mapping.insert(
                node_ids[i].clone(),
                json!({"id": node_ids[i], "message": message, "parent": parent, "children": children}),
            );
        }

        json!({
            "id": self.id,
            "conversation_id": self.id,
            "title": self.title,
            "create_time": self.create_time,
            "update_time": self.update_time,
            "mapping": mapping,
            "current_node": node_ids.last().cloned().unwrap_or_else(|| "root".to_string())
        })
    }
}

/// Serialize conversations as a conversations.json document
pub fn conversation_document(conversations: &[ConversationBuilder]) -> Vec<u8> {
    let values: Vec<Value> = conversations.iter().map(ConversationBuilder::to_json).collect();
    serde_json::to_vec(&values).expect("Failed to serialize conversations")
}

/// Open a library rooted at `root` with default settings
pub fn library_at(root: &Path) -> ConversationLibrary {
    ConversationLibrary::new(LibraryConfig::new(root))
}

/// Names of all regular files below `dir`, relative and sorted
pub fn files_under(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(dir).ok().map(|p| p.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}
