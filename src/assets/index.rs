//! Asset index loading.
//!
//! The index maps exact asset-pointer strings to stored file names. It comes from one of
//! several [`IndexSource`]s tried in order: the set's `assets.json`, then the
//! `var assetsJson = {...}` assignment inside the companion HTML page. Any source failure is
//! logged and the next source is tried; when nothing works the index is empty and resolution
//! falls back to pattern matching.

use std::collections::HashMap;
use std::fmt::Debug;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::models::{AssetIndex, AssetIndexEntry, AssetIndexSource};
use crate::storage::SetRoots;
use crate::utils::safe_open_file;

/// Maximum size of an asset index file: 64MB
const MAX_INDEX_FILE_BYTES: u64 = 64 * 1024 * 1024;

/// Maximum size of the companion HTML page: 512MB
const MAX_HTML_BYTES: u64 = 512 * 1024 * 1024;

static ASSETS_JSON_ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var\s+assetsJson\s*=\s*").expect("valid assetsJson regex"));

/// One place an asset index can be loaded from
pub trait IndexSource: Send + Sync + Debug {
    /// Returns `Ok(None)` when the source does not exist for this set
    fn load(&self, roots: &SetRoots) -> Result<Option<AssetIndex>>;
}

/// The stored `assets.json` file
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexFileSource;

impl IndexSource for IndexFileSource {
    fn load(&self, roots: &SetRoots) -> Result<Option<AssetIndex>> {
        if !roots.index_path.exists() {
            return Ok(None);
        }
        let text = read_text(&roots.index_path, MAX_INDEX_FILE_BYTES)?;
        let entries = parse_index_json(&text)?;
        Ok(Some(AssetIndex::new(entries, AssetIndexSource::IndexFile)))
    }
}

/// The `assetsJson` assignment embedded in the companion HTML page
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlAssetsSource;

impl IndexSource for HtmlAssetsSource {
    fn load(&self, roots: &SetRoots) -> Result<Option<AssetIndex>> {
        let html_path = roots.companion_html_path();
        if !html_path.exists() {
            return Ok(None);
        }
        let html = read_text(&html_path, MAX_HTML_BYTES)?;
        Ok(extract_assets_json(&html)
            .map(|entries| AssetIndex::new(entries, AssetIndexSource::HtmlFallback)))
    }
}

/// Tries each source in order and returns the first index found
#[derive(Debug)]
pub struct AssetIndexLoader {
    sources: Vec<Box<dyn IndexSource>>,
}

impl AssetIndexLoader {
    pub fn new(sources: Vec<Box<dyn IndexSource>>) -> Self {
        Self { sources }
    }

    /// Never fails: unreadable sources are logged and skipped
    pub fn load(&self, roots: &SetRoots) -> AssetIndex {
        for source in &self.sources {
            match source.load(roots) {
                Ok(Some(index)) => {
                    tracing::debug!(
                        source = ?index.source(),
                        entries = index.len(),
                        "asset index loaded"
                    );
                    return index;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(?source, error = %e, "asset index source failed, trying next");
                }
            }
        }
        AssetIndex::empty()
    }
}

impl Default for AssetIndexLoader {
    fn default() -> Self {
        Self::new(vec![Box::new(IndexFileSource), Box::new(HtmlAssetsSource)])
    }
}

/// Parses a flat `{pointer: filename | {name: filename, ...}}` object
///
/// Values of any other shape are dropped individually.
pub fn parse_index_json(text: &str) -> Result<HashMap<String, AssetIndexEntry>> {
    let raw: HashMap<String, serde_json::Value> =
        serde_json::from_str(text).context("Asset index is not a JSON object")?;
    Ok(collect_entries(raw))
}

/// Recovers the asset index from a `var assetsJson = {...};` assignment
///
/// Only the object literal right after the assignment is parsed; trailing script is ignored.
pub fn extract_assets_json(html: &str) -> Option<HashMap<String, AssetIndexEntry>> {
    let assignment = ASSETS_JSON_ASSIGNMENT.find(html)?;
    let rest = &html[assignment.end()..];

    let mut stream = serde_json::Deserializer::from_str(rest)
        .into_iter::<HashMap<String, serde_json::Value>>();
    match stream.next()? {
        Ok(raw) => Some(collect_entries(raw)),
        Err(e) => {
            tracing::warn!(error = %e, "assetsJson assignment is not a JSON object");
            None
        }
    }
}

fn collect_entries(raw: HashMap<String, serde_json::Value>) -> HashMap<String, AssetIndexEntry> {
    raw.into_iter()
        .filter_map(|(pointer, value)| match serde_json::from_value::<AssetIndexEntry>(value) {
            Ok(entry) => Some((pointer, entry)),
            Err(_) => {
                tracing::debug!(pointer = %pointer, "ignoring asset index entry without a name");
                None
            }
        })
        .collect()
}

fn read_text(path: &Path, max_bytes: u64) -> Result<String> {
    let mut file = safe_open_file(path, max_bytes)?;
    let mut text = String::new();
    file.read_to_string(&mut text)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::storage::{NestedLayout, StorageLayout};

    fn roots(dir: &Path) -> SetRoots {
        let roots = NestedLayout::new(dir).roots("set");
        fs::create_dir_all(&roots.media_root).unwrap();
        roots
    }

    #[test]
    fn test_parse_index_json_mixed_shapes() {
        let entries = parse_index_json(
            r#"{"file-service://a": "a.png", "sediment://b": {"name": "b.wav"}, "bad": 12}"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["sediment://b"].filename(), "b.wav");
    }

    #[test]
    fn test_extract_assets_json_from_script() {
        let html = r#"<html><script>
            var conversations = [];
            var assetsJson = {"file-service://file-abc": "file-abc.png"}; var other = {"x": 1};
        </script></html>"#;

        let entries = extract_assets_json(html).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["file-service://file-abc"].filename(), "file-abc.png");
    }

    #[test]
    fn test_extract_assets_json_missing_or_broken() {
        assert!(extract_assets_json("<html>no assets</html>").is_none());
        assert!(extract_assets_json("var assetsJson = [1, 2];").is_none());
    }

    #[test]
    fn test_loader_prefers_index_file() {
        let dir = TempDir::new().unwrap();
        let roots = roots(dir.path());
        fs::write(&roots.index_path, r#"{"p": "from-index.png"}"#).unwrap();
        fs::write(roots.companion_html_path(), r#"var assetsJson = {"p": "from-html.png"};"#).unwrap();

        let index = AssetIndexLoader::default().load(&roots);
        assert_eq!(index.source(), AssetIndexSource::IndexFile);
        assert_eq!(index.filename_for("p"), Some("from-index.png"));
    }

    #[test]
    fn test_loader_falls_back_to_html_when_index_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let roots = roots(dir.path());
        fs::write(&roots.index_path, "not json").unwrap();
        fs::write(roots.companion_html_path(), r#"var assetsJson = {"p": "from-html.png"};"#).unwrap();

        let index = AssetIndexLoader::default().load(&roots);
        assert_eq!(index.source(), AssetIndexSource::HtmlFallback);
        assert_eq!(index.filename_for("p"), Some("from-html.png"));
    }

    #[test]
    fn test_loader_returns_empty_index() {
        let dir = TempDir::new().unwrap();
        let index = AssetIndexLoader::default().load(&roots(dir.path()));
        assert!(index.is_empty());
        assert_eq!(index.source(), AssetIndexSource::Empty);
    }
}
