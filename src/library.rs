//! The conversation library: entry points for hosts.
//!
//! A [`ConversationLibrary`] owns the storage layout, the shared asset-search cache and a
//! per-set memo of loaded asset indexes. It is `Send + Sync`; share it behind an `Arc`.
//!
//! Reads and ingestion of *different* sets may run concurrently. Reading a set while it is
//! being re-ingested must be serialized by the caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::assets::{AssetIndexLoader, AssetResolver, AssetSearchCache};
use crate::config::LibraryConfig;
use crate::error::{IngestResult, LibraryError, LibraryResult};
use crate::ingest::{CancellationToken, IngestPipeline, IngestReport, ProgressSink};
use crate::models::{AssetIndex, AssetResolution, ConversationSummary, SearchOptions, SearchResult, Transcript};
use crate::render::{DEFAULT_MEDIA_URL_PREFIX, RenderContext, build_transcript};
use crate::search::{SearchableConversation, search};
use crate::storage::{ConversationStore, NestedLayout, SetRoots, StorageLayout};
use crate::utils::set_id_from_name;

pub struct ConversationLibrary {
    config: LibraryConfig,
    layout: Box<dyn StorageLayout>,
    cache: AssetSearchCache,
    loader: AssetIndexLoader,
    indexes: Mutex<HashMap<String, Arc<AssetIndex>>>,
    media_url_prefix: String,
}

impl ConversationLibrary {
    /// Library using the default nested layout under `config.storage_root`
    pub fn new(config: LibraryConfig) -> Self {
        let layout = Box::new(NestedLayout::new(config.storage_root.clone()));
        Self::with_layout(config, layout)
    }

    pub fn with_layout(config: LibraryConfig, layout: Box<dyn StorageLayout>) -> Self {
        Self {
            cache: AssetSearchCache::new(config.cache_capacity),
            config,
            layout,
            loader: AssetIndexLoader::default(),
            indexes: Mutex::new(HashMap::new()),
            media_url_prefix: DEFAULT_MEDIA_URL_PREFIX.to_string(),
        }
    }

    /// Prefix for media `src` URLs; the set id is appended, then the media path
    pub fn with_media_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.media_url_prefix = prefix.into();
        self
    }

    pub fn with_index_loader(mut self, loader: AssetIndexLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn layout(&self) -> &dyn StorageLayout {
        self.layout.as_ref()
    }

    pub fn cache(&self) -> &AssetSearchCache {
        &self.cache
    }

    /// Ingests an archive as conversation-set `set_name`
    ///
    /// On success the set's memoized asset index and cached asset searches are dropped so the
    /// next read sees the new content.
    pub fn ingest_archive(
        &self,
        bytes: &[u8],
        set_name: &str,
        sink: &dyn ProgressSink,
    ) -> IngestResult<IngestReport> {
        self.run_ingest(bytes, set_name, sink, None)
    }

    pub fn ingest_archive_with_cancel(
        &self,
        bytes: &[u8],
        set_name: &str,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> IngestResult<IngestReport> {
        self.run_ingest(bytes, set_name, sink, Some(cancel))
    }

    fn run_ingest(
        &self,
        bytes: &[u8],
        set_name: &str,
        sink: &dyn ProgressSink,
        cancel: Option<&CancellationToken>,
    ) -> IngestResult<IngestReport> {
        let mut pipeline = IngestPipeline::new(
            self.layout.as_ref(),
            &self.config.limits,
            self.config.collision_policy,
            sink,
        );
        if let Some(token) = cancel {
            pipeline = pipeline.with_cancellation(token);
        }

        let report = pipeline.run(bytes, None, set_name)?;
        self.invalidate_set(&report.set_id);
        Ok(report)
    }

    /// Ids of all committed sets
    pub fn list_sets(&self) -> LibraryResult<Vec<String>> {
        Ok(self.layout.list_sets()?)
    }

    /// Summaries of every conversation in a set, most recently active first
    pub fn list_conversations(&self, set_id: &str) -> LibraryResult<Vec<ConversationSummary>> {
        let roots = self.set_roots(set_id)?;
        ConversationStore::new(&roots.set_root).summaries()
    }

    /// Renders one conversation
    pub fn get_conversation(&self, set_id: &str, conversation_id: &str) -> LibraryResult<Transcript> {
        let roots = self.set_roots(set_id)?;
        let (_, record) = ConversationStore::new(&roots.set_root)
            .find(conversation_id)?
            .ok_or_else(|| LibraryError::ConversationNotFound(conversation_id.to_string()))?;

        let index = self.asset_index(set_id)?;
        let prefix = format!("{}/{}", self.media_url_prefix.trim_end_matches('/'), set_id);
        let ctx = RenderContext {
            resolver: AssetResolver::new(&self.cache),
            media_root: &roots.media_root,
            index: &index,
            media_url_prefix: &prefix,
        };

        Ok(build_transcript(&record, &ctx))
    }

    /// Searches a set; see [`crate::search::search`] for ordering rules
    pub fn search_conversations(
        &self,
        set_id: &str,
        query: &str,
        options: &SearchOptions,
    ) -> LibraryResult<Vec<SearchResult>> {
        let roots = self.set_roots(set_id)?;
        let conversations: Vec<SearchableConversation> = ConversationStore::new(&roots.set_root)
            .load_all()?
            .iter()
            .map(|(name, record)| SearchableConversation::from_record(record, name))
            .collect();

        Ok(search(&conversations, query, options))
    }

    /// Asset index of a set, loaded once and memoized
    pub fn asset_index(&self, set_id: &str) -> LibraryResult<Arc<AssetIndex>> {
        if let Some(index) = self.lock_indexes().get(set_id) {
            return Ok(Arc::clone(index));
        }

        let roots = self.set_roots(set_id)?;
        let index = Arc::new(self.loader.load(&roots));
        self.lock_indexes().insert(set_id.to_string(), Arc::clone(&index));
        Ok(index)
    }

    /// Resolves one asset pointer within a set
    pub fn resolve_asset(&self, set_id: &str, pointer: &str) -> LibraryResult<AssetResolution> {
        let roots = self.set_roots(set_id)?;
        let index = self.asset_index(set_id)?;
        Ok(AssetResolver::new(&self.cache).resolve(pointer, &roots.media_root, &index))
    }

    fn invalidate_set(&self, set_id: &str) {
        self.lock_indexes().remove(set_id);
        let roots = self.layout.roots(set_id);
        self.cache.invalidate_root(&roots.media_root);
        tracing::debug!(set_id, "set caches invalidated");
    }

    fn lock_indexes(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AssetIndex>>> {
        self.indexes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Storage roots of an existing set
    ///
    /// Ids that are not already in canonical set-id form are rejected, so a caller-supplied id
    /// can never name a path outside the storage root.
    fn set_roots(&self, set_id: &str) -> LibraryResult<SetRoots> {
        if set_id_from_name(set_id).as_deref() != Some(set_id) {
            return Err(LibraryError::SetNotFound(set_id.to_string()));
        }
        let roots = self.layout.roots(set_id);
        if !roots.set_root.is_dir() {
            return Err(LibraryError::SetNotFound(set_id.to_string()));
        }
        Ok(roots)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_unknown_and_malformed_set_ids() {
        let dir = TempDir::new().unwrap();
        let library = ConversationLibrary::new(LibraryConfig::new(dir.path()));

        assert!(matches!(library.list_conversations("missing"), Err(LibraryError::SetNotFound(_))));
        assert!(matches!(library.list_conversations("../etc"), Err(LibraryError::SetNotFound(_))));
        assert!(matches!(library.list_conversations("Upper"), Err(LibraryError::SetNotFound(_))));
        assert!(library.list_sets().unwrap().is_empty());
    }

    #[test]
    fn test_asset_index_is_memoized() {
        let dir = TempDir::new().unwrap();
        let library = ConversationLibrary::new(LibraryConfig::new(dir.path()));
        let roots = library.layout().roots("s");
        std::fs::create_dir_all(&roots.media_root).unwrap();
        std::fs::write(&roots.index_path, r#"{"p": "a.png"}"#).unwrap();

        let first = library.asset_index("s").unwrap();
        std::fs::write(&roots.index_path, r#"{"p": "b.png"}"#).unwrap();
        let second = library.asset_index("s").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.filename_for("p"), Some("a.png"));

        library.invalidate_set("s");
        assert_eq!(library.asset_index("s").unwrap().filename_for("p"), Some("b.png"));
    }
}
