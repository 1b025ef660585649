//! Asset-pointer resolution.
//!
//! Export tools append random suffixes to stored file names (`file-abc` is stored as
//! `file-abc-XYZ123.png`), so every lookup here is a file-name *prefix* match rather than an
//! exact one. Resolution tries, in order:
//!
//! 1. the asset index: the exact pointer maps to a file name, searched recursively under the
//!    media root (full name first, then its stem)
//! 2. pattern fallback: the normalized key with and without common image extensions, in the
//!    media root and the legacy image folder
//! 3. a recursive prefix search for the bare key
//!
//! Recursive searches go through the shared [`AssetSearchCache`].

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::cache::AssetSearchCache;
use super::pointer::AssetPointer;
use crate::ingest::structure::LEGACY_MEDIA_DIR;
use crate::models::{AssetIndex, AssetResolution};
use crate::utils::MAX_ENTRY_DEPTH;

const FALLBACK_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".webp", ".gif"];

/// Maximum directory depth searched below the media root
///
/// Matches the deepest entry the validator accepts, so relocated media is always in reach.
const MAX_SEARCH_DEPTH: usize = MAX_ENTRY_DEPTH;

#[derive(Debug, Clone, Copy)]
pub struct AssetResolver<'a> {
    cache: &'a AssetSearchCache,
}

impl<'a> AssetResolver<'a> {
    pub fn new(cache: &'a AssetSearchCache) -> Self {
        Self { cache }
    }

    /// Resolves one pointer string to a file under `media_root`
    ///
    /// Never fails; an unresolvable pointer yields [`AssetResolution::NotFound`].
    pub fn resolve(&self, pointer: &str, media_root: &Path, index: &AssetIndex) -> AssetResolution {
        let parsed = AssetPointer::parse(pointer);

        let found = self
            .from_index(pointer, media_root, index)
            .or_else(|| pattern_fallback(parsed.key(), media_root))
            .or_else(|| self.cached_prefix_search(media_root, parsed.key()));

        match found {
            Some(path) => {
                let relative = path.strip_prefix(media_root).unwrap_or(&path).to_path_buf();
                AssetResolution::Found { path, relative }
            }
            None => {
                tracing::debug!(pointer, "asset pointer not resolved");
                AssetResolution::NotFound
            }
        }
    }

    fn from_index(&self, pointer: &str, media_root: &Path, index: &AssetIndex) -> Option<PathBuf> {
        let filename = index.filename_for(pointer)?;
        // Index values name files, never directories
        let name = Path::new(filename).file_name()?.to_str()?;

        self.cached_prefix_search(media_root, name).or_else(|| {
            let stem = Path::new(name).file_stem()?.to_str()?;
            if stem == name { None } else { self.cached_prefix_search(media_root, stem) }
        })
    }

    fn cached_prefix_search(&self, root: &Path, prefix: &str) -> Option<PathBuf> {
        if prefix.is_empty() {
            return None;
        }
        self.cache.get_or_search(root, prefix, || find_by_prefix(root, prefix))
    }
}

/// First regular file under `root` (depth-first, sorted by name) whose name starts with `prefix`
///
/// Symlinks are neither followed nor returned.
pub fn find_by_prefix(root: &Path, prefix: &str) -> Option<PathBuf> {
    if prefix.is_empty() {
        return None;
    }

    WalkDir::new(root)
        .follow_links(false)
        .max_depth(MAX_SEARCH_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| entry.file_name().to_str().is_some_and(|name| name.starts_with(prefix)))
        .map(|entry| entry.into_path())
}

/// Shallow candidate search in the media root and the legacy image folder
fn pattern_fallback(key: &str, media_root: &Path) -> Option<PathBuf> {
    if key.is_empty() {
        return None;
    }

    let candidates: Vec<String> = std::iter::once(key.to_string())
        .chain(FALLBACK_EXTENSIONS.iter().map(|ext| format!("{}{}", key, ext)))
        .collect();
    let dirs = [media_root.to_path_buf(), media_root.join(LEGACY_MEDIA_DIR)];

    for candidate in &candidates {
        for dir in &dirs {
            let exact = dir.join(candidate);
            if is_regular_file(&exact) {
                return Some(exact);
            }
            if let Some(found) = shallow_prefix_match(dir, candidate) {
                return Some(found);
            }
        }
    }
    None
}

fn shallow_prefix_match(dir: &Path, prefix: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| entry.file_name().to_str().is_some_and(|name| name.starts_with(prefix)))
        .map(|entry| entry.path())
        .collect();
    matches.sort();
    matches.into_iter().next()
}

fn is_regular_file(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_file())
}
