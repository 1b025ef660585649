use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::ingest::structure::{ASSET_INDEX_FILE, COMPANION_HTML};

const SETS_DIR: &str = "sets";
const MEDIA_DIR: &str = "media";
const STAGING_DIR: &str = ".staging";

/// Storage locations for one conversation-set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetRoots {
    /// Directory holding the per-conversation files
    pub set_root: PathBuf,
    /// Directory media files are relocated into
    pub media_root: PathBuf,
    /// Where the asset index file is stored
    pub index_path: PathBuf,
}

impl SetRoots {
    /// Where the companion HTML page is stored
    pub fn companion_html_path(&self) -> PathBuf {
        self.set_root.join(COMPANION_HTML)
    }
}

/// Maps conversation-set ids to storage locations
///
/// Implementations decide the directory layout; the pipeline and the library only talk to
/// this trait.
pub trait StorageLayout: Send + Sync + Debug {
    fn roots(&self, set_id: &str) -> SetRoots;

    /// Ids of all stored sets, sorted
    fn list_sets(&self) -> io::Result<Vec<String>>;

    /// Parent directory for temporary extraction workspaces
    fn staging_dir(&self) -> PathBuf;
}

/// `{root}/sets/{id}/` with `media/` and `assets.json` inside each set
#[derive(Debug, Clone)]
pub struct NestedLayout {
    root: PathBuf,
}

impl NestedLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StorageLayout for NestedLayout {
    fn roots(&self, set_id: &str) -> SetRoots {
        let set_root = self.root.join(SETS_DIR).join(set_id);
        SetRoots {
            media_root: set_root.join(MEDIA_DIR),
            index_path: set_root.join(ASSET_INDEX_FILE),
            set_root,
        }
    }

    fn list_sets(&self) -> io::Result<Vec<String>> {
        list_subdirectories(&self.root.join(SETS_DIR))
    }

    fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }
}

/// Sets under `{root}/sets/{id}/`, media pooled under `{root}/media/{id}/`
#[derive(Debug, Clone)]
pub struct SharedMediaLayout {
    root: PathBuf,
}

impl SharedMediaLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StorageLayout for SharedMediaLayout {
    fn roots(&self, set_id: &str) -> SetRoots {
        let set_root = self.root.join(SETS_DIR).join(set_id);
        SetRoots {
            media_root: self.root.join(MEDIA_DIR).join(set_id),
            index_path: set_root.join(ASSET_INDEX_FILE),
            set_root,
        }
    }

    fn list_sets(&self) -> io::Result<Vec<String>> {
        list_subdirectories(&self.root.join(SETS_DIR))
    }

    fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }
}

/// Sorted names of the real (non-symlink) subdirectories of `dir`; missing `dir` is empty
fn list_subdirectories(dir: &Path) -> io::Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str()
            && !name.starts_with('.')
        {
            names.push(name.to_string());
        }
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_nested_layout_roots() {
        let layout = NestedLayout::new("/vault");
        let roots = layout.roots("work");
        assert_eq!(roots.set_root, PathBuf::from("/vault/sets/work"));
        assert_eq!(roots.media_root, PathBuf::from("/vault/sets/work/media"));
        assert_eq!(roots.index_path, PathBuf::from("/vault/sets/work/assets.json"));
        assert_eq!(roots.companion_html_path(), PathBuf::from("/vault/sets/work/chat.html"));
    }

    #[test]
    fn test_shared_media_layout_roots() {
        let layout = SharedMediaLayout::new("/vault");
        let roots = layout.roots("work");
        assert_eq!(roots.set_root, PathBuf::from("/vault/sets/work"));
        assert_eq!(roots.media_root, PathBuf::from("/vault/media/work"));
    }

    #[test]
    fn test_list_sets_skips_files_and_hidden_dirs() {
        let dir = TempDir::new().unwrap();
        let layout = NestedLayout::new(dir.path());
        assert!(layout.list_sets().unwrap().is_empty());

        fs::create_dir_all(dir.path().join("sets/b")).unwrap();
        fs::create_dir_all(dir.path().join("sets/a")).unwrap();
        fs::create_dir_all(dir.path().join("sets/.tmp")).unwrap();
        fs::write(dir.path().join("sets/readme.txt"), "x").unwrap();

        assert_eq!(layout.list_sets().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }
}
