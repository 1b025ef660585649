//! Runtime configuration for the conversation library.
//!
//! Limits are plain constants with a [`Default`] implementation; the storage root comes
//! from the environment (see [`environment`]).

pub mod environment;
pub mod limits;

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use environment::{STORAGE_ROOT_ENV, get_storage_root};
pub use limits::IngestLimits;

/// Default number of cached directory searches
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// What to do when a conversation file with the same name already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Leave the existing file untouched
    #[default]
    Skip,
    /// Replace the existing file
    Overwrite,
}

#[derive(Debug, Clone)]
pub struct LibraryConfig {
    pub storage_root: PathBuf,
    pub limits: IngestLimits,
    pub collision_policy: CollisionPolicy,
    pub cache_capacity: usize,
}

impl LibraryConfig {
    /// Configuration rooted at an explicit directory, with default limits
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            limits: IngestLimits::default(),
            collision_policy: CollisionPolicy::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Configuration rooted at the directory named by the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(get_storage_root()?))
    }

    pub fn with_limits(mut self, limits: IngestLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let config = LibraryConfig::new("/tmp/vault");
        assert_eq!(config.storage_root, PathBuf::from("/tmp/vault"));
        assert_eq!(config.collision_policy, CollisionPolicy::Skip);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.limits.max_compression_ratio, 100.0);
    }

    #[test]
    fn test_builder_overrides() {
        let limits = IngestLimits { max_entries: 3, ..IngestLimits::default() };
        let config = LibraryConfig::new("/tmp/vault")
            .with_limits(limits)
            .with_collision_policy(CollisionPolicy::Overwrite)
            .with_cache_capacity(8);

        assert_eq!(config.limits.max_entries, 3);
        assert_eq!(config.collision_policy, CollisionPolicy::Overwrite);
        assert_eq!(config.cache_capacity, 8);
    }
}
