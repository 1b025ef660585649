//! Asset pointers, asset indexes and pointer-to-file resolution.

pub mod cache;
pub mod index;
pub mod pointer;
pub mod resolver;

pub use cache::{AssetSearchCache, CacheStats};
pub use index::{
    AssetIndexLoader, HtmlAssetsSource, IndexFileSource, IndexSource, extract_assets_json,
    parse_index_json,
};
pub use pointer::{AssetPointer, PointerScheme};
pub use resolver::{AssetResolver, find_by_prefix};
