//! Font face and size management for the DALi adaptor
//!
//! [`FontFaceManager`] maps each font path to one native face and keeps
//! recently used size objects in an LRU cache, so text layout can switch
//! between sizes and variation instances without recreating them. The
//! native side is abstracted by [`FontLibrary`]; [`SkrifaLibrary`] is a
//! pure-Rust implementation.
//!
//! ```
//! use dali_text::{FontFaceManager, FontFileCache, SkrifaLibrary};
//! use std::sync::Arc;
//!
//! let files = Arc::new(FontFileCache::new());
//! let mut manager = FontFaceManager::new(SkrifaLibrary::new(), 32);
//! manager.set_font_file_manager(&files);
//! manager.set_dpi(96, 96);
//! assert_eq!(manager.cached_size_count(), 0);
//! ```

pub mod face_manager;
pub mod file_manager;
pub mod library;
pub mod lru_cache;
pub mod skrifa_library;
pub mod variations;

pub use face_manager::{
    nearest_fixed_size_index, FaceCacheStats, FaceHandle, FaceId, FaceSizeCacheKey,
    FontFaceManager,
};
pub use file_manager::{FontFileCache, FontFileManager};
pub use library::{
    FaceIndex, FaceProperties, Fixed, FontLibrary, PointSize26Dot6, VariationAxis,
};
pub use lru_cache::LruCacheContainer;
pub use skrifa_library::{SizeMetrics, SkrifaFace, SkrifaLibrary, SkrifaSize};
pub use variations::{variations_hash, BuiltVariations, HbVariation, VariationsMap};
