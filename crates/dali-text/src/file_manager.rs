//! Font file backing store
//!
//! The face manager asks a [`FontFileManager`] for a font's bytes before
//! falling back to opening the path itself. Applications that ship fonts
//! inside packages or download them at runtime register the bytes here.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use dali_adaptor_core::error::codes;
use dali_adaptor_core::{FaceError, FaceResult};
use parking_lot::RwLock;

/// Largest font file [`FontFileCache::preload`] accepts (50MB)
pub const MAX_FONT_SIZE: u64 = 50 * 1024 * 1024;

/// Source of in-memory font files
pub trait FontFileManager: Send + Sync {
    /// Bytes for `path`, or `None` to load from the filesystem
    fn find_font_file(&self, path: &str) -> Option<Arc<[u8]>>;
}

/// In-memory font files keyed by path
#[derive(Default)]
pub struct FontFileCache {
    files: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl FontFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes for `path`, replacing anything cached before
    pub fn cache_font_file(&self, path: impl Into<String>, data: impl Into<Arc<[u8]>>) {
        let path = path.into();
        let data = data.into();
        log::debug!("Caching font file {} ({} bytes)", path, data.len());
        self.files.write().insert(path, data);
    }

    /// Read `path` from disk into the cache and return its size
    pub fn preload(&self, path: &str) -> FaceResult<usize> {
        let cannot_open = |source| FaceError::CannotOpen {
            path: path.to_string(),
            source,
        };

        let len = std::fs::metadata(Path::new(path)).map_err(cannot_open)?.len();
        if len > MAX_FONT_SIZE {
            log::warn!(
                "Refusing to preload {}: {} bytes exceeds {}",
                path,
                len,
                MAX_FONT_SIZE
            );
            return Err(FaceError::native("preload", codes::OUT_OF_MEMORY));
        }

        let bytes = std::fs::read(path).map_err(cannot_open)?;
        let size = bytes.len();
        self.cache_font_file(path, bytes);
        Ok(size)
    }

    pub fn remove(&self, path: &str) -> bool {
        self.files.write().remove(path).is_some()
    }

    pub fn clear(&self) {
        self.files.write().clear();
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl FontFileManager for FontFileCache {
    fn find_font_file(&self, path: &str) -> Option<Arc<[u8]>> {
        self.files.read().get(path).cloned()
    }
}
