// this_file: crates/dali-text/src/face_manager.rs

//! Face loading and size activation with minimal native calls
//!
//! One native face exists per font path. Size objects are kept in an LRU
//! cache keyed by (face, point size, variation hash), and each face
//! remembers which combination is currently active so a repeated request
//! costs nothing.
//!
//! The manager is not thread safe; callers serialise access.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use dali_adaptor_core::{AdaptorConfig, Dpi, FaceResult};

use crate::file_manager::FontFileManager;
use crate::library::{FaceIndex, Fixed, FontLibrary, PointSize26Dot6};
use crate::lru_cache::LruCacheContainer;
use crate::variations::{self, BuiltVariations, VariationsMap};

/// Identity of a loaded face, unique for the manager's lifetime
pub type FaceId = u64;

/// Shared handle to a loaded face
///
/// The native face lives until the manager has reclaimed it and every
/// handle has been dropped.
pub struct FaceHandle<F> {
    id: FaceId,
    native: Arc<F>,
}

impl<F> FaceHandle<F> {
    pub fn id(&self) -> FaceId {
        self.id
    }

    pub fn native(&self) -> &F {
        &self.native
    }

    /// True when both handles refer to the same native face
    pub fn same_face(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.native, &other.native)
    }
}

impl<F> Clone for FaceHandle<F> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            native: Arc::clone(&self.native),
        }
    }
}

impl<F> std::fmt::Debug for FaceHandle<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FaceHandle").field(&self.id).finish()
    }
}

/// Key of one cached size object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceSizeCacheKey {
    pub face_id: FaceId,
    pub requested_point_size: PointSize26Dot6,
    pub variations_hash: u64,
}

/// The size currently active on a face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActivatedSizeData {
    requested_point_size: PointSize26Dot6,
    variations_hash: u64,
}

impl From<&FaceSizeCacheKey> for ActivatedSizeData {
    fn from(key: &FaceSizeCacheKey) -> Self {
        Self {
            requested_point_size: key.requested_point_size,
            variations_hash: key.variations_hash,
        }
    }
}

// Field order matters: the size is released before its face.
struct FaceSizeCacheData<F, S> {
    size: S,
    _face: Arc<F>,
}

struct FaceCacheData<F> {
    handle: FaceHandle<F>,
    reference: u32,
    release_pending: bool,
}

/// Counters for cache behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaceCacheStats {
    /// Activations answered by the already-active marker
    pub shortcuts: u64,
    /// Activations that found a cached size object
    pub hits: u64,
    /// Activations that created a size object
    pub misses: u64,
    /// Size objects evicted to make room
    pub evictions: u64,
    pub faces_loaded: u64,
    pub faces_reclaimed: u64,
}

/// Owns native faces and sizes for one font client
pub struct FontFaceManager<L: FontLibrary> {
    library: L,
    size_cache: LruCacheContainer<FaceSizeCacheKey, FaceSizeCacheData<L::Face, L::Size>>,
    font_file_manager: Option<Weak<dyn FontFileManager>>,
    faces: HashMap<String, FaceCacheData<L::Face>>,
    activated_sizes: HashMap<FaceId, ActivatedSizeData>,
    selected_fixed_sizes: HashMap<FaceId, PointSize26Dot6>,
    dpi: Dpi,
    next_face_id: FaceId,
    stats: FaceCacheStats,
}

impl<L: FontLibrary> FontFaceManager<L> {
    /// Create a manager caching at most `max_face_size_cache` size objects
    pub fn new(library: L, max_face_size_cache: usize) -> Self {
        log::debug!(
            "FontFaceManager created with maximum size cache {}",
            max_face_size_cache
        );
        Self {
            library,
            size_cache: LruCacheContainer::new(max_face_size_cache),
            font_file_manager: None,
            faces: HashMap::new(),
            activated_sizes: HashMap::new(),
            selected_fixed_sizes: HashMap::new(),
            dpi: Dpi::default(),
            next_face_id: 1,
            stats: FaceCacheStats::default(),
        }
    }

    /// Create a manager sized and configured from `config`
    pub fn from_config(library: L, config: &AdaptorConfig) -> Self {
        let mut manager = Self::new(library, config.face_size_cache_max);
        if let Some(dpi) = config.dpi {
            manager.set_dpi(dpi.horizontal, dpi.vertical);
        }
        manager
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    /// Use `manager` as the source of in-memory font files
    ///
    /// Only a weak reference is kept; once the caller drops the manager,
    /// faces load from the filesystem again.
    pub fn set_font_file_manager<M>(&mut self, manager: &Arc<M>)
    where
        M: FontFileManager + 'static,
    {
        let weak = Arc::downgrade(manager);
        let weak: Weak<dyn FontFileManager> = weak;
        self.font_file_manager = Some(weak);
    }

    pub fn set_dpi(&mut self, horizontal: u32, vertical: u32) {
        self.dpi = Dpi::new(horizontal, vertical);
    }

    pub fn dpi(&self) -> Dpi {
        self.dpi
    }

    /// Load the face at `path`, reusing the cached face if there is one
    ///
    /// Bytes from the font file manager take precedence over the path. A
    /// failed load leaves nothing cached and returns the native error.
    pub fn load_face(
        &mut self,
        path: &str,
        face_index: FaceIndex,
    ) -> FaceResult<FaceHandle<L::Face>> {
        if let Some(entry) = self.faces.get(path) {
            return Ok(entry.handle.clone());
        }

        let memory = self
            .font_file_manager
            .as_ref()
            .and_then(Weak::upgrade)
            .and_then(|manager| manager.find_font_file(path));
        let from_memory = memory.is_some();

        let native = match memory {
            Some(data) => {
                log::debug!("Loading memory face {} ({} bytes)", path, data.len());
                self.library.new_memory_face(data, face_index)
            }
            None => {
                log::debug!("Loading face {}", path);
                self.library.new_face(path, face_index)
            }
        };

        let native = native.map_err(|err| {
            log::error!(
                "Load face fail, error code:0x{:02X}, memory face:{}: {}",
                err.code(),
                from_memory,
                err
            );
            err
        })?;

        let handle = FaceHandle {
            id: self.next_face_id,
            native: Arc::new(native),
        };
        self.next_face_id += 1;
        self.stats.faces_loaded += 1;

        self.faces.insert(
            path.to_string(),
            FaceCacheData {
                handle: handle.clone(),
                reference: 0,
                release_pending: false,
            },
        );
        Ok(handle)
    }

    pub fn reference_face(&mut self, path: &str) {
        if let Some(entry) = self.faces.get_mut(path) {
            entry.reference += 1;
            entry.release_pending = false;
        }
    }

    /// Drop one reference; at zero the face becomes reclaimable
    pub fn release_face(&mut self, path: &str) {
        if path.is_empty() {
            return;
        }

        if let Some(entry) = self.faces.get_mut(path) {
            entry.reference = entry.reference.saturating_sub(1);
            if entry.reference == 0 {
                log::trace!("Face {} has no references, release pending", path);
                entry.release_pending = true;
            }
        }
    }

    pub fn reference_count(&self, path: &str) -> Option<u32> {
        self.faces.get(path).map(|entry| entry.reference)
    }

    /// Destroy faces released to zero references, with their sizes
    ///
    /// Call at a point where no layout is in flight, e.g. end of frame.
    /// Returns how many faces were reclaimed.
    pub fn reclaim_released_faces(&mut self) -> usize {
        let released: Vec<String> = self
            .faces
            .iter()
            .filter(|(_, entry)| entry.release_pending)
            .map(|(path, _)| path.clone())
            .collect();

        for path in &released {
            let Some(entry) = self.faces.remove(path) else {
                continue;
            };
            let face_id = entry.handle.id;
            let sizes = self.size_cache.erase_where(|key| key.face_id == face_id);
            self.activated_sizes.remove(&face_id);
            self.selected_fixed_sizes.remove(&face_id);
            log::debug!("Reclaimed face {} and {} cached sizes", path, sizes.len());
        }

        self.stats.faces_reclaimed += released.len() as u64;
        released.len()
    }

    /// Resolve a variation request against the face's axes
    ///
    /// Returns empty outputs when there is no request, the font is static,
    /// or the axes cannot be read.
    pub fn build_variations(
        &self,
        face: &FaceHandle<L::Face>,
        variations: Option<&VariationsMap>,
    ) -> BuiltVariations {
        let Some(requested) = variations else {
            return BuiltVariations::default();
        };

        match self.library.variation_axes(&face.native) {
            Ok(axes) => variations::build_variations(&axes, requested),
            Err(err) => {
                log::error!("Variation axis query fail, error code:0x{:02X}", err.code());
                BuiltVariations::default()
            }
        }
    }

    /// Make the requested size current on `face`
    ///
    /// Repeating the active combination makes no native call but still
    /// refreshes its recency. A cached size only needs
    /// activating; otherwise a new size object is created, activated and
    /// sized, evicting the least recently used one if the cache is full.
    pub fn activate_face(
        &mut self,
        face: &FaceHandle<L::Face>,
        requested_point_size: PointSize26Dot6,
        variations_hash: u64,
        freetype_coords: &[Fixed],
    ) -> FaceResult<()> {
        let key = FaceSizeCacheKey {
            face_id: face.id,
            requested_point_size,
            variations_hash,
        };
        let requested = ActivatedSizeData::from(&key);

        if self.activated_sizes.get(&face.id) == Some(&requested) {
            self.stats.shortcuts += 1;
            // Still counts as a use for eviction order.
            self.size_cache.get(&key);
            return Ok(());
        }

        if let Some(cached) = self.size_cache.get(&key) {
            self.stats.hits += 1;
            apply_coordinates(&self.library, &face.native, freetype_coords);
            return match self.library.activate_size(&face.native, &cached.size) {
                Ok(()) => {
                    self.activated_sizes.insert(face.id, requested);
                    Ok(())
                }
                Err(err) => {
                    log::error!("Activate size fail, error code:0x{:02X}", err.code());
                    self.activated_sizes.remove(&face.id);
                    Err(err)
                }
            };
        }

        self.stats.misses += 1;
        if self.size_cache.is_full() {
            if let Some((evicted, _)) = self.size_cache.pop_with_key() {
                self.forget_evicted(&evicted);
            }
        }

        apply_coordinates(&self.library, &face.native, freetype_coords);

        let size = self.library.new_size(&face.native).map_err(|err| {
            log::error!("New size fail, error code:0x{:02X}", err.code());
            err
        })?;

        if let Err(err) = self.library.activate_size(&face.native, &size) {
            log::error!("Activate size fail, error code:0x{:02X}", err.code());
            self.activated_sizes.remove(&face.id);
            return Err(err);
        }

        if let Err(err) = self
            .library
            .set_char_size(&face.native, requested_point_size, self.dpi)
        {
            log::error!("Set char size fail, error code:0x{:02X}", err.code());
            self.activated_sizes.remove(&face.id);
            return Err(err);
        }

        self.activated_sizes.insert(face.id, requested);
        self.size_cache.push(
            key,
            FaceSizeCacheData {
                size,
                _face: Arc::clone(&face.native),
            },
        );
        Ok(())
    }

    fn forget_evicted(&mut self, evicted: &FaceSizeCacheKey) {
        self.stats.evictions += 1;
        let marker = ActivatedSizeData::from(evicted);
        if self.activated_sizes.get(&evicted.face_id) == Some(&marker) {
            log::trace!(
                "Evicted active size {:?}, cache size {}",
                evicted,
                self.size_cache.count()
            );
            self.activated_sizes.remove(&evicted.face_id);
        }
    }

    /// Non-scalable with at least one bitmap strike
    pub fn is_bitmap_font(&self, face: &FaceHandle<L::Face>) -> bool {
        self.library.face_properties(&face.native).is_bitmap_font()
    }

    /// Strike to use for `requested_point_size` on a bitmap font
    ///
    /// `None` when the face has no strikes.
    pub fn find_fixed_size_index(
        &self,
        face: &FaceHandle<L::Face>,
        requested_point_size: PointSize26Dot6,
    ) -> Option<usize> {
        let properties = self.library.face_properties(&face.native);
        nearest_fixed_size_index(&properties.fixed_sizes, requested_point_size)
    }

    /// Select strike `fixed_size_index` unless `requested_point_size` is
    /// already selected on this face
    pub fn select_fixed_size(
        &mut self,
        face: &FaceHandle<L::Face>,
        requested_point_size: PointSize26Dot6,
        fixed_size_index: usize,
    ) -> FaceResult<()> {
        if self.selected_fixed_sizes.get(&face.id) == Some(&requested_point_size) {
            return Ok(());
        }

        match self.library.select_fixed_size(&face.native, fixed_size_index) {
            Ok(()) => {
                self.selected_fixed_sizes.insert(face.id, requested_point_size);
                Ok(())
            }
            Err(err) => {
                log::error!("Select size fail, error code:0x{:02X}", err.code());
                Err(err)
            }
        }
    }

    /// Release every cached size and face
    pub fn clear_cache(&mut self) {
        self.size_cache.clear();
        self.faces.clear();
        self.activated_sizes.clear();
        self.selected_fixed_sizes.clear();
    }

    /// Evict least recently used sizes until at most `remain` are left
    pub fn trim_size_cache(&mut self, remain: usize) -> usize {
        let mut trimmed = 0;
        while self.size_cache.count() > remain {
            let Some((evicted, _)) = self.size_cache.pop_with_key() else {
                break;
            };
            self.forget_evicted(&evicted);
            trimmed += 1;
        }
        trimmed
    }

    pub fn cached_size_count(&self) -> usize {
        self.size_cache.count()
    }

    pub fn cached_face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn size_cache_capacity(&self) -> usize {
        self.size_cache.capacity()
    }

    pub fn is_size_cached(&self, key: &FaceSizeCacheKey) -> bool {
        self.size_cache.contains(key)
    }

    pub fn stats(&self) -> FaceCacheStats {
        self.stats
    }
}

impl<L: FontLibrary> Drop for FontFaceManager<L> {
    fn drop(&mut self) {
        self.clear_cache();
    }
}

fn apply_coordinates<L: FontLibrary>(library: &L, face: &L::Face, coords: &[Fixed]) {
    if coords.is_empty() {
        return;
    }
    if let Err(err) = library.set_variation_coordinates(face, coords) {
        log::error!(
            "Set variation coordinates fail, error code:0x{:02X}",
            err.code()
        );
    }
}

/// First size not smaller than the request, or the largest when none is
pub fn nearest_fixed_size_index(
    fixed_sizes: &[PointSize26Dot6],
    requested_point_size: PointSize26Dot6,
) -> Option<usize> {
    if fixed_sizes.is_empty() {
        return None;
    }
    fixed_sizes
        .iter()
        .position(|size| *size >= requested_point_size)
        .or(Some(fixed_sizes.len() - 1))
}
