// this_file: crates/dali-text/src/skrifa_library.rs

//! Pure-Rust [`FontLibrary`] built on skrifa
//!
//! Files are memory mapped and parsed lazily; a face keeps its bytes and
//! re-borrows a [`FontRef`] whenever it needs one. Sizes are shared slots
//! holding the most recent char-size request, and a face remembers which
//! slot is active so scaled metrics can be read back after activation.

use std::fs::File;
use std::sync::Arc;

use dali_adaptor_core::error::codes;
use dali_adaptor_core::{Dpi, FaceError, FaceResult};
use memmap2::Mmap;
use parking_lot::Mutex;
use read_fonts::types::Tag;
use skrifa::bitmap::BitmapStrikes;
use skrifa::instance::{Location, Size};
use skrifa::{FontRef, MetadataProvider};

use crate::library::{
    from_fixed, to_fixed, FaceIndex, FaceProperties, Fixed, FontLibrary, PointSize26Dot6,
    VariationAxis,
};

const OUTLINE_TABLES: [Tag; 3] = [Tag::new(b"glyf"), Tag::new(b"CFF "), Tag::new(b"CFF2")];

enum FaceData {
    Mapped(Mmap),
    Shared(Arc<[u8]>),
}

impl FaceData {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => &mmap[..],
            Self::Shared(bytes) => &bytes[..],
        }
    }
}

/// Requested char size of a size object, already converted to pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharSize {
    pub point_size: PointSize26Dot6,
    pub x_ppem: f32,
    pub y_ppem: f32,
}

/// Scaled font-wide metrics for the active size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeMetrics {
    pub x_ppem: f32,
    pub y_ppem: f32,
    pub units_per_em: u16,
    pub ascent: f32,
    pub descent: f32,
    pub leading: f32,
}

/// Size object; clones refer to the same slot
#[derive(Debug, Clone, Default)]
pub struct SkrifaSize {
    slot: Arc<Mutex<Option<CharSize>>>,
}

impl SkrifaSize {
    pub fn char_size(&self) -> Option<CharSize> {
        *self.slot.lock()
    }

    fn set(&self, size: CharSize) {
        *self.slot.lock() = Some(size);
    }
}

#[derive(Default)]
struct FaceState {
    coords: Vec<Fixed>,
    active: Option<SkrifaSize>,
    selected_strike: Option<usize>,
}

/// A loaded face
pub struct SkrifaFace {
    name: String,
    index: FaceIndex,
    data: FaceData,
    state: Mutex<FaceState>,
}

impl SkrifaFace {
    fn new(name: String, index: FaceIndex, data: FaceData) -> FaceResult<Self> {
        let face = Self {
            name,
            index,
            data,
            state: Mutex::new(FaceState::default()),
        };
        face.font_ref()?;
        Ok(face)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn face_index(&self) -> FaceIndex {
        self.index
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_bytes()
    }

    /// Parsed view of this face
    pub fn font_ref(&self) -> FaceResult<FontRef<'_>> {
        FontRef::from_index(self.data.as_bytes(), self.index)
            .map_err(|e| FaceError::UnknownFormat(format!("{}: {}", self.name, e)))
    }

    /// Design coordinates last applied
    pub fn variation_coordinates(&self) -> Vec<Fixed> {
        self.state.lock().coords.clone()
    }

    /// Char size of the active size object
    pub fn char_size(&self) -> Option<CharSize> {
        self.state.lock().active.as_ref().and_then(SkrifaSize::char_size)
    }

    pub fn selected_fixed_size(&self) -> Option<usize> {
        self.state.lock().selected_strike
    }

    /// Metrics at the active size and current variation coordinates
    pub fn metrics(&self) -> Option<SizeMetrics> {
        let size = self.char_size()?;
        let font = self.font_ref().ok()?;
        let location = self.location(&font);
        let metrics = font.metrics(Size::new(size.y_ppem), &location);
        Some(SizeMetrics {
            x_ppem: size.x_ppem,
            y_ppem: size.y_ppem,
            units_per_em: metrics.units_per_em,
            ascent: metrics.ascent,
            descent: metrics.descent,
            leading: metrics.leading,
        })
    }

    fn location(&self, font: &FontRef<'_>) -> Location {
        let coords = self.variation_coordinates();
        let axes = font.axes();
        axes.location(
            axes.iter()
                .zip(coords)
                .map(|(axis, coord)| (axis.tag(), from_fixed(coord))),
        )
    }
}

impl std::fmt::Debug for SkrifaFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkrifaFace")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("len", &self.data.as_bytes().len())
            .finish()
    }
}

/// Font library backed by skrifa and read-fonts
#[derive(Debug, Clone, Copy, Default)]
pub struct SkrifaLibrary;

impl SkrifaLibrary {
    pub fn new() -> Self {
        Self
    }
}

fn ppem(point_size: PointSize26Dot6, dpi: u32) -> f32 {
    point_size as f32 / 64.0 * dpi as f32 / Dpi::DEFAULT as f32
}

impl FontLibrary for SkrifaLibrary {
    type Face = SkrifaFace;
    type Size = SkrifaSize;

    fn new_face(&self, path: &str, face_index: FaceIndex) -> FaceResult<SkrifaFace> {
        let file = File::open(path).map_err(|source| FaceError::CannotOpen {
            path: path.to_string(),
            source,
        })?;

        // SAFETY: the mapping is read only and owned by the face; font files
        // are not expected to change while loaded.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| FaceError::CannotOpen {
            path: path.to_string(),
            source,
        })?;

        SkrifaFace::new(path.to_string(), face_index, FaceData::Mapped(mmap))
    }

    fn new_memory_face(&self, data: Arc<[u8]>, face_index: FaceIndex) -> FaceResult<SkrifaFace> {
        SkrifaFace::new("<memory>".to_string(), face_index, FaceData::Shared(data))
    }

    fn face_properties(&self, face: &SkrifaFace) -> FaceProperties {
        let Ok(font) = face.font_ref() else {
            return FaceProperties::default();
        };
        let scalable = OUTLINE_TABLES
            .iter()
            .any(|tag| font.table_data(*tag).is_some());
        let fixed_sizes = strike_sizes(BitmapStrikes::new(&font).iter().map(|s| s.ppem()));
        FaceProperties {
            scalable,
            fixed_sizes,
        }
    }

    fn variation_axes(&self, face: &SkrifaFace) -> FaceResult<Vec<VariationAxis>> {
        let font = face.font_ref()?;
        Ok(font
            .axes()
            .iter()
            .map(|axis| VariationAxis {
                tag: axis.tag(),
                minimum: to_fixed(axis.min_value()),
                default: to_fixed(axis.default_value()),
                maximum: to_fixed(axis.max_value()),
            })
            .collect())
    }

    fn set_variation_coordinates(&self, face: &SkrifaFace, coords: &[Fixed]) -> FaceResult<()> {
        let axis_count = face.font_ref()?.axes().len();
        if coords.len() > axis_count {
            return Err(FaceError::native(
                "set_variation_coordinates",
                codes::INVALID_ARGUMENT,
            ));
        }
        face.state.lock().coords = coords.to_vec();
        Ok(())
    }

    fn new_size(&self, _face: &SkrifaFace) -> FaceResult<SkrifaSize> {
        Ok(SkrifaSize::default())
    }

    fn activate_size(&self, face: &SkrifaFace, size: &SkrifaSize) -> FaceResult<()> {
        face.state.lock().active = Some(size.clone());
        Ok(())
    }

    fn set_char_size(
        &self,
        face: &SkrifaFace,
        point_size: PointSize26Dot6,
        dpi: Dpi,
    ) -> FaceResult<()> {
        // Zero means one point, as FreeType treats it
        let point_size = if point_size == 0 { 64 } else { point_size };
        let size = CharSize {
            point_size,
            x_ppem: ppem(point_size, dpi.effective_horizontal()),
            y_ppem: ppem(point_size, dpi.effective_vertical()),
        };

        let properties = self.face_properties(face);
        if !properties.scalable {
            let matches_strike = properties
                .fixed_sizes
                .iter()
                .any(|fixed| (*fixed as f32 / 64.0 - size.y_ppem).abs() < 0.5);
            if !matches_strike {
                return Err(FaceError::native("set_char_size", codes::INVALID_PIXEL_SIZE));
            }
        }

        let state = face.state.lock();
        let active = state
            .active
            .as_ref()
            .ok_or_else(|| FaceError::native("set_char_size", codes::INVALID_SIZE_HANDLE))?;
        active.set(size);
        Ok(())
    }

    fn select_fixed_size(&self, face: &SkrifaFace, index: usize) -> FaceResult<()> {
        let properties = self.face_properties(face);
        let Some(fixed) = properties.fixed_sizes.get(index) else {
            return Err(FaceError::native("select_fixed_size", codes::INVALID_ARGUMENT));
        };
        let ppem = *fixed as f32 / 64.0;

        let mut state = face.state.lock();
        state.selected_strike = Some(index);
        if let Some(active) = &state.active {
            active.set(CharSize {
                point_size: *fixed,
                x_ppem: ppem,
                y_ppem: ppem,
            });
        }
        Ok(())
    }
}

/// Strike ppems as ascending 26.6 sizes; strike indices refer to this order
fn strike_sizes(ppems: impl Iterator<Item = f32>) -> Vec<PointSize26Dot6> {
    let mut sizes: Vec<PointSize26Dot6> = ppems
        .map(|ppem| (ppem * 64.0).round() as PointSize26Dot6)
        .collect();
    sizes.sort_unstable();
    sizes
}
