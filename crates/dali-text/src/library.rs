//! The font library capability set used by the face manager
//!
//! Operations mirror the native FreeType calls the manager issues: face
//! creation from a path or a memory buffer, the multiple-masters axis query,
//! size objects and their activation, char sizing and fixed-size selection.
//! Native faces and sizes release themselves when dropped.

use std::sync::Arc;

use dali_adaptor_core::{Dpi, FaceResult};
use read_fonts::types::Tag;

/// Point size in 26.6 fixed point (64 units per point)
pub type PointSize26Dot6 = u32;

/// Index of a face inside a font collection
pub type FaceIndex = u32;

/// 16.16 fixed-point design coordinate
pub type Fixed = i32;

/// One 16.16 unit
pub const FIXED_ONE: f32 = 65536.0;

/// Convert a float to 16.16 fixed point
pub fn to_fixed(value: f32) -> Fixed {
    (value * FIXED_ONE) as Fixed
}

/// Convert 16.16 fixed point to a float
pub fn from_fixed(value: Fixed) -> f32 {
    value as f32 / FIXED_ONE
}

/// A variation axis declared by a variable font
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariationAxis {
    pub tag: Tag,
    pub minimum: Fixed,
    pub default: Fixed,
    pub maximum: Fixed,
}

/// Face flags the manager cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceProperties {
    /// Outlines can be scaled to any size
    pub scalable: bool,
    /// Bitmap strike sizes in 26.6 points, ascending
    pub fixed_sizes: Vec<PointSize26Dot6>,
}

impl FaceProperties {
    /// Non-scalable with at least one bitmap strike
    pub fn is_bitmap_font(&self) -> bool {
        !self.scalable && !self.fixed_sizes.is_empty()
    }
}

/// Native font library operations
///
/// `set_char_size` applies to whichever size object was last activated on
/// the face, as `FT_Set_Char_Size` does.
pub trait FontLibrary {
    /// Native face object
    type Face;
    /// Native size object
    type Size;

    /// Open face `face_index` of the font at `path`
    fn new_face(&self, path: &str, face_index: FaceIndex) -> FaceResult<Self::Face>;

    /// Open face `face_index` from bytes already in memory
    fn new_memory_face(&self, data: Arc<[u8]>, face_index: FaceIndex) -> FaceResult<Self::Face>;

    fn face_properties(&self, face: &Self::Face) -> FaceProperties;

    /// Declared variation axes; empty for static fonts
    fn variation_axes(&self, face: &Self::Face) -> FaceResult<Vec<VariationAxis>>;

    /// Apply design coordinates, one per axis in declaration order
    fn set_variation_coordinates(&self, face: &Self::Face, coords: &[Fixed]) -> FaceResult<()>;

    fn new_size(&self, face: &Self::Face) -> FaceResult<Self::Size>;

    fn activate_size(&self, face: &Self::Face, size: &Self::Size) -> FaceResult<()>;

    fn set_char_size(
        &self,
        face: &Self::Face,
        point_size: PointSize26Dot6,
        dpi: Dpi,
    ) -> FaceResult<()>;

    fn select_fixed_size(&self, face: &Self::Face, index: usize) -> FaceResult<()>;
}
