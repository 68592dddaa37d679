//! Variable-font coordinates for the rasteriser and the shaper
//!
//! A request is a map from 4-character axis tag to value. Axes the request
//! does not mention stay at the font's default.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use read_fonts::types::Tag;

use crate::library::{from_fixed, to_fixed, Fixed, VariationAxis};

/// Requested axis values keyed by tag, e.g. `{"wght": 700.0}`
pub type VariationsMap = HashMap<String, f32>;

/// A tag/value pair in the form HarfBuzz consumes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HbVariation {
    pub tag: Tag,
    pub value: f32,
}

#[cfg(feature = "harfbuzz")]
impl From<HbVariation> for harfbuzz_rs::Variation {
    fn from(variation: HbVariation) -> Self {
        let [a, b, c, d] = variation.tag.to_be_bytes();
        harfbuzz_rs::Variation::new(
            harfbuzz_rs::Tag::new(a as char, b as char, c as char, d as char),
            variation.value,
        )
    }
}

/// Parallel outputs of [`build_variations`], one element per font axis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltVariations {
    /// Design coordinates in 16.16 fixed point
    pub freetype_coords: Vec<Fixed>,
    pub harfbuzz_variations: Vec<HbVariation>,
}

impl BuiltVariations {
    pub fn is_empty(&self) -> bool {
        self.freetype_coords.is_empty()
    }

    #[cfg(feature = "harfbuzz")]
    pub fn to_harfbuzz(&self) -> Vec<harfbuzz_rs::Variation> {
        self.harfbuzz_variations
            .iter()
            .map(|v| harfbuzz_rs::Variation::from(*v))
            .collect()
    }
}

/// Resolve requested values against the font's declared axes
pub fn build_variations(axes: &[VariationAxis], requested: &VariationsMap) -> BuiltVariations {
    let mut built = BuiltVariations {
        freetype_coords: Vec::with_capacity(axes.len()),
        harfbuzz_variations: Vec::with_capacity(axes.len()),
    };

    for axis in axes {
        let key = axis.tag.to_string();
        let (coord, value) = match requested.get(&key) {
            Some(value) => (to_fixed(*value), *value),
            None => (axis.default, from_fixed(axis.default)),
        };
        built.freetype_coords.push(coord);
        built.harfbuzz_variations.push(HbVariation {
            tag: axis.tag,
            value,
        });
    }
    built
}

/// Order-independent hash of a variation request
///
/// Used as the variation component of face-size cache keys. An absent or
/// empty request hashes to 0 so default instances share one key.
pub fn variations_hash(variations: Option<&VariationsMap>) -> u64 {
    let Some(variations) = variations.filter(|v| !v.is_empty()) else {
        return 0;
    };

    let mut entries: Vec<(&str, u32)> = variations
        .iter()
        .map(|(tag, value)| (tag.as_str(), value.to_bits()))
        .collect();
    entries.sort_unstable();

    let mut hasher = DefaultHasher::new();
    entries.hash(&mut hasher);
    hasher.finish()
}
