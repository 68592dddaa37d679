//! Counting font library used by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use dali_adaptor_core::error::codes;
use dali_adaptor_core::{Dpi, FaceError, FaceResult};
use dali_text::library::to_fixed;
use dali_text::{FaceIndex, FaceProperties, Fixed, FontLibrary, PointSize26Dot6, VariationAxis};
use parking_lot::Mutex;
use read_fonts::types::Tag;

/// Native call counters
#[derive(Default)]
pub struct Calls {
    pub new_face: AtomicUsize,
    pub new_memory_face: AtomicUsize,
    pub new_size: AtomicUsize,
    pub activate_size: AtomicUsize,
    pub set_char_size: AtomicUsize,
    pub select_fixed_size: AtomicUsize,
    pub set_variation_coordinates: AtomicUsize,
    pub faces_dropped: AtomicUsize,
    pub sizes_dropped: AtomicUsize,
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

/// What a fake font file contains
#[derive(Debug, Clone, Default)]
pub struct MockFont {
    pub scalable: bool,
    pub fixed_sizes: Vec<PointSize26Dot6>,
    pub axes: Vec<VariationAxis>,
    pub axes_error: bool,
}

impl MockFont {
    pub fn outline() -> Self {
        Self {
            scalable: true,
            ..Self::default()
        }
    }

    pub fn bitmap(points: &[u32]) -> Self {
        Self {
            scalable: false,
            fixed_sizes: points.iter().map(|p| p * 64).collect(),
            ..Self::default()
        }
    }

    pub fn variable() -> Self {
        Self {
            scalable: true,
            axes: vec![
                VariationAxis {
                    tag: Tag::new(b"wght"),
                    minimum: to_fixed(100.0),
                    default: to_fixed(400.0),
                    maximum: to_fixed(900.0),
                },
                VariationAxis {
                    tag: Tag::new(b"wdth"),
                    minimum: to_fixed(75.0),
                    default: to_fixed(100.0),
                    maximum: to_fixed(125.0),
                },
            ],
            ..Self::default()
        }
    }
}

pub struct MockFace {
    pub key: String,
    pub font: MockFont,
    pub from_memory: bool,
    pub coords: Mutex<Vec<Fixed>>,
    calls: Arc<Calls>,
}

impl Drop for MockFace {
    fn drop(&mut self) {
        self.calls.faces_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockSize {
    calls: Arc<Calls>,
}

impl Drop for MockSize {
    fn drop(&mut self) {
        self.calls.sizes_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Font library with a fixed catalogue of fake fonts
///
/// Memory faces look the font up by the buffer's UTF-8 contents.
#[derive(Default)]
pub struct CountingLibrary {
    pub calls: Arc<Calls>,
    fonts: HashMap<String, MockFont>,
    pub fail_new_size: AtomicBool,
    pub fail_activate_size: AtomicBool,
    pub fail_set_char_size: AtomicBool,
    pub last_dpi: Mutex<Option<Dpi>>,
}

impl CountingLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(mut self, key: &str, font: MockFont) -> Self {
        self.fonts.insert(key.to_string(), font);
        self
    }

    pub fn calls(&self) -> Arc<Calls> {
        Arc::clone(&self.calls)
    }

    fn make_face(&self, key: &str, font: MockFont, from_memory: bool) -> MockFace {
        MockFace {
            key: key.to_string(),
            font,
            from_memory,
            coords: Mutex::new(Vec::new()),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl FontLibrary for CountingLibrary {
    type Face = MockFace;
    type Size = MockSize;

    fn new_face(&self, path: &str, _face_index: FaceIndex) -> FaceResult<MockFace> {
        self.calls.new_face.fetch_add(1, Ordering::SeqCst);
        match self.fonts.get(path) {
            Some(font) => Ok(self.make_face(path, font.clone(), false)),
            None => Err(FaceError::CannotOpen {
                path: path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such font"),
            }),
        }
    }

    fn new_memory_face(&self, data: Arc<[u8]>, _face_index: FaceIndex) -> FaceResult<MockFace> {
        self.calls.new_memory_face.fetch_add(1, Ordering::SeqCst);
        let key = String::from_utf8_lossy(&data).to_string();
        match self.fonts.get(&key) {
            Some(font) => Ok(self.make_face(&key, font.clone(), true)),
            None => Err(FaceError::UnknownFormat(key)),
        }
    }

    fn face_properties(&self, face: &MockFace) -> FaceProperties {
        FaceProperties {
            scalable: face.font.scalable,
            fixed_sizes: face.font.fixed_sizes.clone(),
        }
    }

    fn variation_axes(&self, face: &MockFace) -> FaceResult<Vec<VariationAxis>> {
        if face.font.axes_error {
            return Err(FaceError::native("variation_axes", codes::INVALID_ARGUMENT));
        }
        Ok(face.font.axes.clone())
    }

    fn set_variation_coordinates(&self, face: &MockFace, coords: &[Fixed]) -> FaceResult<()> {
        self.calls
            .set_variation_coordinates
            .fetch_add(1, Ordering::SeqCst);
        *face.coords.lock() = coords.to_vec();
        Ok(())
    }

    fn new_size(&self, _face: &MockFace) -> FaceResult<MockSize> {
        self.calls.new_size.fetch_add(1, Ordering::SeqCst);
        if self.fail_new_size.load(Ordering::SeqCst) {
            return Err(FaceError::native("new_size", codes::OUT_OF_MEMORY));
        }
        Ok(MockSize {
            calls: Arc::clone(&self.calls),
        })
    }

    fn activate_size(&self, _face: &MockFace, _size: &MockSize) -> FaceResult<()> {
        self.calls.activate_size.fetch_add(1, Ordering::SeqCst);
        if self.fail_activate_size.load(Ordering::SeqCst) {
            return Err(FaceError::native("activate_size", codes::INVALID_SIZE_HANDLE));
        }
        Ok(())
    }

    fn set_char_size(
        &self,
        _face: &MockFace,
        _point_size: PointSize26Dot6,
        dpi: Dpi,
    ) -> FaceResult<()> {
        self.calls.set_char_size.fetch_add(1, Ordering::SeqCst);
        *self.last_dpi.lock() = Some(dpi);
        if self.fail_set_char_size.load(Ordering::SeqCst) {
            return Err(FaceError::native("set_char_size", codes::INVALID_PIXEL_SIZE));
        }
        Ok(())
    }

    fn select_fixed_size(&self, face: &MockFace, index: usize) -> FaceResult<()> {
        self.calls.select_fixed_size.fetch_add(1, Ordering::SeqCst);
        if index >= face.font.fixed_sizes.len() {
            return Err(FaceError::native("select_fixed_size", codes::INVALID_ARGUMENT));
        }
        Ok(())
    }
}
