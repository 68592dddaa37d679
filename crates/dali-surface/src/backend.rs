//! Window-system capability set behind a render surface
//!
//! A backend owns the native objects (windows, pixmaps, buffer queues) and
//! the window-system calls around them. Hooks that only some surface kinds
//! need have no-op defaults.

use std::sync::Arc;

use dali_adaptor_core::{ColorDepth, Dpi, PositionSize, SurfaceResult};

use crate::buffer_queue::BufferQueue;
use crate::graphics::{NativeHandle, NativeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceType {
    /// On-screen window, presented by swapping buffers
    Window,
    /// Two offscreen pixmaps, flipped every frame
    Pixmap,
    /// Driver-owned queue of presentable buffers
    NativeQueue,
}

impl SurfaceType {
    pub fn native_kind(self) -> NativeKind {
        match self {
            Self::Pixmap => NativeKind::Pixmap,
            Self::Window | Self::NativeQueue => NativeKind::Window,
        }
    }

    /// Number of native handles a surface of this type keeps
    pub fn buffer_count(self) -> usize {
        match self {
            Self::Pixmap => 2,
            Self::Window | Self::NativeQueue => 1,
        }
    }
}

/// Window and screen rotation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationTransform {
    pub window_angle: i32,
    pub screen_angle: i32,
}

impl RotationTransform {
    /// Combined rotation applied to rendered buffers
    pub fn total(&self) -> i32 {
        (self.window_angle + self.screen_angle).rem_euclid(360)
    }
}

pub trait SurfaceBackend: Send {
    fn surface_type(&self) -> SurfaceType;

    /// Full screen size, used for windows created with a zero dimension
    fn screen_size(&self) -> (u32, u32);

    fn dpi(&self) -> Dpi;

    /// Create the native object for buffer `index`
    fn create_native_handle(
        &mut self,
        geometry: &PositionSize,
        depth: ColorDepth,
        index: usize,
    ) -> SurfaceResult<NativeHandle>;

    fn destroy_native_handle(&mut self, handle: NativeHandle);

    fn set_transparency(&mut self, _handle: NativeHandle, _transparent: bool) {}

    /// Create the graphics-side window wrapper for `handle`
    fn create_graphics_window(&mut self, _handle: NativeHandle, _width: u32, _height: u32) {}

    fn destroy_graphics_window(&mut self, _handle: NativeHandle) {}

    fn resize_graphics_window(&mut self, _handle: NativeHandle, _width: u32, _height: u32) {}

    fn move_window(&mut self, _handle: NativeHandle, _geometry: &PositionSize) {}

    fn resize_window(&mut self, _handle: NativeHandle, _geometry: &PositionSize) {}

    fn move_resize_window(&mut self, _handle: NativeHandle, _geometry: &PositionSize) {}

    fn rotation_supported(&self) -> bool {
        false
    }

    /// Current output (screen) rotation
    fn screen_rotation_angle(&self) -> i32 {
        0
    }

    /// Tell the window manager about a requested window rotation
    fn set_window_rotation_angle(&mut self, _handle: NativeHandle, _angle: i32) {}

    /// Rotate the graphics window and its buffer transform
    fn set_graphics_rotation(&mut self, _handle: NativeHandle, _rotation: RotationTransform) {}

    fn set_graphics_window_transform(&mut self, _handle: NativeHandle, _angle: i32) {}

    fn window_rotation_completed(
        &mut self,
        _handle: NativeHandle,
        _angle: i32,
        _width: u32,
        _height: u32,
    ) {
    }

    /// Damage notification used when no render notification is installed
    fn post_damage(&mut self, _handle: NativeHandle, _geometry: &PositionSize) {}

    /// Called after the graphics layer swapped `handle`
    fn present(&mut self, _handle: NativeHandle) {}

    /// Buffer queue of a native-queue surface
    fn buffer_queue(&self) -> Option<Arc<BufferQueue>> {
        None
    }
}
