//! Graphics (EGL-shaped) capability set
//!
//! Surfaces never talk to a graphics API directly. They hold an
//! [`GraphicsInterface`] shared with the rest of the adaptor and ask it for
//! presentable surfaces bound to their native handles.

use dali_adaptor_core::{ColorDepth, SurfaceResult};

/// Window-system handle: a window, pixmap or buffer queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub u64);

/// Graphics-level surface bound to a native handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphicsSurface(pub u64);

/// What kind of native object a graphics surface is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Window,
    Pixmap,
}

/// Optional features detected once when the graphics layer starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphicsCapabilities {
    /// Pre-rotated window buffers are supported
    pub window_rotation: bool,
}

/// Result of replacing a graphics surface in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replacement {
    pub surface: GraphicsSurface,
    /// The context has to be rebuilt by the caller
    pub context_lost: bool,
}

pub trait GraphicsInterface: Send + Sync {
    fn capabilities(&self) -> GraphicsCapabilities;

    /// Pick a framebuffer configuration for the surface kind and depth
    fn choose_config(&self, kind: NativeKind, depth: ColorDepth) -> SurfaceResult<()>;

    fn create_surface(
        &self,
        native: NativeHandle,
        kind: NativeKind,
        depth: ColorDepth,
    ) -> SurfaceResult<GraphicsSurface>;

    /// Destroy `old` and bind a new surface to `native`
    fn replace_surface(
        &self,
        old: GraphicsSurface,
        native: NativeHandle,
        kind: NativeKind,
    ) -> SurfaceResult<Replacement>;

    fn make_current(&self, surface: GraphicsSurface);

    fn swap_buffers(&self, surface: GraphicsSurface);

    /// Flush queued rendering without presenting
    fn flush(&self);

    fn destroy_surface(&self, surface: GraphicsSurface);
}
