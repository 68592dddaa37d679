//! Render surfaces for the DALi adaptor
//!
//! A [`RenderSurface`] binds a native window, pixmap pair or buffer queue
//! to a graphics surface and runs the per-frame present protocol between
//! the render thread and the event thread.
//!
//! ```
//! use std::sync::Arc;
//!
//! use dali_adaptor_core::{AdaptorConfig, PositionSize};
//! use dali_surface::headless::{CallLog, HeadlessBackend, HeadlessGraphics};
//! use dali_surface::{GraphicsCapabilities, RenderSurface};
//!
//! let log = CallLog::new();
//! let capabilities = GraphicsCapabilities::default();
//! let graphics = Arc::new(HeadlessGraphics::new(log.clone(), capabilities));
//! let backend = HeadlessBackend::pixmap(log.clone());
//! let geometry = PositionSize::new(0.0, 0.0, 320.0, 240.0);
//!
//! let mut surface = RenderSurface::new(backend, geometry, false, &AdaptorConfig::default())?;
//! surface.initialize_graphics(graphics)?;
//! surface.create_surface()?;
//!
//! assert!(surface.pre_render(false));
//! surface.post_render(false, false)?;
//! assert_eq!(log.count("post_damage"), 1);
//! # Ok::<(), dali_adaptor_core::SurfaceError>(())
//! ```

pub mod backend;
pub mod buffer_queue;
pub mod graphics;
pub mod headless;
pub mod surface;
pub mod sync;

pub use backend::{RotationTransform, SurfaceBackend, SurfaceType};
pub use buffer_queue::{BufferId, BufferQueue, SlotState};
pub use graphics::{
    GraphicsCapabilities, GraphicsInterface, GraphicsSurface, NativeHandle, NativeKind,
    Replacement,
};
pub use surface::{
    BufferSnapshot, RenderSurface, SurfaceConsumer, SurfaceState, MINIMUM_DIMENSION_CHANGE,
};
pub use sync::{CallbackTrigger, PostRenderSync, ThreadSynchronization, TriggerEvent};
