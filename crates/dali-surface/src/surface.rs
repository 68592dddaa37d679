// this_file: crates/dali-surface/src/surface.rs

//! Render surface present state machine
//!
//! One [`RenderSurface`] drives every surface kind through
//! `initialize_graphics -> create_surface -> (pre_render, post_render)* ->
//! destroy_surface`. What a present means is decided by the backend's
//! [`SurfaceType`]:
//!
//! - windows swap, then apply pending rotation and resize on the next
//!   resizing frame,
//! - pixmaps flip a produce/consume index pair under a lock,
//! - native queues hand the presented buffer to the event thread and take
//!   it back after the rendezvous.
//!
//! The render thread owns the `RenderSurface`. The event thread works
//! through a [`SurfaceConsumer`], which shares the locked state.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dali_adaptor_core::{AdaptorConfig, ColorDepth, Dpi, PositionSize, SurfaceError, SurfaceResult};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::backend::{RotationTransform, SurfaceBackend, SurfaceType};
use crate::buffer_queue::{BufferId, BufferQueue};
use crate::graphics::{GraphicsInterface, GraphicsSurface, NativeHandle};
use crate::sync::{ThreadSynchronization, TriggerEvent};

/// Smallest position or size change forwarded to the window system
pub const MINIMUM_DIMENSION_CHANGE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Uninitialized,
    GraphicsReady,
    SurfaceReady,
    Rendering,
    SurfaceDestroyed,
}

impl SurfaceState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::GraphicsReady => "graphics-ready",
            Self::SurfaceReady => "surface-ready",
            Self::Rendering => "rendering",
            Self::SurfaceDestroyed => "surface-destroyed",
        }
    }

    fn has_surface(self) -> bool {
        matches!(self, Self::SurfaceReady | Self::Rendering)
    }
}

/// Produce/consume indices and the produce handle, read atomically
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSnapshot {
    pub produce: usize,
    pub consume: usize,
    pub produce_handle: NativeHandle,
}

#[derive(Debug)]
struct BufferIndices {
    produce: usize,
    consume: usize,
}

#[derive(Debug)]
struct RotationState {
    window_angle: i32,
    screen_angle: i32,
    supported: bool,
    rotation_finished: bool,
    screen_rotation_finished: bool,
    resize_finished: bool,
}

impl RotationState {
    fn transform(&self) -> RotationTransform {
        RotationTransform {
            window_angle: self.window_angle,
            screen_angle: self.screen_angle,
        }
    }
}

#[derive(Debug, Default)]
struct DrawableState {
    consumed: Option<BufferId>,
    completed: bool,
}

// Lock order: rotation, backend, geometry, indices, drawable.
struct SurfaceShared<B> {
    surface_type: SurfaceType,
    natives: Vec<NativeHandle>,
    backend: Mutex<B>,
    geometry: Mutex<PositionSize>,
    indices: Mutex<BufferIndices>,
    rotation: Mutex<RotationState>,
    drawable: Mutex<DrawableState>,
    drawable_replaced: Condvar,
    thread_sync: RwLock<Option<Weak<dyn ThreadSynchronization>>>,
}

impl<B: SurfaceBackend> SurfaceShared<B> {
    fn primary(&self) -> NativeHandle {
        self.natives[0]
    }

    fn thread_sync(&self) -> Option<Arc<dyn ThreadSynchronization>> {
        self.thread_sync.read().as_ref().and_then(Weak::upgrade)
    }

    fn buffer_queue(&self) -> Option<Arc<BufferQueue>> {
        self.backend.lock().buffer_queue()
    }

    fn snapshot(&self) -> BufferSnapshot {
        let indices = self.indices.lock();
        BufferSnapshot {
            produce: indices.produce,
            consume: indices.consume,
            produce_handle: self.natives[indices.produce],
        }
    }

    fn release_lock(&self) {
        if let Some(sync) = self.thread_sync() {
            sync.post_render_complete();
        }
    }

    fn move_resize(&self, target: PositionSize) {
        match self.surface_type {
            SurfaceType::Pixmap => {
                log::trace!("Pixmap surfaces keep their geometry");
            }
            SurfaceType::NativeQueue => {
                let queue = self.buffer_queue();
                *self.geometry.lock() = target;
                if let Some(queue) = queue {
                    // The reset frees the drawable the event thread holds.
                    let mut drawable = self.drawable.lock();
                    drawable.consumed = None;
                    queue.reset(target.width as u32, target.height as u32);
                }
            }
            SurfaceType::Window => {
                let mut rotation = self.rotation.lock();
                let mut backend = self.backend.lock();
                let mut geometry = self.geometry.lock();

                let needs_resize = (geometry.width - target.width).abs() > MINIMUM_DIMENSION_CHANGE
                    || (geometry.height - target.height).abs() > MINIMUM_DIMENSION_CHANGE;
                let needs_move = (geometry.x - target.x).abs() > MINIMUM_DIMENSION_CHANGE
                    || (geometry.y - target.y).abs() > MINIMUM_DIMENSION_CHANGE;

                let handle = self.primary();
                if needs_resize {
                    if needs_move {
                        backend.move_resize_window(handle, &target);
                    } else {
                        backend.resize_window(handle, &target);
                    }
                    rotation.resize_finished = false;
                    *geometry = target;
                } else if needs_move {
                    backend.move_window(handle, &target);
                    *geometry = target;
                }

                log::debug!(
                    "MoveResize: ({}, {}) {}x{}, resize {}, move {}",
                    target.x,
                    target.y,
                    target.width,
                    target.height,
                    needs_resize,
                    needs_move
                );
            }
        }
    }

    fn request_rotation(&self, angle: i32, width: u32, height: u32) {
        let mut rotation = self.rotation.lock();
        if !rotation.supported {
            log::debug!("Window rotation is not supported, ignoring {} degrees", angle);
            return;
        }
        let mut backend = self.backend.lock();
        let mut geometry = self.geometry.lock();

        geometry.width = width as f32;
        geometry.height = height as f32;
        rotation.window_angle = angle;
        rotation.rotation_finished = false;
        backend.set_window_rotation_angle(self.primary(), angle);
        log::debug!("Rotation requested: {} degrees, {}x{}", angle, width, height);
    }

    fn output_transformed(&self) {
        let mut rotation = self.rotation.lock();
        let angle = self.backend.lock().screen_rotation_angle();
        if angle != rotation.screen_angle {
            rotation.screen_angle = angle;
            rotation.screen_rotation_finished = false;
            log::debug!("Screen rotation changed to {} degrees", angle);
        }
    }

    fn process_rotation_request(&self) {
        let angle = {
            let mut rotation = self.rotation.lock();
            rotation.rotation_finished = true;
            rotation.window_angle
        };
        let geometry = *self.geometry.lock();
        self.backend.lock().window_rotation_completed(
            self.primary(),
            angle,
            geometry.width as u32,
            geometry.height as u32,
        );
        self.release_lock();
    }

    fn wait_until_surface_replaced(&self, timeout: Option<Duration>) -> bool {
        let mut drawable = self.drawable.lock();
        while !drawable.completed {
            match timeout {
                Some(timeout) => {
                    if self.drawable_replaced.wait_for(&mut drawable, timeout).timed_out() {
                        break;
                    }
                }
                None => self.drawable_replaced.wait(&mut drawable),
            }
        }
        let completed = drawable.completed;
        drawable.completed = false;
        completed
    }
}

/// Event-thread view of a render surface
pub struct SurfaceConsumer<B> {
    shared: Arc<SurfaceShared<B>>,
}

impl<B> Clone for SurfaceConsumer<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B: SurfaceBackend> SurfaceConsumer<B> {
    /// Native handle the render thread is drawing into
    pub fn current_surface(&self) -> NativeHandle {
        self.shared.snapshot().produce_handle
    }

    /// Native handle last presented, for pixmap consumers
    pub fn consumed_surface(&self) -> NativeHandle {
        let indices = self.shared.indices.lock();
        self.shared.natives[indices.consume]
    }

    pub fn buffer_snapshot(&self) -> BufferSnapshot {
        self.shared.snapshot()
    }

    /// Buffer presented by the current frame of a native-queue surface
    pub fn current_drawable(&self) -> Option<BufferId> {
        self.shared.drawable.lock().consumed
    }

    /// Block until a frame rendered while replacing the surface has been
    /// presented; returns false on timeout
    pub fn wait_until_surface_replaced(&self, timeout: Option<Duration>) -> bool {
        self.shared.wait_until_surface_replaced(timeout)
    }

    pub fn move_resize(&self, geometry: PositionSize) {
        self.shared.move_resize(geometry);
    }

    pub fn request_rotation(&self, angle: i32, width: u32, height: u32) {
        self.shared.request_rotation(angle, width, height);
    }

    /// Re-read the screen rotation after the output changed
    pub fn output_transformed(&self) {
        self.shared.output_transformed();
    }

    /// Finish a rotation on the event thread and release the render thread
    pub fn process_rotation_request(&self) {
        self.shared.process_rotation_request();
    }

    pub fn release_lock(&self) {
        self.shared.release_lock();
    }

    pub fn position_size(&self) -> PositionSize {
        *self.shared.geometry.lock()
    }
}

pub struct RenderSurface<B: SurfaceBackend> {
    shared: Arc<SurfaceShared<B>>,
    state: SurfaceState,
    depth: ColorDepth,
    own_surface: bool,
    graphics: Option<Arc<dyn GraphicsInterface>>,
    surfaces: Vec<GraphicsSurface>,
    render_notification: Option<Arc<dyn TriggerEvent>>,
    rotation_trigger: Option<Arc<dyn TriggerEvent>>,
    buffer_wait: Duration,
}

impl<B: SurfaceBackend> RenderSurface<B> {
    /// Create a surface that owns its native handles
    ///
    /// A window with a zero dimension becomes full screen, sized from the
    /// configuration or the backend's screen.
    pub fn new(
        mut backend: B,
        geometry: PositionSize,
        transparent: bool,
        config: &AdaptorConfig,
    ) -> SurfaceResult<Self> {
        let surface_type = backend.surface_type();
        let depth = ColorDepth::from_transparency(transparent);
        let geometry = resolve_geometry(&backend, surface_type, geometry, config);
        if geometry.is_empty() {
            return Err(SurfaceError::InvalidSize {
                width: geometry.width,
                height: geometry.height,
            });
        }

        let mut natives = Vec::with_capacity(surface_type.buffer_count());
        for index in 0..surface_type.buffer_count() {
            match backend.create_native_handle(&geometry, depth, index) {
                Ok(handle) => natives.push(handle),
                Err(err) => {
                    log::error!("Failed to create native handle {}: {}", index, err);
                    for handle in natives.drain(..) {
                        backend.destroy_native_handle(handle);
                    }
                    return Err(err);
                }
            }
        }

        Ok(Self::assemble(backend, geometry, depth, natives, true, config))
    }

    /// Wrap native handles created elsewhere; they are not destroyed on drop
    pub fn from_native_handles(
        backend: B,
        geometry: PositionSize,
        transparent: bool,
        handles: Vec<NativeHandle>,
        config: &AdaptorConfig,
    ) -> SurfaceResult<Self> {
        let surface_type = backend.surface_type();
        if handles.len() != surface_type.buffer_count() {
            log::error!(
                "{:?} surface needs {} native handles, got {}",
                surface_type,
                surface_type.buffer_count(),
                handles.len()
            );
            return Err(SurfaceError::NativeCreation {
                kind: "external handle set",
            });
        }
        let depth = ColorDepth::from_transparency(transparent);
        Ok(Self::assemble(backend, geometry, depth, handles, false, config))
    }

    fn assemble(
        backend: B,
        geometry: PositionSize,
        depth: ColorDepth,
        natives: Vec<NativeHandle>,
        own_surface: bool,
        config: &AdaptorConfig,
    ) -> Self {
        let surface_type = backend.surface_type();
        let screen_angle = match surface_type {
            SurfaceType::Window => backend.screen_rotation_angle(),
            _ => 0,
        };

        log::debug!(
            "{:?} surface ({}, {}) {}x{}, depth {}, own {}",
            surface_type,
            geometry.x,
            geometry.y,
            geometry.width,
            geometry.height,
            depth.bits(),
            own_surface
        );

        Self {
            shared: Arc::new(SurfaceShared {
                surface_type,
                natives,
                backend: Mutex::new(backend),
                geometry: Mutex::new(geometry),
                indices: Mutex::new(BufferIndices {
                    produce: 0,
                    consume: 1,
                }),
                rotation: Mutex::new(RotationState {
                    window_angle: 0,
                    screen_angle,
                    supported: false,
                    rotation_finished: true,
                    screen_rotation_finished: screen_angle == 0,
                    resize_finished: true,
                }),
                drawable: Mutex::new(DrawableState::default()),
                drawable_replaced: Condvar::new(),
                thread_sync: RwLock::new(None),
            }),
            state: SurfaceState::Uninitialized,
            depth,
            own_surface,
            graphics: None,
            surfaces: Vec::new(),
            render_notification: None,
            rotation_trigger: None,
            buffer_wait: config.native_buffer_wait,
        }
    }

    pub fn consumer(&self) -> SurfaceConsumer<B> {
        SurfaceConsumer {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn surface_type(&self) -> SurfaceType {
        self.shared.surface_type
    }

    pub fn color_depth(&self) -> ColorDepth {
        self.depth
    }

    pub fn is_own_surface(&self) -> bool {
        self.own_surface
    }

    pub fn native_handles(&self) -> &[NativeHandle] {
        &self.shared.natives
    }

    pub fn graphics_surfaces(&self) -> &[GraphicsSurface] {
        &self.surfaces
    }

    pub fn position_size(&self) -> PositionSize {
        *self.shared.geometry.lock()
    }

    pub fn rotation(&self) -> RotationTransform {
        self.shared.rotation.lock().transform()
    }

    pub fn rotation_supported(&self) -> bool {
        self.shared.rotation.lock().supported
    }

    pub fn dpi(&self) -> Dpi {
        self.shared.backend.lock().dpi()
    }

    /// Run `f` against the backend, for native calls outside the protocol
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut self.shared.backend.lock())
    }

    pub fn set_render_notification(&mut self, notification: Option<Arc<dyn TriggerEvent>>) {
        self.render_notification = notification;
    }

    /// Trigger whose receiver calls [`SurfaceConsumer::process_rotation_request`]
    pub fn set_rotation_trigger(&mut self, trigger: Option<Arc<dyn TriggerEvent>>) {
        self.rotation_trigger = trigger;
    }

    /// Install the rendezvous with the event thread; only a weak handle is kept
    pub fn set_thread_synchronization<S>(&mut self, sync: &Arc<S>)
    where
        S: ThreadSynchronization + 'static,
    {
        let weak = Arc::downgrade(sync);
        let weak: Weak<dyn ThreadSynchronization> = weak;
        *self.shared.thread_sync.write() = Some(weak);
    }

    fn invalid_state(&self, operation: &'static str) -> SurfaceError {
        log::error!("{} called in state {}", operation, self.state.as_str());
        SurfaceError::InvalidState {
            operation,
            state: self.state.as_str(),
        }
    }

    fn graphics(&self) -> SurfaceResult<Arc<dyn GraphicsInterface>> {
        self.graphics
            .clone()
            .ok_or(SurfaceError::GraphicsNotInitialized)
    }

    /// Window buffer size, swapped while the screen is rotated sideways
    fn window_buffer_size(&self, screen_angle: i32) -> (u32, u32) {
        let geometry = *self.shared.geometry.lock();
        let geometry = if screen_angle % 180 != 0 {
            geometry.swapped()
        } else {
            geometry
        };
        (geometry.width as u32, geometry.height as u32)
    }

    pub fn initialize_graphics(
        &mut self,
        graphics: Arc<dyn GraphicsInterface>,
    ) -> SurfaceResult<()> {
        if self.state != SurfaceState::Uninitialized {
            return Err(self.invalid_state("initialize_graphics"));
        }
        graphics.choose_config(self.surface_type().native_kind(), self.depth)?;
        self.graphics = Some(graphics);
        self.state = SurfaceState::GraphicsReady;
        Ok(())
    }

    pub fn create_surface(&mut self) -> SurfaceResult<()> {
        if !matches!(
            self.state,
            SurfaceState::GraphicsReady | SurfaceState::SurfaceDestroyed
        ) {
            return Err(self.invalid_state("create_surface"));
        }
        let graphics = self.graphics()?;
        let kind = self.surface_type().native_kind();

        match self.surface_type() {
            SurfaceType::Window => {
                let handle = self.shared.primary();
                let screen_angle = self.shared.rotation.lock().screen_angle;
                let (width, height) = self.window_buffer_size(screen_angle);
                self.shared
                    .backend
                    .lock()
                    .create_graphics_window(handle, width, height);

                let surface = match graphics.create_surface(handle, kind, self.depth) {
                    Ok(surface) => surface,
                    Err(err) => {
                        self.shared.backend.lock().destroy_graphics_window(handle);
                        return Err(err);
                    }
                };
                self.surfaces = vec![surface];

                let mut rotation = self.shared.rotation.lock();
                let mut backend = self.shared.backend.lock();
                rotation.supported =
                    backend.rotation_supported() && graphics.capabilities().window_rotation;
                backend.set_transparency(handle, self.depth.has_alpha());
            }
            SurfaceType::Pixmap => {
                let mut surfaces = Vec::with_capacity(self.shared.natives.len());
                for &handle in &self.shared.natives {
                    match graphics.create_surface(handle, kind, self.depth) {
                        Ok(surface) => surfaces.push(surface),
                        Err(err) => {
                            surfaces.drain(..).for_each(|s| graphics.destroy_surface(s));
                            return Err(err);
                        }
                    }
                }
                let produce = self.shared.indices.lock().produce;
                graphics.make_current(surfaces[produce]);
                self.surfaces = surfaces;
            }
            SurfaceType::NativeQueue => {
                let handle = self.shared.primary();
                self.surfaces = vec![graphics.create_surface(handle, kind, self.depth)?];
                self.shared
                    .backend
                    .lock()
                    .set_transparency(handle, self.depth.has_alpha());
            }
        }

        self.state = SurfaceState::SurfaceReady;
        log::debug!("{:?} surface created", self.surface_type());
        Ok(())
    }

    pub fn destroy_surface(&mut self) -> SurfaceResult<()> {
        if !self.state.has_surface() {
            return Err(self.invalid_state("destroy_surface"));
        }
        let graphics = self.graphics()?;

        self.release_drawable();
        for surface in self.surfaces.drain(..) {
            if self.shared.surface_type == SurfaceType::Pixmap {
                graphics.make_current(surface);
            }
            graphics.destroy_surface(surface);
        }
        if self.shared.surface_type == SurfaceType::Window {
            self.shared
                .backend
                .lock()
                .destroy_graphics_window(self.shared.primary());
        }

        self.state = SurfaceState::SurfaceDestroyed;
        log::debug!("{:?} surface destroyed", self.surface_type());
        Ok(())
    }

    /// Rebind the graphics surfaces to the existing native handles
    ///
    /// Returns true when the graphics context was lost and has to be
    /// rebuilt by the caller, including when the replacement failed.
    pub fn replace_graphics_surface(&mut self) -> SurfaceResult<bool> {
        if !self.state.has_surface() {
            return Err(self.invalid_state("replace_graphics_surface"));
        }
        let graphics = self.graphics()?;
        let kind = self.surface_type().native_kind();

        match self.surface_type() {
            SurfaceType::NativeQueue if self.shared.buffer_queue().is_none() => {
                log::error!("No buffer queue to replace the surface on");
                return Ok(false);
            }
            SurfaceType::Window => {
                let handle = self.shared.primary();
                let screen_angle = {
                    let mut rotation = self.shared.rotation.lock();
                    rotation.screen_rotation_finished = false;
                    rotation.screen_angle
                };
                let (width, height) = self.window_buffer_size(screen_angle);
                let mut backend = self.shared.backend.lock();
                backend.destroy_graphics_window(handle);
                backend.create_graphics_window(handle, width, height);
            }
            _ => {}
        }

        let mut context_lost = false;
        for (index, surface) in self.surfaces.iter_mut().enumerate() {
            match graphics.replace_surface(*surface, self.shared.natives[index], kind) {
                Ok(replacement) => {
                    *surface = replacement.surface;
                    context_lost |= replacement.context_lost;
                }
                Err(err) => {
                    log::error!("Failed to replace graphics surface {}: {}", index, err);
                    context_lost = true;
                }
            }
        }

        if self.surface_type() == SurfaceType::Pixmap {
            let produce = self.shared.indices.lock().produce;
            graphics.make_current(self.surfaces[produce]);
        }

        self.state = SurfaceState::SurfaceReady;
        Ok(context_lost)
    }

    pub fn start_render(&mut self) {
        log::trace!("start_render ({:?})", self.surface_type());
    }

    /// Gate a frame; false means the frame should be skipped
    pub fn pre_render(&mut self, resizing: bool) -> bool {
        if !self.state.has_surface() {
            log::warn!("pre_render called in state {}", self.state.as_str());
            return false;
        }

        let ready = match self.surface_type() {
            SurfaceType::Window => {
                if resizing {
                    self.apply_pending_geometry();
                }
                true
            }
            SurfaceType::Pixmap => true,
            SurfaceType::NativeQueue => self.wait_for_free_buffer(),
        };

        if ready {
            self.state = SurfaceState::Rendering;
        }
        ready
    }

    fn apply_pending_geometry(&self) {
        let handle = self.shared.primary();
        let mut rotation = self.shared.rotation.lock();
        let mut backend = self.shared.backend.lock();

        if !rotation.rotation_finished || !rotation.screen_rotation_finished {
            backend.set_graphics_rotation(handle, rotation.transform());
            rotation.screen_rotation_finished = true;
            log::debug!(
                "Set rotation [{}] [{}]",
                rotation.window_angle,
                rotation.screen_angle
            );
        }

        if !rotation.rotation_finished {
            backend.set_graphics_window_transform(handle, rotation.window_angle);
        }

        if !rotation.resize_finished {
            let geometry = *self.shared.geometry.lock();
            backend.resize_graphics_window(handle, geometry.width as u32, geometry.height as u32);
            rotation.resize_finished = true;
            log::debug!("Set resize {}x{}", geometry.width, geometry.height);
        }
    }

    fn wait_for_free_buffer(&self) -> bool {
        let Some(queue) = self.shared.buffer_queue() else {
            return true;
        };
        if queue.can_dequeue(Some(self.buffer_wait)) {
            return true;
        }
        if queue.is_closed() {
            log::debug!("Buffer queue closed, skipping frame");
            return false;
        }

        // Nothing free: drop the oldest presented frame so the producer can move on.
        if queue.can_acquire() {
            if let Some(stale) = queue.acquire() {
                log::debug!("Discarding stale buffer {}", stale);
                if let Err(err) = queue.release(stale) {
                    log::error!("Failed to release stale buffer: {}", err);
                }
            }
        }
        queue.can_dequeue(None)
    }

    /// Present the frame and rendezvous with the event thread
    ///
    /// `replacing` marks a frame rendered while the surface is being
    /// replaced; `resizing` lets a pending window rotation complete.
    pub fn post_render(&mut self, replacing: bool, resizing: bool) -> SurfaceResult<()> {
        if self.state != SurfaceState::Rendering {
            return Err(self.invalid_state("post_render"));
        }
        let graphics = self.graphics()?;

        let result = match self.surface_type() {
            SurfaceType::Window => {
                self.present_window(graphics.as_ref(), resizing);
                Ok(())
            }
            SurfaceType::Pixmap => {
                self.present_pixmap(graphics.as_ref());
                Ok(())
            }
            SurfaceType::NativeQueue => self.present_native(graphics.as_ref(), replacing),
        };

        self.state = SurfaceState::SurfaceReady;
        result
    }

    fn present_window(&self, graphics: &dyn GraphicsInterface, resizing: bool) {
        let rotation_pending = resizing && !self.shared.rotation.lock().rotation_finished;
        if rotation_pending {
            match &self.rotation_trigger {
                Some(trigger) => {
                    log::debug!("Trigger rotation event");
                    let sync = self.shared.thread_sync();
                    if let Some(sync) = &sync {
                        sync.post_render_started();
                    }
                    trigger.trigger();
                    if let Some(sync) = &sync {
                        sync.post_render_wait_for_completion();
                    }
                }
                None => {
                    log::warn!("No rotation trigger installed, completing rotation in place");
                    self.shared.process_rotation_request();
                }
            }
        }

        graphics.swap_buffers(self.surfaces[0]);
        self.shared.backend.lock().present(self.shared.primary());

        if let Some(notification) = &self.render_notification {
            notification.trigger();
        }
    }

    fn present_pixmap(&self, graphics: &dyn GraphicsInterface) {
        graphics.flush();

        let sync = self.shared.thread_sync();
        if let Some(sync) = &sync {
            sync.post_render_started();
        }

        let consumed = {
            let mut indices = self.shared.indices.lock();
            indices.consume = indices.produce;
            indices.produce ^= 1;
            graphics.make_current(self.surfaces[indices.produce]);
            indices.consume
        };

        let handle = self.shared.natives[consumed];
        {
            let mut backend = self.shared.backend.lock();
            backend.present(handle);
            if self.render_notification.is_none() {
                let geometry = *self.shared.geometry.lock();
                backend.post_damage(handle, &geometry);
            }
        }
        if let Some(notification) = &self.render_notification {
            notification.trigger();
        }

        if let Some(sync) = &sync {
            sync.post_render_wait_for_completion();
        }
    }

    fn present_native(
        &self,
        graphics: &dyn GraphicsInterface,
        replacing: bool,
    ) -> SurfaceResult<()> {
        graphics.swap_buffers(self.surfaces[0]);
        let queue = {
            let mut backend = self.shared.backend.lock();
            backend.present(self.shared.primary());
            backend.buffer_queue()
        };

        let sync = self.shared.thread_sync();
        if let Some(sync) = &sync {
            sync.post_render_started();
        }

        if let Some(queue) = &queue {
            // Acquire under the drawable lock so a concurrent reset sees the
            // slot either queued or recorded as consumed.
            let mut drawable = self.shared.drawable.lock();
            match queue.acquire() {
                Some(id) => {
                    if let Some(previous) = drawable.consumed.replace(id) {
                        queue.release(previous)?;
                    }
                }
                None => log::debug!("No presented buffer to acquire"),
            }
        }

        if replacing {
            let mut drawable = self.shared.drawable.lock();
            drawable.completed = true;
            self.shared.drawable_replaced.notify_all();
        } else if let Some(notification) = &self.render_notification {
            notification.trigger();
        }

        if let Some(sync) = &sync {
            sync.post_render_wait_for_completion();
        }

        self.release_drawable();
        Ok(())
    }

    fn release_drawable(&self) {
        let Some(queue) = self.shared.buffer_queue() else {
            return;
        };
        let mut drawable = self.shared.drawable.lock();
        let Some(id) = drawable.consumed.take() else {
            return;
        };
        if let Err(err) = queue.release(id) {
            log::error!("Failed to release drawable {}: {}", id, err);
        }
    }

    /// Stop rendering and release any thread blocked on this surface
    pub fn stop_render(&mut self) {
        log::trace!("stop_render ({:?})", self.surface_type());
        self.release_lock();
    }

    pub fn release_lock(&self) {
        self.shared.release_lock();
    }

    pub fn make_context_current(&self) -> SurfaceResult<()> {
        let graphics = self.graphics()?;
        let index = match self.surface_type() {
            SurfaceType::Pixmap => self.shared.indices.lock().produce,
            _ => 0,
        };
        let Some(&surface) = self.surfaces.get(index) else {
            return Err(self.invalid_state("make_context_current"));
        };
        graphics.make_current(surface);
        Ok(())
    }

    pub fn set_transparency(&self, transparent: bool) {
        let mut backend = self.shared.backend.lock();
        for &handle in &self.shared.natives {
            backend.set_transparency(handle, transparent);
        }
    }

    pub fn move_resize(&self, geometry: PositionSize) {
        self.shared.move_resize(geometry);
    }

    pub fn request_rotation(&self, angle: i32, width: u32, height: u32) {
        self.shared.request_rotation(angle, width, height);
    }

    pub fn current_surface(&self) -> NativeHandle {
        self.shared.snapshot().produce_handle
    }
}

impl<B: SurfaceBackend> Drop for RenderSurface<B> {
    fn drop(&mut self) {
        if self.state.has_surface() {
            if let Err(err) = self.destroy_surface() {
                log::error!("Failed to destroy surface on drop: {}", err);
            }
        }

        if !self.own_surface {
            log::debug!("Leaving external native handles alive");
            return;
        }
        let mut backend = self.shared.backend.lock();
        if let Some(queue) = backend.buffer_queue() {
            queue.close();
        }
        for &handle in &self.shared.natives {
            backend.destroy_native_handle(handle);
        }
    }
}

fn resolve_geometry<B: SurfaceBackend>(
    backend: &B,
    surface_type: SurfaceType,
    geometry: PositionSize,
    config: &AdaptorConfig,
) -> PositionSize {
    if surface_type != SurfaceType::Window || (geometry.width != 0.0 && geometry.height != 0.0) {
        return geometry;
    }
    let (width, height) = config
        .default_window_size
        .unwrap_or_else(|| backend.screen_size());
    log::debug!("Full screen window {}x{}", width, height);
    PositionSize::new(0.0, 0.0, width as f32, height as f32)
}
