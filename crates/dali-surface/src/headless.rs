//! In-process graphics and window-system doubles
//!
//! Nothing is drawn. Every native call is counted in a shared [`CallLog`]
//! so tests and the bench tool can check what a surface asked for.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;

use dali_adaptor_core::{ColorDepth, Dpi, PositionSize, SurfaceError, SurfaceResult};
use parking_lot::Mutex;

use crate::backend::{RotationTransform, SurfaceBackend, SurfaceType};
use crate::buffer_queue::BufferQueue;
use crate::graphics::{
    GraphicsCapabilities, GraphicsInterface, GraphicsSurface, NativeHandle, NativeKind,
    Replacement,
};

/// Native queue depth, as on Tizen
pub const NATIVE_QUEUE_DEPTH: usize = 3;

/// Named call counters
#[derive(Debug, Default)]
pub struct CallLog {
    counts: Mutex<HashMap<&'static str, usize>>,
}

impl CallLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, call: &'static str) {
        *self.counts.lock().entry(call).or_insert(0) += 1;
    }

    pub fn count(&self, call: &str) -> usize {
        self.counts.lock().get(call).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.lock().values().sum()
    }

    pub fn reset(&self) {
        self.counts.lock().clear();
    }
}

/// Graphics layer that hands out surface ids and tracks the current one
pub struct HeadlessGraphics {
    log: Arc<CallLog>,
    capabilities: GraphicsCapabilities,
    next_surface: AtomicU64,
    live: Mutex<HashSet<GraphicsSurface>>,
    current: Mutex<Option<GraphicsSurface>>,
    fail_create: AtomicBool,
    lose_context_on_replace: AtomicBool,
}

impl HeadlessGraphics {
    pub fn new(log: Arc<CallLog>, capabilities: GraphicsCapabilities) -> Self {
        Self {
            log,
            capabilities,
            next_surface: AtomicU64::new(1),
            live: Mutex::new(HashSet::new()),
            current: Mutex::new(None),
            fail_create: AtomicBool::new(false),
            lose_context_on_replace: AtomicBool::new(false),
        }
    }

    pub fn current(&self) -> Option<GraphicsSurface> {
        *self.current.lock()
    }

    pub fn live_surfaces(&self) -> usize {
        self.live.lock().len()
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_lose_context_on_replace(&self, lose: bool) {
        self.lose_context_on_replace.store(lose, Ordering::SeqCst);
    }

    fn allocate(&self) -> GraphicsSurface {
        let surface = GraphicsSurface(self.next_surface.fetch_add(1, Ordering::Relaxed));
        self.live.lock().insert(surface);
        surface
    }
}

impl GraphicsInterface for HeadlessGraphics {
    fn capabilities(&self) -> GraphicsCapabilities {
        self.capabilities
    }

    fn choose_config(&self, _kind: NativeKind, _depth: ColorDepth) -> SurfaceResult<()> {
        self.log.record("choose_config");
        Ok(())
    }

    fn create_surface(
        &self,
        _native: NativeHandle,
        _kind: NativeKind,
        _depth: ColorDepth,
    ) -> SurfaceResult<GraphicsSurface> {
        self.log.record("create_surface");
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(SurfaceError::GraphicsSurface("headless failure".into()));
        }
        Ok(self.allocate())
    }

    fn replace_surface(
        &self,
        old: GraphicsSurface,
        _native: NativeHandle,
        _kind: NativeKind,
    ) -> SurfaceResult<Replacement> {
        self.log.record("replace_surface");
        self.live.lock().remove(&old);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(SurfaceError::GraphicsSurface("headless failure".into()));
        }
        Ok(Replacement {
            surface: self.allocate(),
            context_lost: self.lose_context_on_replace.load(Ordering::SeqCst),
        })
    }

    fn make_current(&self, surface: GraphicsSurface) {
        self.log.record("make_current");
        *self.current.lock() = Some(surface);
    }

    fn swap_buffers(&self, _surface: GraphicsSurface) {
        self.log.record("swap_buffers");
    }

    fn flush(&self) {
        self.log.record("flush");
    }

    fn destroy_surface(&self, surface: GraphicsSurface) {
        self.log.record("destroy_surface");
        self.live.lock().remove(&surface);
        let mut current = self.current.lock();
        if *current == Some(surface) {
            *current = None;
        }
    }
}

/// Window, pixmap or native-queue backend without a window system
pub struct HeadlessBackend {
    surface_type: SurfaceType,
    log: Arc<CallLog>,
    screen: (u32, u32),
    dpi: Dpi,
    rotation_supported: bool,
    screen_angle: Arc<AtomicI32>,
    next_handle: u64,
    queue: Option<Arc<BufferQueue>>,
    last_rotation: Option<RotationTransform>,
    completed_rotations: Vec<(i32, u32, u32)>,
}

impl HeadlessBackend {
    fn with_type(surface_type: SurfaceType, log: Arc<CallLog>) -> Self {
        Self {
            surface_type,
            log,
            screen: (1920, 1080),
            dpi: Dpi::new(96, 96),
            rotation_supported: false,
            screen_angle: Arc::new(AtomicI32::new(0)),
            next_handle: 0x100,
            queue: None,
            last_rotation: None,
            completed_rotations: Vec::new(),
        }
    }

    pub fn window(log: Arc<CallLog>) -> Self {
        Self::with_type(SurfaceType::Window, log)
    }

    pub fn pixmap(log: Arc<CallLog>) -> Self {
        Self::with_type(SurfaceType::Pixmap, log)
    }

    pub fn native_queue(log: Arc<CallLog>) -> Self {
        Self::with_type(SurfaceType::NativeQueue, log)
    }

    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen = (width, height);
        self
    }

    pub fn with_dpi(mut self, dpi: Dpi) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_rotation_support(mut self, supported: bool) -> Self {
        self.rotation_supported = supported;
        self
    }

    /// Shared screen rotation, changed by tests to simulate the output
    pub fn screen_angle(&self) -> Arc<AtomicI32> {
        Arc::clone(&self.screen_angle)
    }

    pub fn last_rotation(&self) -> Option<RotationTransform> {
        self.last_rotation
    }

    pub fn completed_rotations(&self) -> &[(i32, u32, u32)] {
        &self.completed_rotations
    }
}

impl SurfaceBackend for HeadlessBackend {
    fn surface_type(&self) -> SurfaceType {
        self.surface_type
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    fn dpi(&self) -> Dpi {
        self.dpi
    }

    fn create_native_handle(
        &mut self,
        geometry: &PositionSize,
        _depth: ColorDepth,
        _index: usize,
    ) -> SurfaceResult<NativeHandle> {
        self.log.record("create_native_handle");
        if self.surface_type == SurfaceType::NativeQueue {
            self.queue = Some(Arc::new(BufferQueue::new(
                NATIVE_QUEUE_DEPTH,
                geometry.width as u32,
                geometry.height as u32,
            )));
        }
        self.next_handle += 1;
        Ok(NativeHandle(self.next_handle))
    }

    fn destroy_native_handle(&mut self, _handle: NativeHandle) {
        self.log.record("destroy_native_handle");
    }

    fn set_transparency(&mut self, _handle: NativeHandle, _transparent: bool) {
        self.log.record("set_transparency");
    }

    fn create_graphics_window(&mut self, _handle: NativeHandle, _width: u32, _height: u32) {
        self.log.record("create_graphics_window");
    }

    fn destroy_graphics_window(&mut self, _handle: NativeHandle) {
        self.log.record("destroy_graphics_window");
    }

    fn resize_graphics_window(&mut self, _handle: NativeHandle, _width: u32, _height: u32) {
        self.log.record("resize_graphics_window");
    }

    fn move_window(&mut self, _handle: NativeHandle, _geometry: &PositionSize) {
        self.log.record("move");
    }

    fn resize_window(&mut self, _handle: NativeHandle, _geometry: &PositionSize) {
        self.log.record("resize");
    }

    fn move_resize_window(&mut self, _handle: NativeHandle, _geometry: &PositionSize) {
        self.log.record("move_resize");
    }

    fn rotation_supported(&self) -> bool {
        self.rotation_supported
    }

    fn screen_rotation_angle(&self) -> i32 {
        self.screen_angle.load(Ordering::SeqCst)
    }

    fn set_window_rotation_angle(&mut self, _handle: NativeHandle, _angle: i32) {
        self.log.record("set_window_rotation_angle");
    }

    fn set_graphics_rotation(&mut self, _handle: NativeHandle, rotation: RotationTransform) {
        self.log.record("set_graphics_rotation");
        self.last_rotation = Some(rotation);
    }

    fn set_graphics_window_transform(&mut self, _handle: NativeHandle, _angle: i32) {
        self.log.record("set_graphics_window_transform");
    }

    fn window_rotation_completed(
        &mut self,
        _handle: NativeHandle,
        angle: i32,
        width: u32,
        height: u32,
    ) {
        self.log.record("window_rotation_completed");
        self.completed_rotations.push((angle, width, height));
    }

    fn post_damage(&mut self, _handle: NativeHandle, _geometry: &PositionSize) {
        self.log.record("post_damage");
    }

    fn present(&mut self, _handle: NativeHandle) {
        self.log.record("present");
        // The driver renders into a dequeued slot and queues it on swap.
        if let Some(queue) = &self.queue {
            match queue.dequeue() {
                Some(id) => {
                    if let Err(err) = queue.enqueue(id) {
                        log::error!("Headless present failed: {}", err);
                    }
                }
                None => log::warn!("Headless present without a free buffer"),
            }
        }
    }

    fn buffer_queue(&self) -> Option<Arc<BufferQueue>> {
        self.queue.clone()
    }
}
