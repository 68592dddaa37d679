// this_file: crates/dali-surface/tests/render_surface.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dali_adaptor_core::{AdaptorConfig, Dpi, PositionSize, SurfaceError};
use dali_surface::headless::{CallLog, HeadlessBackend, HeadlessGraphics, NATIVE_QUEUE_DEPTH};
use dali_surface::{
    CallbackTrigger, GraphicsCapabilities, GraphicsInterface, GraphicsSurface, NativeHandle,
    PostRenderSync, RenderSurface, SlotState, SurfaceBackend, SurfaceState, SurfaceType,
    ThreadSynchronization, TriggerEvent,
};

fn geometry(width: f32, height: f32) -> PositionSize {
    PositionSize::new(0.0, 0.0, width, height)
}

fn graphics(log: &Arc<CallLog>, window_rotation: bool) -> Arc<HeadlessGraphics> {
    Arc::new(HeadlessGraphics::new(
        Arc::clone(log),
        GraphicsCapabilities { window_rotation },
    ))
}

fn ready_surface(
    backend: HeadlessBackend,
    graphics: &Arc<HeadlessGraphics>,
    config: &AdaptorConfig,
) -> RenderSurface<HeadlessBackend> {
    let mut surface = RenderSurface::new(backend, geometry(800.0, 600.0), false, config).unwrap();
    surface.initialize_graphics(graphics.clone()).unwrap();
    surface.create_surface().unwrap();
    surface
}

fn counting_trigger() -> (Arc<dyn TriggerEvent>, Arc<AtomicUsize>) {
    let fired = Arc::new(AtomicUsize::new(0));
    let trigger: Arc<dyn TriggerEvent> = {
        let fired = Arc::clone(&fired);
        Arc::new(CallbackTrigger::new(move || {
            fired.fetch_add(1, Ordering::SeqCst);
        }))
    };
    (trigger, fired)
}

#[test]
fn test_lifecycle_transitions_are_enforced() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = RenderSurface::new(
        HeadlessBackend::window(log.clone()),
        geometry(800.0, 600.0),
        false,
        &AdaptorConfig::default(),
    )
    .unwrap();

    assert_eq!(surface.state(), SurfaceState::Uninitialized);
    assert!(matches!(
        surface.create_surface(),
        Err(SurfaceError::InvalidState { operation: "create_surface", .. })
    ));
    assert!(!surface.pre_render(false));

    surface.initialize_graphics(graphics.clone()).unwrap();
    assert_eq!(surface.state(), SurfaceState::GraphicsReady);
    assert!(surface.initialize_graphics(graphics.clone()).is_err());

    surface.create_surface().unwrap();
    assert_eq!(surface.state(), SurfaceState::SurfaceReady);
    assert!(surface.post_render(false, false).is_err());

    assert!(surface.pre_render(false));
    assert_eq!(surface.state(), SurfaceState::Rendering);
    surface.post_render(false, false).unwrap();
    assert_eq!(surface.state(), SurfaceState::SurfaceReady);
    assert_eq!(log.count("swap_buffers"), 1);

    surface.destroy_surface().unwrap();
    assert_eq!(surface.state(), SurfaceState::SurfaceDestroyed);
    assert_eq!(graphics.live_surfaces(), 0);
    assert!(!surface.pre_render(false));

    surface.create_surface().unwrap();
    assert_eq!(surface.state(), SurfaceState::SurfaceReady);
    assert_eq!(graphics.live_surfaces(), 1);
}

#[test]
fn test_transparent_surface_uses_32_bit_depth() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = RenderSurface::new(
        HeadlessBackend::window(log.clone()),
        geometry(100.0, 100.0),
        true,
        &AdaptorConfig::default(),
    )
    .unwrap();
    surface.initialize_graphics(graphics).unwrap();
    surface.create_surface().unwrap();

    assert_eq!(surface.color_depth().bits(), 32);
    assert_eq!(log.count("set_transparency"), 1);
    surface.set_transparency(false);
    assert_eq!(log.count("set_transparency"), 2);
}

#[test]
fn test_graphics_failure_leaves_surface_recreatable() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = RenderSurface::new(
        HeadlessBackend::window(log.clone()),
        geometry(100.0, 100.0),
        false,
        &AdaptorConfig::default(),
    )
    .unwrap();
    surface.initialize_graphics(graphics.clone()).unwrap();

    graphics.set_fail_create(true);
    assert!(matches!(surface.create_surface(), Err(SurfaceError::GraphicsSurface(_))));
    assert_eq!(surface.state(), SurfaceState::GraphicsReady);
    assert_eq!(log.count("destroy_graphics_window"), 1);

    graphics.set_fail_create(false);
    surface.create_surface().unwrap();
}

#[test]
fn test_zero_sized_window_becomes_full_screen() {
    let log = CallLog::new();
    let backend = HeadlessBackend::window(log.clone()).with_screen(720, 1280);
    let surface = RenderSurface::new(
        backend,
        PositionSize::new(10.0, 20.0, 0.0, 300.0),
        false,
        &AdaptorConfig::default(),
    )
    .unwrap();
    assert_eq!(surface.position_size(), geometry(720.0, 1280.0));

    let config = AdaptorConfig {
        default_window_size: Some((480, 800)),
        ..AdaptorConfig::default()
    };
    let surface = RenderSurface::new(
        HeadlessBackend::window(log.clone()),
        geometry(0.0, 0.0),
        false,
        &config,
    )
    .unwrap();
    assert_eq!(surface.position_size(), geometry(480.0, 800.0));
}

#[test]
fn test_empty_offscreen_surfaces_are_rejected() {
    let log = CallLog::new();
    let result = RenderSurface::new(
        HeadlessBackend::pixmap(log.clone()),
        geometry(0.0, 64.0),
        false,
        &AdaptorConfig::default(),
    );
    assert!(matches!(result, Err(SurfaceError::InvalidSize { .. })));
    assert_eq!(log.count("create_native_handle"), 0);

    let result = RenderSurface::new(
        HeadlessBackend::native_queue(log.clone()),
        geometry(64.0, 0.0),
        false,
        &AdaptorConfig::default(),
    );
    assert!(result.is_err());
}

#[test]
fn test_scenario_c_sub_pixel_move_issues_no_native_call() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let surface = ready_surface(
        HeadlessBackend::window(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );

    surface.move_resize(PositionSize::new(0.5, 0.0, 800.0, 600.0));
    assert_eq!(log.count("move"), 0);
    assert_eq!(log.count("resize"), 0);
    assert_eq!(log.count("move_resize"), 0);

    // Exactly one pixel is still under the threshold.
    surface.move_resize(PositionSize::new(0.0, 1.0, 801.0, 600.0));
    assert_eq!(log.count("move") + log.count("resize") + log.count("move_resize"), 0);
}

#[test]
fn test_move_and_resize_reach_the_window_system() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = ready_surface(
        HeadlessBackend::window(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );

    surface.move_resize(PositionSize::new(10.0, 0.0, 800.0, 600.0));
    assert_eq!(log.count("move"), 1);
    assert_eq!(surface.position_size().x, 10.0);

    surface.move_resize(PositionSize::new(10.0, 0.0, 1024.0, 600.0));
    assert_eq!(log.count("resize"), 1);

    surface.move_resize(PositionSize::new(50.0, 50.0, 640.0, 480.0));
    assert_eq!(log.count("move_resize"), 1);

    // The graphics window follows on the next resizing frame only.
    assert!(surface.pre_render(false));
    surface.post_render(false, false).unwrap();
    assert_eq!(log.count("resize_graphics_window"), 0);

    assert!(surface.pre_render(true));
    surface.post_render(false, true).unwrap();
    assert!(surface.pre_render(true));
    surface.post_render(false, true).unwrap();
    assert_eq!(log.count("resize_graphics_window"), 1);
}

#[test]
fn test_rotation_is_ignored_without_support() {
    let log = CallLog::new();
    let graphics = graphics(&log, true);
    let surface = ready_surface(
        HeadlessBackend::window(log.clone()).with_rotation_support(false),
        &graphics,
        &AdaptorConfig::default(),
    );

    assert!(!surface.rotation_supported());
    surface.request_rotation(90, 600, 800);
    assert_eq!(log.count("set_window_rotation_angle"), 0);
    assert_eq!(surface.rotation().window_angle, 0);
}

#[test]
fn test_rotation_needs_graphics_capability() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let surface = ready_surface(
        HeadlessBackend::window(log.clone()).with_rotation_support(true),
        &graphics,
        &AdaptorConfig::default(),
    );
    assert!(!surface.rotation_supported());
}

#[test]
fn test_rotation_completes_through_event_trigger() {
    let log = CallLog::new();
    let graphics = graphics(&log, true);
    let mut surface = ready_surface(
        HeadlessBackend::window(log.clone()).with_rotation_support(true),
        &graphics,
        &AdaptorConfig::default(),
    );
    let sync = Arc::new(PostRenderSync::new());
    surface.set_thread_synchronization(&sync);

    let consumer = surface.consumer();
    let trigger: Arc<dyn TriggerEvent> = Arc::new(CallbackTrigger::new(move || {
        consumer.process_rotation_request();
    }));
    surface.set_rotation_trigger(Some(trigger));

    surface.request_rotation(90, 600, 800);
    assert_eq!(log.count("set_window_rotation_angle"), 1);
    assert_eq!(surface.position_size(), geometry(600.0, 800.0));

    assert!(surface.pre_render(true));
    assert_eq!(log.count("set_graphics_rotation"), 1);
    assert_eq!(log.count("set_graphics_window_transform"), 1);
    let rotation = surface.with_backend(|backend| backend.last_rotation()).unwrap();
    assert_eq!(rotation.total(), 90);

    surface.post_render(false, true).unwrap();
    assert_eq!(sync.completed_frames(), 1);
    let completed = surface.with_backend(|backend| backend.completed_rotations().to_vec());
    assert_eq!(completed, vec![(90, 600, 800)]);

    // Nothing is pending any more.
    assert!(surface.pre_render(true));
    surface.post_render(false, true).unwrap();
    assert_eq!(log.count("set_graphics_rotation"), 1);
    assert_eq!(log.count("window_rotation_completed"), 1);
}

#[test]
fn test_rotation_waits_for_event_thread() {
    let log = CallLog::new();
    let graphics = graphics(&log, true);
    let mut surface = ready_surface(
        HeadlessBackend::window(log.clone()).with_rotation_support(true),
        &graphics,
        &AdaptorConfig::default(),
    );
    let sync = Arc::new(PostRenderSync::new());
    surface.set_thread_synchronization(&sync);

    let (sender, receiver) = std::sync::mpsc::channel::<()>();
    let trigger: Arc<dyn TriggerEvent> = Arc::new(CallbackTrigger::new(move || {
        let _ = sender.send(());
    }));
    surface.set_rotation_trigger(Some(trigger));

    let consumer = surface.consumer();
    let event_thread = thread::spawn(move || {
        receiver.recv().unwrap();
        thread::sleep(Duration::from_millis(10));
        consumer.process_rotation_request();
    });

    surface.request_rotation(270, 600, 800);
    assert!(surface.pre_render(true));
    surface.post_render(false, true).unwrap();

    // post_render only returns once the event thread has acknowledged.
    assert_eq!(log.count("window_rotation_completed"), 1);
    event_thread.join().unwrap();
}

#[test]
fn test_rotation_without_trigger_completes_in_place() {
    let log = CallLog::new();
    let graphics = graphics(&log, true);
    let mut surface = ready_surface(
        HeadlessBackend::window(log.clone()).with_rotation_support(true),
        &graphics,
        &AdaptorConfig::default(),
    );

    surface.request_rotation(180, 800, 600);
    assert!(surface.pre_render(true));
    surface.post_render(false, true).unwrap();
    assert_eq!(log.count("window_rotation_completed"), 1);
}

#[test]
fn test_screen_rotation_is_applied_on_resizing_frames() {
    let log = CallLog::new();
    let graphics = graphics(&log, true);
    let backend = HeadlessBackend::window(log.clone()).with_rotation_support(true);
    let screen_angle = backend.screen_angle();
    screen_angle.store(90, Ordering::SeqCst);

    let mut surface = ready_surface(backend, &graphics, &AdaptorConfig::default());
    assert_eq!(surface.rotation().screen_angle, 90);

    assert!(surface.pre_render(true));
    surface.post_render(false, true).unwrap();
    assert_eq!(log.count("set_graphics_rotation"), 1);
    assert_eq!(log.count("set_graphics_window_transform"), 0);

    // Same angle: nothing to do.
    surface.consumer().output_transformed();
    assert!(surface.pre_render(true));
    surface.post_render(false, true).unwrap();
    assert_eq!(log.count("set_graphics_rotation"), 1);

    screen_angle.store(180, Ordering::SeqCst);
    surface.consumer().output_transformed();
    assert!(surface.pre_render(true));
    surface.post_render(false, true).unwrap();
    assert_eq!(log.count("set_graphics_rotation"), 2);
    let rotation = surface.with_backend(|backend| backend.last_rotation()).unwrap();
    assert_eq!(rotation.total(), 180);
}

#[test]
fn test_replace_reports_context_loss() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = ready_surface(
        HeadlessBackend::window(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    let before = surface.graphics_surfaces().to_vec();

    assert!(!surface.replace_graphics_surface().unwrap());
    assert_ne!(surface.graphics_surfaces(), before.as_slice());
    assert_eq!(log.count("destroy_graphics_window"), 1);
    assert_eq!(log.count("create_graphics_window"), 2);
    assert_eq!(graphics.live_surfaces(), 1);

    graphics.set_lose_context_on_replace(true);
    assert!(surface.replace_graphics_surface().unwrap());

    graphics.set_lose_context_on_replace(false);
    graphics.set_fail_create(true);
    assert!(surface.replace_graphics_surface().unwrap());
    assert_eq!(surface.state(), SurfaceState::SurfaceReady);
}

#[test]
fn test_replace_requires_a_surface() {
    let log = CallLog::new();
    let mut surface = RenderSurface::new(
        HeadlessBackend::pixmap(log.clone()),
        geometry(64.0, 64.0),
        false,
        &AdaptorConfig::default(),
    )
    .unwrap();
    assert!(surface.replace_graphics_surface().is_err());
}

#[test]
fn test_pixmap_flips_buffers_and_rebinds_context() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = ready_surface(
        HeadlessBackend::pixmap(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    let consumer = surface.consumer();
    let handles = surface.native_handles().to_vec();
    let surfaces = surface.graphics_surfaces().to_vec();
    assert_eq!(handles.len(), 2);

    let snapshot = consumer.buffer_snapshot();
    assert_eq!((snapshot.produce, snapshot.consume), (0, 1));
    assert_eq!(graphics.current(), Some(surfaces[0]));

    assert!(surface.pre_render(false));
    surface.post_render(false, false).unwrap();
    let snapshot = consumer.buffer_snapshot();
    assert_eq!((snapshot.produce, snapshot.consume), (1, 0));
    assert_eq!(consumer.current_surface(), handles[1]);
    assert_eq!(consumer.consumed_surface(), handles[0]);
    assert_eq!(graphics.current(), Some(surfaces[1]));
    assert_eq!(log.count("flush"), 1);
    assert_eq!(log.count("post_damage"), 1);

    assert!(surface.pre_render(false));
    surface.post_render(false, false).unwrap();
    assert_eq!(consumer.current_surface(), handles[0]);
    assert_eq!(graphics.current(), Some(surfaces[0]));
}

#[test]
fn test_render_notification_replaces_damage() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = ready_surface(
        HeadlessBackend::pixmap(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    let (trigger, fired) = counting_trigger();
    surface.set_render_notification(Some(trigger));

    for _ in 0..3 {
        assert!(surface.pre_render(false));
        surface.post_render(false, false).unwrap();
    }
    assert_eq!(fired.load(Ordering::SeqCst), 3);
    assert_eq!(log.count("post_damage"), 0);
}

#[test]
fn test_pixmap_move_resize_is_ignored() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let surface = ready_surface(
        HeadlessBackend::pixmap(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    surface.move_resize(PositionSize::new(100.0, 100.0, 10.0, 10.0));
    assert_eq!(surface.position_size(), geometry(800.0, 600.0));
}

#[test]
fn test_make_context_current_targets_produce_buffer() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = ready_surface(
        HeadlessBackend::pixmap(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    assert!(surface.pre_render(false));
    surface.post_render(false, false).unwrap();

    graphics.make_current(GraphicsSurface(999));
    surface.make_context_current().unwrap();
    assert_eq!(graphics.current(), Some(surface.graphics_surfaces()[1]));
}

#[test]
fn test_dpi_comes_from_backend() {
    let log = CallLog::new();
    let backend = HeadlessBackend::window(log.clone()).with_dpi(Dpi::new(220, 218));
    let surface = RenderSurface::new(
        backend,
        geometry(10.0, 10.0),
        false,
        &AdaptorConfig::default(),
    )
    .unwrap();
    assert_eq!(surface.dpi(), Dpi::new(220, 218));
    assert_eq!(surface.surface_type(), SurfaceType::Window);
}

#[test]
fn test_native_queue_hands_buffer_to_event_thread() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = ready_surface(
        HeadlessBackend::native_queue(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    let queue = surface.with_backend(|backend| backend.buffer_queue()).unwrap();
    assert_eq!(queue.capacity(), NATIVE_QUEUE_DEPTH);

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let consumer = surface.consumer();
    let notification: Arc<dyn TriggerEvent> = {
        let seen = Arc::clone(&seen);
        Arc::new(CallbackTrigger::new(move || {
            seen.lock().push(consumer.current_drawable());
        }))
    };
    surface.set_render_notification(Some(notification));

    for _ in 0..4 {
        assert!(surface.pre_render(false));
        surface.post_render(false, false).unwrap();
    }

    let seen = seen.lock();
    assert_eq!(seen.len(), 4);
    assert!(seen.iter().all(Option::is_some));
    assert_eq!(surface.consumer().current_drawable(), None);
    assert_eq!(queue.free_count(), NATIVE_QUEUE_DEPTH);
}

#[test]
fn test_native_queue_discards_stale_frame_when_full() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let config = AdaptorConfig {
        native_buffer_wait: Duration::from_millis(10),
        ..AdaptorConfig::default()
    };
    let mut surface = ready_surface(HeadlessBackend::native_queue(log.clone()), &graphics, &config);
    let queue = surface.with_backend(|backend| backend.buffer_queue()).unwrap();

    let held: Vec<_> = (0..NATIVE_QUEUE_DEPTH).map(|_| queue.dequeue().unwrap()).collect();
    assert!(!surface.pre_render(false));
    assert_eq!(surface.state(), SurfaceState::SurfaceReady);

    queue.enqueue(held[0]).unwrap();
    assert!(surface.pre_render(false));
    assert_eq!(queue.slot_state(held[0]), Some(SlotState::Free));
}

#[test]
fn test_native_move_resize_resets_queue() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let surface = ready_surface(
        HeadlessBackend::native_queue(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    let queue = surface.with_backend(|backend| backend.buffer_queue()).unwrap();
    queue.dequeue().unwrap();

    surface.move_resize(geometry(320.0, 200.0));
    assert_eq!(queue.size(), (320, 200));
    assert_eq!(queue.free_count(), NATIVE_QUEUE_DEPTH);
}

#[test]
fn test_native_resize_during_hand_off_drops_the_drawable() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = ready_surface(
        HeadlessBackend::native_queue(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    let queue = surface.with_backend(|backend| backend.buffer_queue()).unwrap();

    // The event thread resizes while it still holds the first frame.
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let consumer = surface.consumer();
    let notification: Arc<dyn TriggerEvent> = {
        let seen = Arc::clone(&seen);
        Arc::new(CallbackTrigger::new(move || {
            let mut seen = seen.lock();
            let held = consumer.current_drawable();
            if seen.is_empty() {
                consumer.move_resize(geometry(320.0, 200.0));
            }
            seen.push((held, consumer.current_drawable()));
        }))
    };
    surface.set_render_notification(Some(notification));

    for _ in 0..3 {
        assert!(surface.pre_render(false));
        surface.post_render(false, false).unwrap();
    }

    let seen = seen.lock();
    assert!(seen[0].0.is_some());
    assert_eq!(seen[0].1, None);
    assert!(seen[1..].iter().all(|(held, after)| held.is_some() && held == after));
    assert_eq!(queue.size(), (320, 200));
    assert_eq!(queue.free_count(), NATIVE_QUEUE_DEPTH);
}

#[test]
fn test_replacing_frame_wakes_surface_replacement_waiter() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = ready_surface(
        HeadlessBackend::native_queue(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    let (notification, fired) = counting_trigger();
    surface.set_render_notification(Some(notification));

    let consumer = surface.consumer();
    assert!(!consumer.wait_until_surface_replaced(Some(Duration::from_millis(5))));

    let waiter = thread::spawn(move || consumer.wait_until_surface_replaced(None));
    thread::sleep(Duration::from_millis(10));
    assert!(surface.pre_render(false));
    surface.post_render(true, false).unwrap();

    assert!(waiter.join().unwrap());
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stop_render_releases_blocked_waiter() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = ready_surface(
        HeadlessBackend::pixmap(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    let sync = Arc::new(PostRenderSync::new());
    surface.set_thread_synchronization(&sync);

    sync.post_render_started();
    let waiter = {
        let sync = Arc::clone(&sync);
        thread::spawn(move || sync.post_render_wait_for_completion())
    };
    thread::sleep(Duration::from_millis(10));
    surface.stop_render();
    waiter.join().unwrap();
    assert!(!sync.is_post_rendering());
}

#[test]
fn test_dropped_thread_sync_is_not_kept_alive() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let mut surface = ready_surface(
        HeadlessBackend::pixmap(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    let sync = Arc::new(PostRenderSync::new());
    surface.set_thread_synchronization(&sync);
    drop(sync);

    assert!(surface.pre_render(false));
    surface.post_render(false, false).unwrap();
}

#[test]
fn test_owned_handles_are_destroyed_on_drop() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let surface = ready_surface(
        HeadlessBackend::pixmap(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    assert!(surface.is_own_surface());
    drop(surface);

    assert_eq!(log.count("destroy_native_handle"), 2);
    assert_eq!(graphics.live_surfaces(), 0);
}

#[test]
fn test_external_handles_survive_drop() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let handles = vec![NativeHandle(7), NativeHandle(8)];
    let mut surface = RenderSurface::from_native_handles(
        HeadlessBackend::pixmap(log.clone()),
        geometry(64.0, 64.0),
        false,
        handles.clone(),
        &AdaptorConfig::default(),
    )
    .unwrap();
    assert!(!surface.is_own_surface());
    assert_eq!(surface.native_handles(), handles.as_slice());

    surface.initialize_graphics(graphics.clone()).unwrap();
    surface.create_surface().unwrap();
    drop(surface);

    assert_eq!(log.count("create_native_handle"), 0);
    assert_eq!(log.count("destroy_native_handle"), 0);
    assert_eq!(graphics.live_surfaces(), 0);
}

#[test]
fn test_external_handle_count_must_match() {
    let log = CallLog::new();
    let result = RenderSurface::from_native_handles(
        HeadlessBackend::pixmap(log),
        geometry(64.0, 64.0),
        false,
        vec![NativeHandle(1)],
        &AdaptorConfig::default(),
    );
    assert!(matches!(result, Err(SurfaceError::NativeCreation { .. })));
}

#[test]
fn test_drop_closes_native_queue() {
    let log = CallLog::new();
    let graphics = graphics(&log, false);
    let surface = ready_surface(
        HeadlessBackend::native_queue(log.clone()),
        &graphics,
        &AdaptorConfig::default(),
    );
    let queue = surface.with_backend(|backend| backend.buffer_queue()).unwrap();
    drop(surface);
    assert!(queue.is_closed());
    assert!(!queue.can_dequeue(Some(Duration::from_millis(1))));
}
