//! Cross-thread rendezvous between the render and event threads
//!
//! The render thread brackets a present with [`post_render_started`] and
//! [`post_render_wait_for_completion`]; the event thread calls
//! [`post_render_complete`] once it has consumed the new frame.
//!
//! [`post_render_started`]: ThreadSynchronization::post_render_started
//! [`post_render_wait_for_completion`]: ThreadSynchronization::post_render_wait_for_completion
//! [`post_render_complete`]: ThreadSynchronization::post_render_complete

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

pub trait ThreadSynchronization: Send + Sync {
    fn post_render_started(&self);

    fn post_render_complete(&self);

    /// Block until the event thread has finished with the presented frame
    fn post_render_wait_for_completion(&self);
}

/// Fire-and-forget notification to another thread
pub trait TriggerEvent: Send + Sync {
    fn trigger(&self);
}

/// Trigger that runs a closure on the triggering thread
///
/// Forward to a channel inside the closure to hop threads.
pub struct CallbackTrigger<F> {
    callback: F,
}

impl<F> CallbackTrigger<F>
where
    F: Fn() + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> TriggerEvent for CallbackTrigger<F>
where
    F: Fn() + Send + Sync,
{
    fn trigger(&self) {
        (self.callback)();
    }
}

#[derive(Debug, Default)]
struct SyncState {
    post_rendering: bool,
    stopped: bool,
    completed_frames: u64,
}

/// [`ThreadSynchronization`] over a mutex and condition variable
///
/// [`stop`](PostRenderSync::stop) releases every waiter for good, so a
/// render thread can never block on an event thread that has exited.
#[derive(Debug, Default)]
pub struct PostRenderSync {
    state: Mutex<SyncState>,
    completed: Condvar,
}

impl PostRenderSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake all waiters and make further waits return immediately
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.stopped = true;
        self.completed.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    /// A frame is presented and waiting for the event thread
    pub fn is_post_rendering(&self) -> bool {
        self.state.lock().post_rendering
    }

    pub fn completed_frames(&self) -> u64 {
        self.state.lock().completed_frames
    }

    /// Like [`ThreadSynchronization::post_render_wait_for_completion`] but
    /// gives up after `timeout`; returns true if the frame completed
    pub fn wait_for_completion_timeout(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        while state.post_rendering && !state.stopped {
            if self.completed.wait_for(&mut state, timeout).timed_out() {
                break;
            }
        }
        !state.post_rendering || state.stopped
    }
}

impl ThreadSynchronization for PostRenderSync {
    fn post_render_started(&self) {
        self.state.lock().post_rendering = true;
    }

    fn post_render_complete(&self) {
        let mut state = self.state.lock();
        if state.post_rendering {
            state.completed_frames += 1;
        }
        state.post_rendering = false;
        self.completed.notify_all();
    }

    fn post_render_wait_for_completion(&self) {
        let mut state = self.state.lock();
        while state.post_rendering && !state.stopped {
            self.completed.wait(&mut state);
        }
    }
}
