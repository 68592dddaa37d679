//! Bounded queue of presentable buffers
//!
//! Each slot cycles `Free -> Dequeued -> Queued -> Acquired -> Free`. The
//! producer (the graphics driver on swap) dequeues and enqueues; the
//! consumer (the compositor, or the surface itself on the event side)
//! acquires and releases. Waiting for a free slot uses a condition variable
//! with a timeout instead of polling.

use std::collections::VecDeque;
use std::time::Duration;

use dali_adaptor_core::{SurfaceError, SurfaceResult};
use parking_lot::{Condvar, Mutex};

pub type BufferId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Dequeued,
    Queued,
    Acquired,
}

impl SlotState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Dequeued => "dequeued",
            Self::Queued => "queued",
            Self::Acquired => "acquired",
        }
    }
}

#[derive(Debug)]
struct QueueState {
    slots: Vec<SlotState>,
    queued: VecDeque<BufferId>,
    width: u32,
    height: u32,
    closed: bool,
}

impl QueueState {
    fn has_free(&self) -> bool {
        self.slots.contains(&SlotState::Free)
    }

    fn transition(&mut self, id: BufferId, from: SlotState, to: SlotState) -> SurfaceResult<()> {
        match self.slots.get_mut(id) {
            Some(slot) if *slot == from => {
                *slot = to;
                Ok(())
            }
            Some(slot) => Err(SurfaceError::BufferQueue(format!(
                "buffer {} is {}, expected {}",
                id,
                slot.as_str(),
                from.as_str()
            ))),
            None => Err(SurfaceError::BufferQueue(format!("no buffer {}", id))),
        }
    }
}

#[derive(Debug)]
pub struct BufferQueue {
    state: Mutex<QueueState>,
    freed: Condvar,
}

impl BufferQueue {
    pub fn new(capacity: usize, width: u32, height: u32) -> Self {
        Self {
            state: Mutex::new(QueueState {
                slots: vec![SlotState::Free; capacity.max(1)],
                queued: VecDeque::new(),
                width,
                height,
                closed: false,
            }),
            freed: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn size(&self) -> (u32, u32) {
        let state = self.state.lock();
        (state.width, state.height)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn slot_state(&self, id: BufferId) -> Option<SlotState> {
        self.state.lock().slots.get(id).copied()
    }

    pub fn free_count(&self) -> usize {
        let state = self.state.lock();
        state.slots.iter().filter(|s| **s == SlotState::Free).count()
    }

    /// Whether a slot can be dequeued, waiting up to `wait` for one to free up
    ///
    /// Returns false once the queue is closed.
    pub fn can_dequeue(&self, wait: Option<Duration>) -> bool {
        let mut state = self.state.lock();
        if let Some(timeout) = wait {
            while !state.has_free() && !state.closed {
                if self.freed.wait_for(&mut state, timeout).timed_out() {
                    break;
                }
            }
        }
        state.has_free() && !state.closed
    }

    /// Take a free slot for rendering, without blocking
    pub fn dequeue(&self) -> Option<BufferId> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        let id = state.slots.iter().position(|s| *s == SlotState::Free)?;
        state.slots[id] = SlotState::Dequeued;
        Some(id)
    }

    /// Hand a rendered slot to the consumer side
    pub fn enqueue(&self, id: BufferId) -> SurfaceResult<()> {
        let mut state = self.state.lock();
        state.transition(id, SlotState::Dequeued, SlotState::Queued)?;
        state.queued.push_back(id);
        Ok(())
    }

    pub fn can_acquire(&self) -> bool {
        !self.state.lock().queued.is_empty()
    }

    /// Oldest queued slot, now owned by the consumer
    pub fn acquire(&self) -> Option<BufferId> {
        let mut state = self.state.lock();
        let id = state.queued.pop_front()?;
        state.slots[id] = SlotState::Acquired;
        Some(id)
    }

    /// Return an acquired slot and wake one waiting producer
    pub fn release(&self, id: BufferId) -> SurfaceResult<()> {
        let mut state = self.state.lock();
        state.transition(id, SlotState::Acquired, SlotState::Free)?;
        self.freed.notify_one();
        Ok(())
    }

    /// Drop every buffer and resize the queue; all slots become free
    pub fn reset(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        state.slots.iter_mut().for_each(|s| *s = SlotState::Free);
        state.queued.clear();
        state.width = width;
        state.height = height;
        self.freed.notify_all();
        log::debug!("Buffer queue reset to {}x{}", width, height);
    }

    /// Refuse further dequeues and wake every waiter
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.freed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn slot_cycle() {
        let queue = BufferQueue::new(2, 64, 32);
        let id = queue.dequeue().unwrap();
        assert_eq!(queue.slot_state(id), Some(SlotState::Dequeued));
        assert!(!queue.can_acquire());

        queue.enqueue(id).unwrap();
        assert!(queue.can_acquire());
        assert_eq!(queue.acquire(), Some(id));
        assert_eq!(queue.free_count(), 1);

        queue.release(id).unwrap();
        assert_eq!(queue.free_count(), 2);
        assert_eq!(queue.size(), (64, 32));
    }

    #[test]
    fn acquire_is_fifo() {
        let queue = BufferQueue::new(3, 1, 1);
        let a = queue.dequeue().unwrap();
        let b = queue.dequeue().unwrap();
        queue.enqueue(b).unwrap();
        queue.enqueue(a).unwrap();
        assert_eq!(queue.acquire(), Some(b));
        assert_eq!(queue.acquire(), Some(a));
        assert_eq!(queue.acquire(), None);
    }

    #[test]
    fn wrong_transitions_are_rejected() {
        let queue = BufferQueue::new(1, 1, 1);
        assert!(queue.enqueue(0).is_err());
        assert!(queue.release(0).is_err());
        assert!(queue.enqueue(7).is_err());
    }

    #[test]
    fn full_queue_times_out() {
        let queue = BufferQueue::new(1, 1, 1);
        queue.dequeue().unwrap();

        let start = Instant::now();
        assert!(!queue.can_dequeue(Some(Duration::from_millis(20))));
        assert!(start.elapsed() >= Duration::from_millis(15));
        assert!(!queue.can_dequeue(None));
    }

    #[test]
    fn release_wakes_waiting_producer() {
        let queue = Arc::new(BufferQueue::new(1, 1, 1));
        let id = queue.dequeue().unwrap();
        queue.enqueue(id).unwrap();
        let id = queue.acquire().unwrap();

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                queue.release(id).unwrap();
            })
        };

        assert!(queue.can_dequeue(Some(Duration::from_secs(5))));
        consumer.join().unwrap();
    }

    #[test]
    fn close_wakes_waiters_and_refuses_dequeue() {
        let queue = Arc::new(BufferQueue::new(1, 1, 1));
        queue.dequeue().unwrap();

        let closer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                queue.close();
            })
        };

        assert!(!queue.can_dequeue(Some(Duration::from_secs(5))));
        closer.join().unwrap();
        queue.reset(1, 1);
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn reset_frees_everything() {
        let queue = BufferQueue::new(3, 10, 10);
        let a = queue.dequeue().unwrap();
        queue.enqueue(a).unwrap();
        queue.dequeue().unwrap();
        queue.reset(20, 40);
        assert_eq!(queue.free_count(), 3);
        assert!(!queue.can_acquire());
        assert_eq!(queue.size(), (20, 40));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Dequeue,
        Enqueue(usize),
        Acquire,
        Release(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Dequeue),
            (0usize..4).prop_map(Op::Enqueue),
            Just(Op::Acquire),
            (0usize..4).prop_map(Op::Release),
        ]
    }

    proptest! {
        #[test]
        fn slots_are_conserved(ops in prop::collection::vec(op(), 0..64)) {
            let queue = BufferQueue::new(3, 1, 1);
            for op in ops {
                match op {
                    Op::Dequeue => {
                        queue.dequeue();
                    }
                    Op::Enqueue(id) => {
                        let _ = queue.enqueue(id);
                    }
                    Op::Acquire => {
                        queue.acquire();
                    }
                    Op::Release(id) => {
                        let _ = queue.release(id);
                    }
                }

                let states: Vec<_> = (0..3).filter_map(|id| queue.slot_state(id)).collect();
                prop_assert_eq!(states.len(), 3);
                let queued = states.iter().filter(|s| **s == SlotState::Queued).count();
                prop_assert_eq!(queued > 0, queue.can_acquire());
                prop_assert_eq!(
                    states.iter().filter(|s| **s == SlotState::Free).count(),
                    queue.free_count()
                );
            }
        }
    }
}
