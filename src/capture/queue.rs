// SPDX-License-Identifier: MPL-2.0

//! Bounded frame buffer queue with drop semantics
//!
//! One queue sits between each device's backend producer (appsink callback
//! or synthetic capture loop) and the caller's fetch loop. The producer side
//! pushes from asynchronous callback context; the consumer side pops with a
//! choice of blocking behaviour. All shared state lives behind one mutex,
//! with a condition variable for blocking pops and the open-time readiness
//! signal.
//!
//! Overflow behaviour is a per-device policy: `DropOldest` keeps the queue
//! within its configured depth by discarding the oldest frame before each
//! push that would overflow ("always deliver the most recent frame"),
//! `KeepAll` never discards.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use super::frame::Frame;

/// Queue behaviour when a push would exceed the configured depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum DropPolicy {
    /// Discard the oldest queued frame to make room; only strict recency is
    /// guaranteed, not completeness
    DropOldest,
    /// Never discard; depth 0 means unbounded growth
    #[default]
    KeepAll,
}

/// Blocking behaviour of [`FrameQueue::pop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    /// Return immediately
    NonBlocking,
    /// Wait up to the given duration for a frame
    BoundedWait(Duration),
    /// Wait until a frame arrives or the queue terminates
    Infinite,
}

/// Why a pop returned no frame
///
/// `Empty` means "try again": the producer is live and a frame may yet
/// arrive. `Terminated` means "never again": capture has stopped and the
/// backlog is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopError {
    /// Nothing queued, capture still active
    Empty,
    /// Nothing queued and capture has stopped
    Terminated,
}

#[derive(Default)]
struct QueueInner {
    frames: VecDeque<Frame>,
    /// Producer may still push; cleared by terminate()
    live: bool,
    /// Frames discarded by DropOldest since the last reset
    dropped: u64,
    /// Total pushes since the last reset
    pushed: u64,
    /// Preroll buffers seen while the pipeline pauses during open
    preroll_count: u32,
    /// End-of-stream seen; during open this aborts the preroll wait
    eos: bool,
}

/// Per-device frame queue shared between producer and consumer
pub struct FrameQueue {
    inner: Mutex<QueueInner>,
    cond: Condvar,
    depth: usize,
    policy: DropPolicy,
}

impl FrameQueue {
    /// Create a queue with the given maximum depth (0 = unbounded) and
    /// overflow policy, initially terminated
    pub fn new(depth: usize, policy: DropPolicy) -> Self {
        FrameQueue {
            inner: Mutex::new(QueueInner::default()),
            cond: Condvar::new(),
            depth,
            policy,
        }
    }

    /// Configured maximum depth, 0 = unbounded
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Configured overflow policy
    pub fn policy(&self) -> DropPolicy {
        self.policy
    }

    /// Append a frame, applying the overflow policy.
    ///
    /// Called from producer callback context only. With `DropOldest` and a
    /// bounded depth the queue length never exceeds the depth after this
    /// returns.
    pub fn push(&self, frame: Frame) {
        let mut inner = self.inner.lock().unwrap();
        if self.depth > 0 && self.policy == DropPolicy::DropOldest {
            while inner.frames.len() >= self.depth {
                inner.frames.pop_front();
                inner.dropped += 1;
            }
        }
        inner.frames.push_back(frame);
        inner.pushed += 1;
        drop(inner);
        self.cond.notify_one();
    }

    /// Remove and return the oldest queued frame.
    ///
    /// Returns `PopError::Empty` when nothing is queued but the producer is
    /// live (non-blocking, or the bounded wait elapsed), and
    /// `PopError::Terminated` once capture has stopped and the backlog is
    /// exhausted. A concurrent [`terminate`](Self::terminate) wakes blocked
    /// callers immediately so they observe `Terminated` rather than waiting
    /// out their timeout.
    pub fn pop(&self, mode: BlockMode) -> Result<Frame, PopError> {
        let deadline = match mode {
            BlockMode::BoundedWait(timeout) => Some(Instant::now() + timeout),
            _ => None,
        };

        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(frame) = inner.frames.pop_front() {
                return Ok(frame);
            }
            if !inner.live {
                return Err(PopError::Terminated);
            }
            match mode {
                BlockMode::NonBlocking => return Err(PopError::Empty),
                BlockMode::Infinite => {
                    inner = self.cond.wait(inner).unwrap();
                }
                BlockMode::BoundedWait(_) => {
                    let deadline = deadline.unwrap();
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(PopError::Empty);
                    }
                    let (guard, _) = self.cond.wait_timeout(inner, deadline - now).unwrap();
                    inner = guard;
                }
            }
        }
    }

    /// Discard up to `max` queued frames without returning them.
    ///
    /// Used at stop/close so backend-owned buffers are released instead of
    /// leaking with the queue. Returns the number of frames discarded.
    pub fn drain(&self, max: usize) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let count = inner.frames.len().min(max);
        for _ in 0..count {
            inner.frames.pop_front();
        }
        count
    }

    /// Flush stale frames and reset counters for a fresh capture run,
    /// marking the producer live
    pub fn reset_for_start(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.frames.clear();
        inner.dropped = 0;
        inner.pushed = 0;
        inner.live = true;
    }

    /// Mark the producer stopped and wake all blocked consumers.
    ///
    /// Queued frames stay fetchable; pops observe `Terminated` only once
    /// the backlog is gone.
    pub fn terminate(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.live = false;
        drop(inner);
        self.cond.notify_all();
    }

    /// Number of frames currently queued
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().frames.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the producer is live
    pub fn is_live(&self) -> bool {
        self.inner.lock().unwrap().live
    }

    /// Frames discarded by the overflow policy since the last reset
    pub fn dropped(&self) -> u64 {
        self.inner.lock().unwrap().dropped
    }

    /// Total frames pushed since the last reset
    pub fn pushed(&self) -> u64 {
        self.inner.lock().unwrap().pushed
    }

    /// Record arrival of a preroll buffer and wake the open sequence
    pub fn preroll_arrived(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.preroll_count += 1;
        drop(inner);
        self.cond.notify_all();
    }

    /// Record a (premature) end-of-stream and wake any waiter
    pub fn mark_eos(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.eos = true;
        drop(inner);
        self.cond.notify_all();
    }

    /// Whether end-of-stream was recorded
    pub fn eos_seen(&self) -> bool {
        self.inner.lock().unwrap().eos
    }

    /// Block until a preroll buffer or EOS arrives, bounded by `timeout`.
    ///
    /// Returns true once at least one preroll buffer was seen, false on
    /// timeout or EOS. Drives the Configuring -> Ready transition.
    pub fn wait_preroll(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.preroll_count > 0 {
                return true;
            }
            if inner.eos {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.cond.wait_timeout(inner, deadline - now).unwrap();
            inner = guard;
        }
    }

    /// Block until at least one frame has been pushed, bounded by `timeout`.
    ///
    /// Drives the wait-for-first-frame step of Start, after which the
    /// negotiated frame rate is authoritative.
    pub fn wait_first_frame(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.pushed > 0 {
                return true;
            }
            if !inner.live {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.cond.wait_timeout(inner, deadline - now).unwrap();
            inner = guard;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::PixelFormat;
    use std::sync::Arc;
    use std::thread;

    fn frame(seq: u64) -> Frame {
        Frame::from_bytes(vec![seq as u8; 4], 2, 2, PixelFormat::Gray, 8, Some(seq))
    }

    fn live_queue(depth: usize, policy: DropPolicy) -> FrameQueue {
        let queue = FrameQueue::new(depth, policy);
        queue.reset_for_start();
        queue
    }

    #[test]
    fn test_fifo_order() {
        let queue = live_queue(0, DropPolicy::KeepAll);
        for seq in 0..5 {
            queue.push(frame(seq));
        }
        for seq in 0..5 {
            let f = queue.pop(BlockMode::NonBlocking).unwrap();
            assert_eq!(f.pts_nanos, Some(seq));
        }
    }

    #[test]
    fn test_drop_oldest_bounds_length() {
        let queue = live_queue(3, DropPolicy::DropOldest);
        for seq in 0..10 {
            queue.push(frame(seq));
            assert!(queue.len() <= 3);
        }
        assert_eq!(queue.dropped(), 7);
        // Oldest survivor is frame 7
        assert_eq!(queue.pop(BlockMode::NonBlocking).unwrap().pts_nanos, Some(7));
    }

    #[test]
    fn test_depth_one_keeps_most_recent_only() {
        let queue = live_queue(1, DropPolicy::DropOldest);
        for seq in 0..5 {
            queue.push(frame(seq));
        }
        let f = queue.pop(BlockMode::NonBlocking).unwrap();
        assert_eq!(f.pts_nanos, Some(4));
        assert_eq!(queue.dropped(), 4);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_keep_all_never_discards() {
        let queue = live_queue(2, DropPolicy::KeepAll);
        for seq in 0..6 {
            queue.push(frame(seq));
        }
        // Depth is advisory under KeepAll: nothing is lost
        assert_eq!(queue.len(), 6);
        assert_eq!(queue.dropped(), 0);
        let mut pops = 0;
        while queue.pop(BlockMode::NonBlocking).is_ok() {
            pops += 1;
        }
        assert_eq!(pops as u64, queue.pushed());
    }

    #[test]
    fn test_empty_vs_terminated() {
        let queue = live_queue(0, DropPolicy::KeepAll);
        assert!(matches!(
            queue.pop(BlockMode::NonBlocking),
            Err(PopError::Empty)
        ));

        queue.push(frame(0));
        queue.terminate();
        // Backlog is still served after termination
        assert!(queue.pop(BlockMode::NonBlocking).is_ok());
        assert!(matches!(
            queue.pop(BlockMode::NonBlocking),
            Err(PopError::Terminated)
        ));
    }

    #[test]
    fn test_bounded_wait_times_out_empty() {
        let queue = live_queue(0, DropPolicy::KeepAll);
        let start = Instant::now();
        let result = queue.pop(BlockMode::BoundedWait(Duration::from_millis(50)));
        assert!(matches!(result, Err(PopError::Empty)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_blocked_pop_receives_pushed_frame() {
        let queue = Arc::new(live_queue(0, DropPolicy::KeepAll));
        let producer_queue = Arc::clone(&queue);
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            producer_queue.push(frame(42));
        });

        let f = queue.pop(BlockMode::BoundedWait(Duration::from_secs(5))).unwrap();
        assert_eq!(f.pts_nanos, Some(42));
        producer.join().unwrap();
    }

    #[test]
    fn test_terminate_wakes_blocked_pop() {
        let queue = Arc::new(live_queue(0, DropPolicy::KeepAll));
        let stopper_queue = Arc::clone(&queue);
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            stopper_queue.terminate();
        });

        // Must observe Terminated promptly, well before the 5s timeout
        let start = Instant::now();
        let result = queue.pop(BlockMode::BoundedWait(Duration::from_secs(5)));
        assert!(matches!(result, Err(PopError::Terminated)));
        assert!(start.elapsed() < Duration::from_secs(2));
        stopper.join().unwrap();
    }

    #[test]
    fn test_drain_releases_backlog() {
        let queue = live_queue(0, DropPolicy::KeepAll);
        for seq in 0..8 {
            queue.push(frame(seq));
        }
        assert_eq!(queue.drain(5), 5);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drain(usize::MAX), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_reset_clears_stale_state() {
        let queue = live_queue(1, DropPolicy::DropOldest);
        queue.push(frame(0));
        queue.push(frame(1));
        queue.terminate();

        queue.reset_for_start();
        assert!(queue.is_empty());
        assert_eq!(queue.dropped(), 0);
        assert_eq!(queue.pushed(), 0);
        assert!(queue.is_live());
    }

    #[test]
    fn test_preroll_signal() {
        let queue = Arc::new(FrameQueue::new(0, DropPolicy::KeepAll));
        let signal_queue = Arc::clone(&queue);
        let signaller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signal_queue.preroll_arrived();
        });
        assert!(queue.wait_preroll(Duration::from_secs(5)));
        signaller.join().unwrap();
    }

    #[test]
    fn test_preroll_aborts_on_eos() {
        let queue = Arc::new(FrameQueue::new(0, DropPolicy::KeepAll));
        let signal_queue = Arc::clone(&queue);
        let signaller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signal_queue.mark_eos();
        });
        assert!(!queue.wait_preroll(Duration::from_secs(5)));
        assert!(queue.eos_seen());
        signaller.join().unwrap();
    }
}
