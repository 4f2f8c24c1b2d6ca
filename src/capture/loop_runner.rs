// SPDX-License-Identifier: MPL-2.0

//! Thread lifecycle management for frame producer loops
//!
//! Producers that are not callback-driven (synthetic pattern sources, polled
//! devices) run an iteration function on a dedicated thread. This controller
//! standardizes start/stop/join handling so every producer quiesces the same
//! way before its device record is torn down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Action returned by a producer iteration to control the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Run another iteration
    Continue,
    /// End the loop gracefully
    Stop,
}

/// Controller for a producer loop running on its own thread
pub struct ProducerLoop {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl ProducerLoop {
    /// Spawn a producer thread running `iter_fn` until it returns
    /// [`LoopAction::Stop`] or [`stop`](Self::stop) is called
    pub fn spawn<F>(name: &str, mut iter_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_signal = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting producer loop");

        let thread_handle = thread::spawn(move || {
            debug!(name = %thread_name, "Producer thread started");
            loop {
                if thread_signal.load(Ordering::SeqCst) {
                    break;
                }
                match iter_fn() {
                    LoopAction::Continue => {}
                    LoopAction::Stop => break,
                }
            }
            debug!(name = %thread_name, "Producer thread exiting");
        });

        ProducerLoop {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Whether the producer thread is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting for the thread
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish.
    ///
    /// The producer is guaranteed quiescent when this returns; only then is
    /// it safe to free the device record the iteration function pushes into.
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread without signalling stop (loops that end
    /// themselves via [`LoopAction::Stop`])
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!(name = %self.name, "Producer thread panicked");
            }
        }
    }
}

impl Drop for ProducerLoop {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "ProducerLoop dropped, stopping");
            self.stop();
        }
    }
}
