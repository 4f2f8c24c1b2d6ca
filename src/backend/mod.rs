// SPDX-License-Identifier: MPL-2.0

//! Capture backends
//!
//! A backend owns the producer side of a device: it brings up the actual
//! frame source, pushes into the device's [`FrameQueue`](crate::capture::queue::FrameQueue)
//! from asynchronous context, and answers device control requests. The
//! lifecycle orchestration in [`capture::device`](crate::capture::device)
//! only ever talks to the [`CaptureProducer`] trait, so the GStreamer
//! pipeline and the synthetic pattern source are interchangeable.

pub mod bus;
pub mod pipeline;
pub mod synthetic;

use std::time::Duration;

use crate::capture::frame::PixelFormat;
use crate::capture::params::{DeviceControl, ParamReply, ParamValue};
use crate::errors::CaptureResult;

/// Which video source to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Enumerated capture device by index (e.g. /dev/video0)
    Index(u32),
    /// Synthetic test pattern source, no hardware required
    TestPattern,
    /// gst-launch style source bin description
    LaunchBin(String),
    /// Source bin description previously stored via the process-global
    /// `SetNextCaptureBinSpec=` parameter
    PendingLaunchBin,
}

/// Format the backend settled on after preroll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NegotiatedFormat {
    /// Frame width in pixels, after ROI cropping
    pub width: u32,
    /// Frame height in pixels, after ROI cropping
    pub height: u32,
    /// Frames per second, 0.0 if unknown until the first frame
    pub fps: f64,
    /// Channel layout of delivered frames
    pub format: PixelFormat,
    /// Bits per channel
    pub bit_depth: u32,
}

/// Producer side of one capture device
///
/// Implementations push frames into the device queue from their own
/// execution context. All methods are called with the device's producer
/// lock held, never from the frame callback itself.
pub trait CaptureProducer: Send {
    /// Bring the source up far enough that the negotiated format is known.
    /// Bounded by `timeout`; drives the Configuring -> Ready transition.
    fn preroll(&mut self, timeout: Duration) -> CaptureResult<NegotiatedFormat>;

    /// Start live capture, optionally at a validated explicit rate.
    /// After this returns the producer may push at any moment.
    fn start(&mut self, rate: Option<f64>, timeout: Duration) -> CaptureResult<()>;

    /// Quiesce the producer. No pushes happen after this returns.
    fn stop(&mut self) -> CaptureResult<()>;

    /// The rate the producer is actually running at, 0.0 if unknown.
    /// Authoritative once the first live frame has arrived.
    fn current_fps(&self) -> f64;

    /// Pipeline base time in nanoseconds, 0 if the backend has no clock
    fn base_time_nanos(&self) -> u64;

    /// Drain asynchronous backend notifications into the log, optionally
    /// waiting briefly for at least one
    fn drain_events(&mut self, wait: bool);

    /// Apply or query a mapped device control
    fn control(&mut self, control: DeviceControl, auto: bool, value: ParamValue) -> ParamReply;

    /// Apply or query a backend-named channel (color balance labels)
    fn named_control(&mut self, label: &str, value: ParamValue) -> ParamReply;

    /// Point the recording branch at a new target file for the next start.
    /// Returns false when the backend records nothing.
    fn retarget_recording(&mut self, path: &std::path::Path) -> bool;

    /// Release all backend resources. The producer is unusable afterwards.
    fn shutdown(&mut self);
}
