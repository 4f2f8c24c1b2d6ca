// SPDX-License-Identifier: MPL-2.0

//! framegrab - GStreamer-based video capture and recording
//!
//! This library drives capture devices for experiment control rigs: open a
//! device, stream frames into caller-visible buffers for live display or
//! analysis, and optionally transcode and mux the stream into a movie file.
//!
//! # Architecture
//!
//! The crate is organized into a few modules:
//!
//! - [`capture`]: device lifecycle state machine, the bounded frame queue
//!   with its drop policy, the handle table and the public
//!   [`CaptureManager`](capture::CaptureManager) API
//! - [`backend`]: the GStreamer pipeline producer and a synthetic test
//!   pattern producer
//! - [`recording`]: the codec specification mini-language and the
//!   prioritized encoder/muxer fallback resolution
//! - [`config`]: persisted settings, including the encoder priority table
//! - [`storage`]: recording output locations
//!
//! # Example
//!
//! ```no_run
//! use framegrab::backend::DeviceSelector;
//! use framegrab::capture::{CaptureManager, FetchMode, OpenRequest, RateRequest};
//!
//! let manager = CaptureManager::new();
//! let handle = manager.open(OpenRequest {
//!     device: DeviceSelector::TestPattern,
//!     channels: 3,
//!     ..Default::default()
//! })?;
//! manager.start(handle, RateRequest::Auto, false, None)?;
//! let fetched = manager.fetch(handle, FetchMode::Blocking).unwrap();
//! println!("{}x{} frame", fetched.frame.width, fetched.frame.height);
//! manager.stop(handle, true)?;
//! manager.close(handle)?;
//! # Ok::<(), framegrab::errors::CaptureError>(())
//! ```

pub mod backend;
pub mod capture;
pub mod config;
pub mod errors;
pub mod recording;
pub mod storage;

// Re-export commonly used types
pub use backend::DeviceSelector;
pub use capture::{
    CaptureHandle, CaptureManager, CaptureState, DropPolicy, FetchMode, Fetched, Frame,
    OpenRequest, ParamReply, ParamValue, PixelFormat, RateRequest, RoiRect, SizeRequest, Target,
};
pub use config::Settings;
pub use errors::{CaptureError, FetchError, RecordingError};
pub use recording::{CodecSpec, RecordingFlags, RecordingRequest};
