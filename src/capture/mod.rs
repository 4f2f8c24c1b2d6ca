// SPDX-License-Identifier: MPL-2.0

//! Device lifecycle, frame buffering and the handle-based capture API
//!
//! - [`state`]: the per-device lifecycle state machine
//! - [`queue`]: the bounded producer/consumer frame queue
//! - [`slots`]: the fixed-capacity handle table
//! - [`device`]: Open/Start/Fetch/Stop/Close orchestration
//! - [`manager`]: the public handle-based entry points
//! - [`negotiate`]: resolution and framerate negotiation
//! - [`params`]: the string-keyed parameter protocol
//! - [`loop_runner`]: producer thread lifecycle

pub mod device;
pub mod frame;
pub mod loop_runner;
pub mod manager;
pub mod negotiate;
pub mod params;
pub mod queue;
pub mod slots;
pub mod state;

pub use device::{FetchMode, Fetched, RoiRect};
pub use frame::{Frame, FrameData, PixelFormat};
pub use manager::{CaptureManager, OpenRequest, Target};
pub use negotiate::{RateRequest, SizeRequest};
pub use params::{ParamReply, ParamValue};
pub use queue::DropPolicy;
pub use slots::CaptureHandle;
pub use state::CaptureState;
