// SPDX-License-Identifier: MPL-2.0

//! Error types for the capture subsystem

use std::fmt;

use crate::capture::state::CaptureState;

/// Result type alias using CaptureError
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Main error type for device lifecycle and streaming operations
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// Handle does not refer to an open device (never allocated, freed,
    /// or from a previous generation of the same slot)
    InvalidHandle,
    /// The device table is full
    OutOfSlots,
    /// Requested resolution is not covered by any capture mode of the device
    UnsupportedResolution {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },
    /// A pipeline state transition did not complete within its deadline
    StateTransitionTimeout {
        /// Target state of the transition that timed out
        target: &'static str,
    },
    /// A pipeline state transition failed outright (fatal)
    StateTransitionFailure(String),
    /// Operation is not legal in the device's current lifecycle state
    InvalidState {
        /// State the device was in when the operation was attempted
        state: CaptureState,
        /// The rejected operation
        operation: &'static str,
    },
    /// Recording pipeline construction failed
    Recording(RecordingError),
    /// Backend (GStreamer or synthetic source) error
    Backend(String),
}

/// Recording-specific errors
#[derive(Debug, Clone)]
pub enum RecordingError {
    /// No usable video encoder, after exhausting the fallback chain if one
    /// was requested
    CodecUnavailable(String),
    /// No usable muxer for the chosen codec
    MuxerUnavailable(String),
    /// A required audio encoder could not be created
    AudioUnavailable(String),
    /// Malformed codec specification string
    InvalidSpec(String),
}

/// Errors returned by frame fetch operations
///
/// Fetch is designed for polling loops, so "no frame yet" and "no frame
/// ever again" are distinct, recoverable-vs-terminal conditions rather than
/// one opaque failure.
#[derive(Debug, Clone)]
pub enum FetchError {
    /// No frame queued yet; capture is live, the caller may retry
    NotReady,
    /// Capture has stopped and the queue is drained; no frame will ever
    /// arrive until the device is restarted
    Terminated,
    /// Handle or device level failure
    Device(CaptureError),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::InvalidHandle => write!(f, "Invalid capture device handle"),
            CaptureError::OutOfSlots => write!(f, "All capture device slots are in use"),
            CaptureError::UnsupportedResolution { width, height } => {
                write!(f, "Unsupported capture resolution {}x{}", width, height)
            }
            CaptureError::StateTransitionTimeout { target } => {
                write!(f, "Pipeline transition to {} timed out", target)
            }
            CaptureError::StateTransitionFailure(msg) => {
                write!(f, "Pipeline state transition failed: {}", msg)
            }
            CaptureError::InvalidState { state, operation } => {
                write!(f, "Cannot {} while device is {}", operation, state)
            }
            CaptureError::Recording(e) => write!(f, "Recording error: {}", e),
            CaptureError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::CodecUnavailable(msg) => {
                write!(f, "Video codec unavailable: {}", msg)
            }
            RecordingError::MuxerUnavailable(msg) => write!(f, "Muxer unavailable: {}", msg),
            RecordingError::AudioUnavailable(msg) => {
                write!(f, "Audio encoder unavailable: {}", msg)
            }
            RecordingError::InvalidSpec(msg) => {
                write!(f, "Malformed codec specification: {}", msg)
            }
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NotReady => write!(f, "No frame available yet"),
            FetchError::Terminated => write!(f, "Capture terminated, no frame will arrive"),
            FetchError::Device(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CaptureError {}
impl std::error::Error for RecordingError {}
impl std::error::Error for FetchError {}

impl From<RecordingError> for CaptureError {
    fn from(err: RecordingError) -> Self {
        CaptureError::Recording(err)
    }
}

impl From<CaptureError> for FetchError {
    fn from(err: CaptureError) -> Self {
        FetchError::Device(err)
    }
}
