// SPDX-License-Identifier: MPL-2.0

//! Recording pipeline construction
//!
//! Recording requests carry a codec specification string (a stable external
//! mini-language, see [`spec`]) plus a flags bitmask. The [`builder`]
//! resolves the request against the prioritized encoder [`candidates`]
//! chain into a concrete encoder/muxer plan, which the backend instantiates
//! or renders as a gst-launch line.

pub mod builder;
pub mod candidates;
pub mod spec;

pub use builder::{
    AudioPlan, ElementRegistry, GstRegistry, ResolvedRecording, StaticRegistry, launch_line,
    resolve,
};
pub use candidates::{AudioFamily, CodecFamily, VideoCandidate, default_candidates};
pub use spec::{AudioTrack, CodecSpec, EncodingOptions};

use std::path::PathBuf;

/// Behaviour flags for recording and capture, a bitmask at the external
/// edge with typed accessors inside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordingFlags(u32);

impl RecordingFlags {
    /// Record an audio track alongside the video
    pub const RECORD_AUDIO: u32 = 1;
    /// Buffer encoded data in memory before writing to disk
    pub const MEMORY_BUFFERED: u32 = 2;
    /// Pure disk recording: no frames are delivered to fetch
    pub const NO_LIVE_FEEDBACK: u32 = 4;
    /// Skip the preroll wait during open
    pub const SKIP_PREROLL: u32 = 8;
    /// Run encoding on a background worker thread
    pub const BACKGROUND_WORKER: u32 = 16;
    /// Apply the ROI crop to the recorded stream as well
    pub const CROP_RECORDING: u32 = 32;
    /// Timestamps in pipeline running time instead of wall-clock time
    pub const PIPELINE_TIMESTAMPS: u32 = 64;
    /// Restrict framerate conversion to the recording branch
    pub const RATE_CONVERT_RECORDING_ONLY: u32 = 128;
    /// Normalize frame data immediately after fetch
    pub const POST_FETCH_NORMALIZE: u32 = 256;

    /// Wrap a raw bitmask
    pub fn from_bits(bits: u32) -> Self {
        RecordingFlags(bits)
    }

    /// Raw bitmask value
    pub fn bits(self) -> u32 {
        self.0
    }

    fn has(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    /// Audio track requested
    pub fn record_audio(self) -> bool {
        self.has(Self::RECORD_AUDIO)
    }

    /// Memory buffering before disk requested
    pub fn memory_buffered(self) -> bool {
        self.has(Self::MEMORY_BUFFERED)
    }

    /// No frames delivered to fetch; implies skipping preroll
    pub fn no_live_feedback(self) -> bool {
        self.has(Self::NO_LIVE_FEEDBACK)
    }

    /// Skip the preroll wait during open
    pub fn skip_preroll(self) -> bool {
        self.has(Self::SKIP_PREROLL) || self.no_live_feedback()
    }

    /// Encode on a background worker thread
    pub fn background_worker(self) -> bool {
        self.has(Self::BACKGROUND_WORKER)
    }

    /// Crop the recorded stream to the ROI too
    pub fn crop_recording(self) -> bool {
        self.has(Self::CROP_RECORDING)
    }

    /// Keep rate conversion out of the live branch
    pub fn rate_convert_recording_only(self) -> bool {
        self.has(Self::RATE_CONVERT_RECORDING_ONLY)
    }

    /// Report frame timestamps in pipeline running time
    pub fn pipeline_timestamps(self) -> bool {
        self.has(Self::PIPELINE_TIMESTAMPS)
    }

    /// Normalize pixel data right after fetch
    pub fn post_fetch_normalize(self) -> bool {
        self.has(Self::POST_FETCH_NORMALIZE)
    }
}

/// A request to record the capture stream to a movie file
#[derive(Debug, Clone)]
pub struct RecordingRequest {
    /// Target movie path; the extension is adjusted to the resolved container
    pub target: PathBuf,
    /// Codec specification string
    pub codec_spec: String,
}
