// SPDX-License-Identifier: MPL-2.0

//! Frame and pixel data types shared between producers and consumers

use gstreamer::buffer::{MappedBuffer, Readable};
use std::sync::Arc;

/// Frame data storage - either pre-copied bytes or zero-copy GStreamer buffer
///
/// The `Mapped` variant keeps the GStreamer buffer mapped and alive until all
/// references are dropped, so frames coming out of an appsink never need a
/// pixel copy on their way to the caller.
#[derive(Clone)]
pub enum FrameData {
    /// Pre-copied bytes (synthetic sources, tests, post-processing)
    Copied(Arc<[u8]>),
    /// Zero-copy mapped GStreamer buffer
    Mapped(Arc<MappedBuffer<Readable>>),
}

impl FrameData {
    /// Create FrameData from a mapped GStreamer buffer (zero-copy)
    pub fn from_mapped_buffer(buffer: MappedBuffer<Readable>) -> Self {
        FrameData::Mapped(Arc::new(buffer))
    }

    /// Length of the frame data in bytes
    pub fn len(&self) -> usize {
        match self {
            FrameData::Copied(data) => data.len(),
            FrameData::Mapped(buf) => buf.len(),
        }
    }

    /// Whether the frame data is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for FrameData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameData::Copied(data) => write!(f, "FrameData::Copied({} bytes)", data.len()),
            FrameData::Mapped(buf) => write!(f, "FrameData::Mapped({} bytes)", buf.len()),
        }
    }
}

impl AsRef<[u8]> for FrameData {
    fn as_ref(&self) -> &[u8] {
        match self {
            FrameData::Copied(data) => data.as_ref(),
            FrameData::Mapped(buf) => buf.as_slice(),
        }
    }
}

impl std::ops::Deref for FrameData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_ref()
    }
}

/// Channel layout of delivered frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// Single luminance channel
    Gray,
    /// Packed YUV 4:2:2 (2 effective channels)
    Yuyv,
    /// Packed RGB
    #[default]
    Rgb,
    /// Packed RGB with alpha
    Rgba,
}

impl PixelFormat {
    /// Number of caller-visible channels for this layout
    pub fn channels(self) -> u32 {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Yuyv => 2,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    /// Layout matching a requested channel count (1, 2, 3 or 4)
    pub fn from_channels(channels: u32) -> Option<Self> {
        match channels {
            1 => Some(PixelFormat::Gray),
            2 => Some(PixelFormat::Yuyv),
            3 => Some(PixelFormat::Rgb),
            4 => Some(PixelFormat::Rgba),
            _ => None,
        }
    }
}

/// One captured image plus its metadata, owned by the queue until popped
#[derive(Debug, Clone)]
pub struct Frame {
    /// Pixel data
    pub data: FrameData,
    /// Width in pixels (after ROI cropping)
    pub width: u32,
    /// Height in pixels (after ROI cropping)
    pub height: u32,
    /// Channel layout
    pub format: PixelFormat,
    /// Bits per channel (8 or 16)
    pub bit_depth: u32,
    /// Presentation timestamp in pipeline running time, nanoseconds.
    /// Converted to an absolute timestamp at fetch.
    pub pts_nanos: Option<u64>,
}

impl Frame {
    /// Frame with copied pixel data, timestamped in running time
    pub fn from_bytes(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        bit_depth: u32,
        pts_nanos: Option<u64>,
    ) -> Self {
        Frame {
            data: FrameData::Copied(data.into()),
            width,
            height,
            format,
            bit_depth,
            pts_nanos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_channel_roundtrip() {
        for channels in 1..=4 {
            let format = PixelFormat::from_channels(channels).unwrap();
            assert_eq!(format.channels(), channels);
        }
        assert!(PixelFormat::from_channels(0).is_none());
        assert!(PixelFormat::from_channels(5).is_none());
    }

    #[test]
    fn test_copied_frame_data() {
        let frame = Frame::from_bytes(vec![0u8; 12], 2, 2, PixelFormat::Rgb, 8, Some(0));
        assert_eq!(frame.data.len(), 12);
        assert!(!frame.data.is_empty());
        assert_eq!(frame.data.as_ref()[0], 0);
    }
}
