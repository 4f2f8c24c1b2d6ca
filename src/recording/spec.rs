// SPDX-License-Identifier: MPL-2.0

//! Codec specification mini-language
//!
//! Recording requests arrive as a flat `Key=Value` token string, a stable
//! external protocol shared with scripting environments:
//!
//! ```text
//! VideoCodec=x264enc speed-preset=1 ::: Keyframe=30 Videobitrate=4000 AddAudioTrack=2@48000
//! ```
//!
//! High-level keys are matched anywhere in the string. String-valued keys
//! (`VideoCodec=`, `AudioCodec=`, `AudioSource=`, `Muxer=`) capture
//! everything up to the `:::` end-of-spec marker (or end of string), so an
//! element description may carry its own parameters. Unrecognized tokens are
//! ignored for forward compatibility. The `DEFAULTenc` sentinel requests the
//! built-in fallback chain.

use crate::errors::RecordingError;

/// Sentinel token requesting the prioritized encoder fallback chain
pub const DEFAULT_ENCODER_SENTINEL: &str = "DEFAULTenc";

/// End-of-value marker for string-valued keys
pub const SPEC_END_MARKER: &str = ":::";

/// Audio track layout requested via `AddAudioTrack=<channels>@<rate>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTrack {
    /// Channel count, 1-256
    pub channels: u32,
    /// Sample rate in Hz, 1-200000
    pub rate: u32,
}

impl Default for AudioTrack {
    fn default() -> Self {
        AudioTrack {
            channels: 1,
            rate: 48_000,
        }
    }
}

/// High-level encoding options, all optional
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EncodingOptions {
    /// Encoder profile selector (encoder-specific integer)
    pub profile: Option<i32>,
    /// Treat the input stream as interlaced
    pub interlaced: Option<bool>,
    /// Maximum distance between key frames
    pub keyframe_interval: Option<u32>,
    /// Audio bitrate in kbit/s
    pub audio_bitrate_kbps: Option<u32>,
    /// Video bitrate in kbit/s
    pub video_bitrate_kbps: Option<u32>,
    /// Enable >2GB container support
    pub big_files: Option<bool>,
    /// Put the seek index at the front of the file
    pub fast_start: Option<bool>,
    /// Seek index entries per second of movie time
    pub index_items_per_sec: Option<u32>,
    /// Quality vs speed scalar, 0.0-1.0, mapped per encoder family
    pub video_quality: Option<f64>,
    /// Audio quality scalar, 0.0-1.0, mapped per audio family
    pub audio_quality: Option<f64>,
}

/// Parsed form of a codec specification string
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodecSpec {
    raw: String,
    /// Explicit video encoder description, verbatim
    pub video_codec: Option<String>,
    /// Explicit audio encoder description, verbatim
    pub audio_codec: Option<String>,
    /// Explicit audio source bin description, verbatim
    pub audio_source: Option<String>,
    /// Explicit muxer element name
    pub muxer: Option<String>,
    /// `DEFAULTenc` present: walk the fallback chain
    pub use_default_chain: bool,
    /// `AddAudioTrack` present, with its layout
    pub audio_track: Option<AudioTrack>,
    /// High-level options
    pub options: EncodingOptions,
}

impl CodecSpec {
    /// Parse a codec specification string.
    ///
    /// Only structurally invalid `AddAudioTrack` layouts fail; everything
    /// else degrades to defaults or is ignored.
    pub fn parse(raw: &str) -> Result<Self, RecordingError> {
        let options = EncodingOptions {
            profile: scan_number(raw, "Profile=").map(|v| v as i32),
            interlaced: scan_number(raw, "Interlaced=").map(|v| v != 0.0),
            keyframe_interval: scan_number(raw, "Keyframe=").map(|v| v as u32),
            audio_bitrate_kbps: scan_number(raw, "Audiobitrate=").map(|v| v as u32),
            video_bitrate_kbps: scan_number(raw, "Videobitrate=").map(|v| v as u32),
            big_files: scan_number(raw, "Bigfiles=").map(|v| v != 0.0),
            fast_start: scan_number(raw, "Faststart=").map(|v| v != 0.0),
            index_items_per_sec: scan_number(raw, "Timeresolution=").map(|v| v as u32),
            video_quality: scan_number(raw, "Videoquality="),
            audio_quality: scan_number(raw, "Audioquality="),
        };

        let audio_track = match raw.find("AddAudioTrack") {
            None => None,
            Some(pos) => Some(parse_audio_track(&raw[pos + "AddAudioTrack".len()..])?),
        };

        Ok(CodecSpec {
            raw: raw.to_string(),
            video_codec: scan_string(raw, "VideoCodec="),
            audio_codec: scan_string(raw, "AudioCodec="),
            audio_source: scan_string(raw, "AudioSource="),
            muxer: scan_string(raw, "Muxer="),
            use_default_chain: raw.contains(DEFAULT_ENCODER_SENTINEL),
            audio_track,
            options,
        })
    }

    /// Whether the raw spec mentions `name` anywhere.
    ///
    /// Candidate selection triggers on a mention of the encoder element name
    /// even outside an explicit `VideoCodec=` assignment.
    pub fn mentions(&self, name: &str) -> bool {
        self.raw.contains(name)
    }

    /// The raw specification string
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// First whitespace-delimited token of an element description: the element
/// factory name
pub fn element_name(description: &str) -> &str {
    description.split_whitespace().next().unwrap_or("")
}

fn scan_number(raw: &str, key: &str) -> Option<f64> {
    let pos = raw.find(key)?;
    let rest = &raw[pos + key.len()..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

fn scan_string(raw: &str, key: &str) -> Option<String> {
    let pos = raw.find(key)?;
    let rest = &raw[pos + key.len()..];
    let value = match rest.find(SPEC_END_MARKER) {
        Some(end) => &rest[..end],
        None => rest,
    };
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_audio_track(rest: &str) -> Result<AudioTrack, RecordingError> {
    // Optional "=<channels>@<rate>" immediately after the keyword
    let Some(args) = rest.strip_prefix('=') else {
        return Ok(AudioTrack::default());
    };
    let args: String = args
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '@')
        .collect();
    let Some((channels, rate)) = args.split_once('@') else {
        return Ok(AudioTrack::default());
    };
    let (Ok(channels), Ok(rate)) = (channels.parse::<u32>(), rate.parse::<u32>()) else {
        return Ok(AudioTrack::default());
    };

    if !(1..=256).contains(&channels) || !(1..=200_000).contains(&rate) {
        return Err(RecordingError::InvalidSpec(format!(
            "AddAudioTrack: {} channels outside 1-256 or {} Hz outside 1-200000",
            channels, rate
        )));
    }
    Ok(AudioTrack { channels, rate })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_level_options() {
        let spec = CodecSpec::parse(
            "DEFAULTenc Profile=3 Keyframe=30 Videobitrate=4000 Videoquality=0.75 Interlaced=1",
        )
        .unwrap();
        assert!(spec.use_default_chain);
        assert_eq!(spec.options.profile, Some(3));
        assert_eq!(spec.options.keyframe_interval, Some(30));
        assert_eq!(spec.options.video_bitrate_kbps, Some(4000));
        assert_eq!(spec.options.video_quality, Some(0.75));
        assert_eq!(spec.options.interlaced, Some(true));
        assert_eq!(spec.options.fast_start, None);
    }

    #[test]
    fn test_explicit_video_codec_captures_to_marker() {
        let spec =
            CodecSpec::parse("VideoCodec=x264enc speed-preset=1 noise-reduction=100 ::: Keyframe=10")
                .unwrap();
        assert_eq!(
            spec.video_codec.as_deref(),
            Some("x264enc speed-preset=1 noise-reduction=100")
        );
        // High-level keys are still scanned across the whole string
        assert_eq!(spec.options.keyframe_interval, Some(10));
        assert_eq!(element_name(spec.video_codec.as_deref().unwrap()), "x264enc");
    }

    #[test]
    fn test_explicit_codec_without_marker_runs_to_end() {
        let spec = CodecSpec::parse("VideoCodec=theoraenc speed-level=2").unwrap();
        assert_eq!(spec.video_codec.as_deref(), Some("theoraenc speed-level=2"));
    }

    #[test]
    fn test_unknown_tokens_ignored() {
        let spec = CodecSpec::parse("DEFAULTenc Sharpness=9 FutureOption=yes").unwrap();
        assert!(spec.use_default_chain);
        assert_eq!(spec.options, EncodingOptions::default());
    }

    #[test]
    fn test_audio_track_default_and_explicit() {
        let spec = CodecSpec::parse("DEFAULTenc AddAudioTrack").unwrap();
        assert_eq!(spec.audio_track, Some(AudioTrack::default()));

        let spec = CodecSpec::parse("DEFAULTenc AddAudioTrack=2@44100").unwrap();
        assert_eq!(
            spec.audio_track,
            Some(AudioTrack {
                channels: 2,
                rate: 44_100
            })
        );
    }

    #[test]
    fn test_audio_track_validation() {
        assert!(CodecSpec::parse("DEFAULTenc AddAudioTrack=0@48000").is_err());
        assert!(CodecSpec::parse("DEFAULTenc AddAudioTrack=300@48000").is_err());
        assert!(CodecSpec::parse("DEFAULTenc AddAudioTrack=2@300000").is_err());
        // Malformed layouts fall back to the default track
        let spec = CodecSpec::parse("DEFAULTenc AddAudioTrack=stereo").unwrap();
        assert_eq!(spec.audio_track, Some(AudioTrack::default()));
    }

    #[test]
    fn test_muxer_and_audio_overrides() {
        let spec =
            CodecSpec::parse("VideoCodec=vp8enc ::: AudioCodec=vorbisenc ::: Muxer=matroskamux")
                .unwrap();
        assert_eq!(spec.muxer.as_deref(), Some("matroskamux"));
        assert_eq!(spec.audio_codec.as_deref(), Some("vorbisenc"));
        assert!(spec.mentions("vp8enc"));
        assert!(!spec.mentions("x264enc"));
    }

    #[test]
    fn test_empty_spec() {
        let spec = CodecSpec::parse("").unwrap();
        assert!(!spec.use_default_chain);
        assert!(spec.video_codec.is_none());
        assert!(spec.audio_track.is_none());
    }
}
