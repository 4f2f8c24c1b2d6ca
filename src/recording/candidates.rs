// SPDX-License-Identifier: MPL-2.0

//! Encoder candidate table and per-family option mapping
//!
//! The fallback chain is an ordered list of candidate descriptors: each
//! pairs a video encoder element with its compatible audio codec family and
//! default muxer. Later entries are strictly lower priority. The order and
//! the quality mappings are configuration data, not invariants: callers can
//! substitute their own table (see `Settings::encoder_candidates`).

use serde::{Deserialize, Serialize};

use super::spec::EncodingOptions;

/// Encoder families with distinct option names and units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodecFamily {
    /// x264-style H.264 encoders
    H264,
    /// OpenH264 encoder
    OpenH264,
    /// FFmpeg MPEG-4 part 2 encoders
    Mpeg4,
    /// Theora encoder
    Theora,
    /// VP8 encoder
    Vp8,
    /// Lossless Huffman YUV
    HuffYuv,
    /// Raw passthrough (identity element)
    Raw,
}

/// Compatible audio codec family, resolved through its own priority list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFamily {
    /// AAC encoders
    Aac,
    /// Ogg Vorbis
    Vorbis,
    /// Opus
    Opus,
}

impl AudioFamily {
    /// Encoder elements to try, in priority order
    pub fn elements(self) -> &'static [&'static str] {
        match self {
            AudioFamily::Aac => &["avenc_aac", "faac", "voaacenc"],
            AudioFamily::Vorbis => &["vorbisenc"],
            AudioFamily::Opus => &["opusenc"],
        }
    }

    /// MIME profile of the encoded audio
    pub fn mime(self) -> &'static str {
        match self {
            AudioFamily::Aac => "audio/mpeg,mpegversion=4",
            AudioFamily::Vorbis => "audio/x-vorbis",
            AudioFamily::Opus => "audio/x-opus",
        }
    }
}

/// One entry of the video fallback chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCandidate {
    /// GStreamer element name
    pub element: String,
    /// Option mapping family
    pub family: CodecFamily,
    /// MIME of the encoded video stream
    pub video_mime: String,
    /// Compatible audio codec family
    pub audio: AudioFamily,
    /// Default muxer element
    pub muxer: String,
    /// MIME of the container
    pub container_mime: String,
}

impl VideoCandidate {
    fn new(
        element: &str,
        family: CodecFamily,
        video_mime: &str,
        audio: AudioFamily,
        muxer: &str,
        container_mime: &str,
    ) -> Self {
        VideoCandidate {
            element: element.into(),
            family,
            video_mime: video_mime.into(),
            audio,
            muxer: muxer.into(),
            container_mime: container_mime.into(),
        }
    }
}

/// Built-in candidate list, sorted by suitability for high quality realtime
/// recording. The first entry that instantiates wins.
pub fn default_candidates() -> Vec<VideoCandidate> {
    vec![
        VideoCandidate::new(
            "x264enc",
            CodecFamily::H264,
            "video/x-h264",
            AudioFamily::Aac,
            "qtmux",
            "video/quicktime",
        ),
        VideoCandidate::new(
            "openh264enc",
            CodecFamily::OpenH264,
            "video/x-h264",
            AudioFamily::Aac,
            "mp4mux",
            "video/quicktime",
        ),
        VideoCandidate::new(
            "avenc_mpeg4",
            CodecFamily::Mpeg4,
            "video/mpeg,mpegversion=4",
            AudioFamily::Aac,
            "avimux",
            "video/x-msvideo",
        ),
        VideoCandidate::new(
            "theoraenc",
            CodecFamily::Theora,
            "video/x-theora",
            AudioFamily::Vorbis,
            "oggmux",
            "application/ogg",
        ),
        VideoCandidate::new(
            "vp8enc",
            CodecFamily::Vp8,
            "video/x-vp8",
            AudioFamily::Vorbis,
            "webmmux",
            "video/webm",
        ),
        VideoCandidate::new(
            "avenc_huffyuv",
            CodecFamily::HuffYuv,
            "video/x-huffyuv",
            AudioFamily::Aac,
            "avimux",
            "video/x-msvideo",
        ),
        VideoCandidate::new(
            "identity",
            CodecFamily::Raw,
            "video/x-raw",
            AudioFamily::Aac,
            "avimux",
            "video/x-msvideo",
        ),
    ]
}

/// File extension matching a container MIME
pub fn container_extension(container_mime: &str) -> &'static str {
    match container_mime {
        "video/quicktime" => "mov",
        "video/x-msvideo" => "avi",
        "application/ogg" => "ogv",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        _ => "mov",
    }
}

impl CodecFamily {
    /// Property carrying the keyframe interval, if the family has one
    pub fn keyframe_property(self) -> Option<&'static str> {
        match self {
            CodecFamily::H264 => Some("key-int-max"),
            CodecFamily::OpenH264 => Some("gop-size"),
            CodecFamily::Mpeg4 => Some("max-key-interval"),
            CodecFamily::Theora => Some("keyframe-force"),
            CodecFamily::Vp8 => Some("max-keyframe-distance"),
            CodecFamily::HuffYuv => Some("gop-size"),
            CodecFamily::Raw => None,
        }
    }

    /// Quality property plus the integer range the 0.0-1.0 scalar maps onto
    pub fn quality_property(self) -> Option<(&'static str, f64)> {
        match self {
            CodecFamily::H264 => Some(("speed-preset", 10.0)),
            CodecFamily::Theora => Some(("quality", 63.0)),
            CodecFamily::Vp8 => Some(("cpu-used", 10.0)),
            _ => None,
        }
    }

    /// Bitrate property unit: factor applied to the kbit/s request
    pub fn bitrate_multiplier(self) -> u32 {
        match self {
            // These encoders take bits per second
            CodecFamily::Mpeg4 | CodecFamily::Vp8 | CodecFamily::HuffYuv => 1024,
            _ => 1,
        }
    }

    /// Whether the family understands the interlaced flag
    pub fn supports_interlacing(self) -> bool {
        matches!(self, CodecFamily::H264 | CodecFamily::Mpeg4)
    }
}

/// Map the 0.0-1.0 quality scalar onto an encoder's integer preset range
pub fn quality_to_preset(quality: f64, scale: f64) -> u32 {
    let quality = quality.clamp(0.0, 1.0);
    (quality * scale + 0.5) as u32
}

/// Encoder element plus the properties to apply to it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncoderPlan {
    /// Element description; the first token is the factory name. Explicit
    /// user descriptions may carry inline parameters.
    pub description: String,
    /// Properties applied on top of the description
    pub properties: Vec<(String, String)>,
}

impl EncoderPlan {
    /// Plan for a bare element
    pub fn element(name: &str) -> Self {
        EncoderPlan {
            description: name.to_string(),
            properties: Vec::new(),
        }
    }

    /// Factory name of the element
    pub fn element_name(&self) -> &str {
        super::spec::element_name(&self.description)
    }

    fn set(&mut self, property: &str, value: impl ToString) {
        self.properties.push((property.into(), value.to_string()));
    }

    /// gst-launch style rendering: description plus properties
    pub fn to_launch_fragment(&self) -> String {
        let mut out = self.description.clone();
        for (property, value) in &self.properties {
            out.push(' ');
            out.push_str(property);
            out.push('=');
            out.push_str(value);
        }
        out
    }
}

/// Build the encoder plan for a candidate, applying the high-level options
/// with the family's property names and units
pub fn plan_video_encoder(candidate: &VideoCandidate, options: &EncodingOptions) -> EncoderPlan {
    let mut plan = EncoderPlan::element(&candidate.element);
    let family = candidate.family;

    if family == CodecFamily::Theora {
        // Realtime-friendly theora defaults
        plan.set("drop-frames", 0);
        plan.set("speed-level", 2);
    }

    if let Some(interlaced) = options.interlaced {
        if family.supports_interlacing() {
            plan.set("interlaced", interlaced as u8);
        }
    }

    match options.keyframe_interval {
        Some(interval) => {
            if let Some(property) = family.keyframe_property() {
                if family == CodecFamily::Theora {
                    plan.set("keyframe-auto", 0);
                }
                plan.set(property, interval);
            }
        }
        None => {
            // Default: a keyframe at least every 30 frames for H.264
            if family == CodecFamily::H264 {
                plan.set("key-int-max", 30);
            }
        }
    }

    if let Some((property, scale)) = family.quality_property() {
        match options.video_quality {
            Some(quality) => plan.set(property, quality_to_preset(quality, scale)),
            // H.264 default: fastest speed at lowest quality, realtime safe
            None if family == CodecFamily::H264 => plan.set(property, 1),
            None => {}
        }
    }

    if let Some(kbps) = options.video_bitrate_kbps {
        if family != CodecFamily::Raw {
            plan.set("bitrate", kbps * family.bitrate_multiplier());
        }
    }

    plan
}

/// Build the encoder plan for an audio element of `family`
pub fn plan_audio_encoder(
    element: &str,
    family: AudioFamily,
    options: &EncodingOptions,
) -> EncoderPlan {
    let mut plan = EncoderPlan::element(element);

    if let Some(quality) = options.audio_quality {
        let quality = quality.clamp(0.0, 1.0);
        match family {
            // Quality scalar maps onto the 0-320 kbit/s bitrate range
            AudioFamily::Aac => plan.set("bitrate", (quality * 320_000.0) as u32),
            AudioFamily::Vorbis => plan.set("quality", format!("{:.6}", quality)),
            AudioFamily::Opus => plan.set("bitrate", (quality * 320_000.0) as u32),
        }
    }

    if let Some(kbps) = options.audio_bitrate_kbps {
        match family {
            AudioFamily::Aac | AudioFamily::Opus => plan.set("bitrate", kbps * 1000),
            AudioFamily::Vorbis => {
                plan.set("managed", 1);
                plan.set("bitrate", kbps * 1000);
            }
        }
    }

    plan
}

/// Muxer element plus its options
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MuxerPlan {
    /// Muxer element name
    pub element: String,
    /// Properties applied at instantiation
    pub properties: Vec<(String, String)>,
}

impl MuxerPlan {
    /// gst-launch style rendering
    pub fn to_launch_fragment(&self) -> String {
        let mut out = self.element.clone();
        for (property, value) in &self.properties {
            out.push(' ');
            out.push_str(property);
            out.push('=');
            out.push_str(value);
        }
        out
    }
}

/// Build the muxer plan, applying muxer-specific container options
pub fn plan_muxer(element: &str, options: &EncodingOptions) -> MuxerPlan {
    let mut properties: Vec<(String, String)> = Vec::new();
    let mut set = |property: &str, value: String| {
        properties.push((property.to_string(), value));
    };

    if element.contains("avimux") {
        // Big file support (>2GB) is on by default; only explicit requests change it
        if let Some(big) = options.big_files {
            set("bigfile", (big as u8).to_string());
        }
    }

    if element.contains("qtmux") || element.contains("mp4mux") {
        if let Some(big) = options.big_files {
            set("large-file", (big as u8).to_string());
        }
        // Fast start defaults on for low-latency playback start
        set(
            "faststart",
            (options.fast_start.unwrap_or(true) as u8).to_string(),
        );
        // Seek index granularity: entries per second of movie time,
        // default one per millisecond
        set(
            "movie-timescale",
            options.index_items_per_sec.unwrap_or(1000).to_string(),
        );
    }

    if element.contains("matroskamux") || element.contains("webmmux") {
        let interval_ns = match options.index_items_per_sec {
            Some(items) if items > 0 => (1e9 / items as f64) as u64,
            _ => 1_000_000,
        };
        set("min-index-interval", interval_ns.to_string());
    }

    MuxerPlan {
        element: element.to_string(),
        properties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order_is_stable() {
        let candidates = default_candidates();
        let names: Vec<&str> = candidates.iter().map(|c| c.element.as_str()).collect();
        assert_eq!(names[0], "x264enc");
        assert_eq!(names[2], "avenc_mpeg4");
        assert_eq!(*names.last().unwrap(), "identity");
    }

    #[test]
    fn test_quality_scalar_mapping() {
        // One scalar, different integer ranges per encoder family
        assert_eq!(quality_to_preset(1.0, 10.0), 10);
        assert_eq!(quality_to_preset(1.0, 63.0), 63);
        assert_eq!(quality_to_preset(0.5, 10.0), 5);
        assert_eq!(quality_to_preset(0.0, 63.0), 0);
        // Out-of-range input clamps instead of overflowing the preset range
        assert_eq!(quality_to_preset(7.5, 10.0), 10);
        assert_eq!(quality_to_preset(-1.0, 63.0), 0);
    }

    #[test]
    fn test_h264_plan_defaults() {
        let candidates = default_candidates();
        let plan = plan_video_encoder(&candidates[0], &EncodingOptions::default());
        assert_eq!(plan.element_name(), "x264enc");
        assert!(plan.properties.contains(&("key-int-max".into(), "30".into())));
        assert!(plan.properties.contains(&("speed-preset".into(), "1".into())));
    }

    #[test]
    fn test_h264_plan_with_options() {
        let candidates = default_candidates();
        let options = EncodingOptions {
            keyframe_interval: Some(15),
            video_quality: Some(0.8),
            video_bitrate_kbps: Some(4000),
            interlaced: Some(true),
            ..Default::default()
        };
        let plan = plan_video_encoder(&candidates[0], &options);
        assert!(plan.properties.contains(&("key-int-max".into(), "15".into())));
        assert!(plan.properties.contains(&("speed-preset".into(), "8".into())));
        assert!(plan.properties.contains(&("bitrate".into(), "4000".into())));
        assert!(plan.properties.contains(&("interlaced".into(), "1".into())));
    }

    #[test]
    fn test_theora_plan_units() {
        let candidates = default_candidates();
        let theora = candidates
            .iter()
            .find(|c| c.element == "theoraenc")
            .unwrap();
        let options = EncodingOptions {
            video_quality: Some(1.0),
            keyframe_interval: Some(60),
            ..Default::default()
        };
        let plan = plan_video_encoder(theora, &options);
        assert!(plan.properties.contains(&("quality".into(), "63".into())));
        assert!(plan.properties.contains(&("keyframe-auto".into(), "0".into())));
        assert!(plan.properties.contains(&("keyframe-force".into(), "60".into())));
    }

    #[test]
    fn test_bitrate_units_per_family() {
        let candidates = default_candidates();
        let options = EncodingOptions {
            video_bitrate_kbps: Some(2000),
            ..Default::default()
        };
        let mpeg4 = candidates
            .iter()
            .find(|c| c.element == "avenc_mpeg4")
            .unwrap();
        let plan = plan_video_encoder(mpeg4, &options);
        // bits per second for the ffmpeg family
        assert!(
            plan.properties
                .contains(&("bitrate".into(), (2000u32 * 1024).to_string()))
        );
    }

    #[test]
    fn test_audio_plan_quality_mapping() {
        let options = EncodingOptions {
            audio_quality: Some(0.5),
            ..Default::default()
        };
        let aac = plan_audio_encoder("avenc_aac", AudioFamily::Aac, &options);
        assert!(aac.properties.contains(&("bitrate".into(), "160000".into())));

        let vorbis = plan_audio_encoder("vorbisenc", AudioFamily::Vorbis, &options);
        assert!(
            vorbis
                .properties
                .iter()
                .any(|(p, v)| p == "quality" && v.starts_with("0.5"))
        );
    }

    #[test]
    fn test_muxer_options() {
        let options = EncodingOptions {
            big_files: Some(true),
            fast_start: Some(false),
            index_items_per_sec: Some(100),
            ..Default::default()
        };
        let qt = plan_muxer("qtmux", &options);
        assert!(qt.properties.contains(&("large-file".into(), "1".into())));
        assert!(qt.properties.contains(&("faststart".into(), "0".into())));
        assert!(qt.properties.contains(&("movie-timescale".into(), "100".into())));

        // Defaults: faststart on, millisecond index granularity
        let qt = plan_muxer("qtmux", &EncodingOptions::default());
        assert!(qt.properties.contains(&("faststart".into(), "1".into())));
        assert!(qt.properties.contains(&("movie-timescale".into(), "1000".into())));

        let webm = plan_muxer("webmmux", &options);
        assert!(
            webm.properties
                .contains(&("min-index-interval".into(), "10000000".into()))
        );
        let webm = plan_muxer("webmmux", &EncodingOptions::default());
        assert!(
            webm.properties
                .contains(&("min-index-interval".into(), "1000000".into()))
        );
    }

    #[test]
    fn test_launch_fragment_rendering() {
        let mut plan = EncoderPlan::element("x264enc");
        plan.set("speed-preset", 1);
        plan.set("bitrate", 4000);
        assert_eq!(
            plan.to_launch_fragment(),
            "x264enc speed-preset=1 bitrate=4000"
        );
    }
}
