// SPDX-License-Identifier: MPL-2.0

//! Recording pipeline resolution
//!
//! Turns a parsed [`CodecSpec`] into a concrete (video encoder, audio
//! encoder, muxer) triple. An explicit `VideoCodec=` pins exactly that
//! encoder; otherwise the prioritized candidate chain is walked and the
//! first encoder that exists wins - later candidates are strictly lower
//! priority and are only tried once every higher one has failed.
//!
//! Resolution is separated from instantiation: availability is answered by
//! an [`ElementRegistry`], so the fallback logic is testable without any
//! plugins installed, and the resolved plan can be rendered either as a
//! structured profile (pipeline-managed recording) or as a gst-launch style
//! line (externally-launched recording).

use tracing::{debug, info, warn};

use crate::errors::RecordingError;

use super::candidates::{
    AudioFamily, EncoderPlan, MuxerPlan, VideoCandidate, plan_audio_encoder, plan_muxer,
    plan_video_encoder,
};
use super::spec::{AudioTrack, CodecSpec, element_name};

/// Answers whether a named element can be instantiated
pub trait ElementRegistry {
    /// Whether `element` exists in the registry
    fn is_available(&self, element: &str) -> bool;
}

/// Registry backed by the installed GStreamer plugin set
pub struct GstRegistry;

impl ElementRegistry for GstRegistry {
    fn is_available(&self, element: &str) -> bool {
        gstreamer::ElementFactory::find(element).is_some()
    }
}

/// Fixed registry for tests and dry runs
pub struct StaticRegistry {
    available: Vec<String>,
}

impl StaticRegistry {
    /// Registry containing exactly the given elements
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(elements: I) -> Self {
        StaticRegistry {
            available: elements.into_iter().map(Into::into).collect(),
        }
    }
}

impl ElementRegistry for StaticRegistry {
    fn is_available(&self, element: &str) -> bool {
        self.available.iter().any(|e| e == element)
    }
}

/// Audio side of a resolved recording
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPlan {
    /// Audio encoder
    pub encoder: EncoderPlan,
    /// MIME of the encoded audio
    pub mime: String,
    /// Explicit source bin description, if the caller supplied one
    pub source_bin: Option<String>,
    /// Track layout
    pub track: AudioTrack,
}

/// Fully resolved recording pipeline description
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecording {
    /// Video encoder plan
    pub video: EncoderPlan,
    /// MIME of the encoded video
    pub video_mime: String,
    /// Audio plan, absent for video-only recording
    pub audio: Option<AudioPlan>,
    /// Muxer plan
    pub muxer: MuxerPlan,
    /// MIME of the container
    pub container_mime: String,
}

impl ResolvedRecording {
    /// File extension matching the resolved container
    pub fn extension(&self) -> &'static str {
        super::candidates::container_extension(&self.container_mime)
    }
}

/// Resolve a codec spec against a candidate table.
///
/// `sound_for_recording` requests an audio track even without an
/// `AddAudioTrack` token (the record-audio flag of Open). Failure policy:
/// no video encoder after the chain is exhausted is fatal; a missing audio
/// encoder degrades to video-only with a warning unless the caller demanded
/// a specific one; a missing muxer is fatal.
pub fn resolve(
    spec: &CodecSpec,
    candidates: &[VideoCandidate],
    registry: &dyn ElementRegistry,
    sound_for_recording: bool,
) -> Result<ResolvedRecording, RecordingError> {
    let mut video: Option<EncoderPlan> = None;
    let mut pairing: Option<&VideoCandidate> = None;

    // Explicit VideoCodec= pins that encoder. Without the DEFAULTenc
    // sentinel, its failure aborts the whole build.
    if let Some(description) = &spec.video_codec {
        let name = element_name(description);
        if registry.is_available(name) {
            debug!(encoder = %name, "Using explicitly requested video encoder");
            // The description may carry inline parameters; high-level
            // options are the user's responsibility in this mode.
            video = Some(EncoderPlan {
                description: description.clone(),
                properties: Vec::new(),
            });
            pairing = candidates.iter().find(|c| c.element == name);
        } else if !spec.use_default_chain {
            return Err(RecordingError::CodecUnavailable(format!(
                "requested encoder '{}' is not installed and no fallback was allowed",
                name
            )));
        } else {
            warn!(
                encoder = %name,
                "Requested video encoder not installed, falling back to default chain"
            );
        }
    }

    // Walk the chain: a candidate is tried when the spec names it, or when
    // the default sentinel asks for best-available and nothing higher
    // priority succeeded.
    if video.is_none() {
        for candidate in candidates {
            let mentioned = spec.mentions(&candidate.element);
            if !mentioned && !spec.use_default_chain {
                continue;
            }
            if registry.is_available(&candidate.element) {
                video = Some(plan_video_encoder(candidate, &spec.options));
                pairing = Some(candidate);
                break;
            }
            if mentioned {
                warn!(
                    encoder = %candidate.element,
                    "Requested video encoder not installed"
                );
            }
        }
    }

    let video = video.ok_or_else(|| {
        RecordingError::CodecUnavailable(
            "no usable video encoder found after exhausting the candidate chain".into(),
        )
    })?;

    // Audio requested via the record-audio flag or an AddAudioTrack token
    let use_audio = sound_for_recording || spec.audio_track.is_some();
    let audio = if use_audio {
        resolve_audio(spec, pairing, registry)?
    } else {
        None
    };

    // Muxer: explicit Muxer= wins, else the default implied by the chosen
    // video candidate. VP8 honors container suffix mentions.
    let (muxer_name, container_mime) = if let Some(name) = &spec.muxer {
        (name.clone(), container_mime_for_muxer(name).to_string())
    } else if let Some(candidate) = pairing {
        if candidate.element == "vp8enc" && spec.mentions("_matroska") {
            ("matroskamux".to_string(), "video/x-matroska".to_string())
        } else {
            (candidate.muxer.clone(), candidate.container_mime.clone())
        }
    } else {
        return Err(RecordingError::MuxerUnavailable(
            "no muxer given and none implied by the chosen video encoder".into(),
        ));
    };

    if !registry.is_available(element_name(&muxer_name)) {
        return Err(RecordingError::MuxerUnavailable(format!(
            "muxer '{}' is not installed",
            muxer_name
        )));
    }

    let muxer = plan_muxer(&muxer_name, &spec.options);
    let video_mime = pairing
        .map(|c| c.video_mime.clone())
        .unwrap_or_else(|| "video/x-h264".to_string());

    info!(
        video = %video.element_name(),
        audio = ?audio.as_ref().map(|a| a.encoder.element_name()),
        muxer = %muxer.element,
        "Resolved recording pipeline"
    );

    Ok(ResolvedRecording {
        video,
        video_mime,
        audio,
        muxer,
        container_mime,
    })
}

fn resolve_audio(
    spec: &CodecSpec,
    pairing: Option<&VideoCandidate>,
    registry: &dyn ElementRegistry,
) -> Result<Option<AudioPlan>, RecordingError> {
    let track = spec.audio_track.unwrap_or_default();

    // Explicit AudioCodec= is binding: its absence from the registry is an
    // error rather than silent degradation.
    if let Some(description) = &spec.audio_codec {
        let name = element_name(description);
        if !registry.is_available(name) {
            return Err(RecordingError::AudioUnavailable(format!(
                "requested audio encoder '{}' is not installed",
                name
            )));
        }
        let family = audio_family_for_element(name);
        return Ok(Some(AudioPlan {
            encoder: EncoderPlan {
                description: description.clone(),
                properties: Vec::new(),
            },
            mime: family.mime().to_string(),
            source_bin: spec.audio_source.clone(),
            track,
        }));
    }

    // Preset path: the family paired with the chosen video candidate,
    // resolved through its own shorter priority list.
    let family = pairing.map(|c| c.audio).unwrap_or(AudioFamily::Aac);
    for element in family.elements() {
        if registry.is_available(element) {
            return Ok(Some(AudioPlan {
                encoder: plan_audio_encoder(element, family, &spec.options),
                mime: family.mime().to_string(),
                source_bin: spec.audio_source.clone(),
                track,
            }));
        }
    }

    warn!(
        family = ?family,
        "No audio encoder available, recording without audio"
    );
    Ok(None)
}

fn audio_family_for_element(name: &str) -> AudioFamily {
    if name.contains("vorbis") {
        AudioFamily::Vorbis
    } else if name.contains("opus") {
        AudioFamily::Opus
    } else {
        AudioFamily::Aac
    }
}

fn container_mime_for_muxer(muxer: &str) -> &'static str {
    let name = element_name(muxer);
    match name {
        "qtmux" | "mp4mux" => "video/quicktime",
        "avimux" => "video/x-msvideo",
        "oggmux" => "application/ogg",
        "webmmux" => "video/webm",
        "matroskamux" => "video/x-matroska",
        _ => "video/quicktime",
    }
}

/// Render a resolved recording as a gst-launch style pipeline fragment for
/// externally-launched movie writing.
///
/// Video-only output feeds the encoder straight into the muxer; with audio
/// both branches feed a named muxer.
pub fn launch_line(resolved: &ResolvedRecording) -> String {
    match &resolved.audio {
        None => format!(
            " {} ! {} ",
            resolved.video.to_launch_fragment(),
            resolved.muxer.to_launch_fragment()
        ),
        Some(audio) => {
            let source = match &audio.source_bin {
                Some(bin) => bin.clone(),
                // Default: app-fed audio track with the requested layout
                None => format!(
                    "appsrc name=audiofeed do-timestamp=0 stream-type=0 max-bytes=0 block=1 \
                     is-live=0 emit-signals=0 caps=\"audio/x-raw, format=(string)F32LE, \
                     channels=(int){}, rate=(int){}\" ! audioconvert ! queue",
                    audio.track.channels, audio.track.rate
                ),
            };
            format!(
                " {} ! mux. {} ! {} ! mux. {} name=mux ",
                resolved.video.to_launch_fragment(),
                source,
                audio.encoder.to_launch_fragment(),
                resolved.muxer.to_launch_fragment()
            )
        }
    }
}
