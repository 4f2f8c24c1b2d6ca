// SPDX-License-Identifier: MPL-2.0

//! GStreamer capture pipeline
//!
//! Builds the per-device pipeline: a video source feeding an appsink whose
//! callbacks push mapped buffers into the device queue, with an optional
//! recording branch (encoder, parser, muxer, filesink) split off via a tee.
//! The element layout follows the resolved recording plan; bring-up and
//! state changes are bounded so a wedged pipeline surfaces as a timeout
//! instead of a hang.

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video::VideoInfo;
use gstreamer_video::prelude::*;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::capture::device::RoiRect;
use crate::capture::frame::{Frame, FrameData, PixelFormat};
use crate::capture::negotiate::SizeRequest;
use crate::capture::params::{DeviceControl, ParamReply, ParamValue};
use crate::capture::queue::FrameQueue;
use crate::errors::{CaptureError, CaptureResult};
use crate::recording::RecordingFlags;
use crate::recording::builder::ResolvedRecording;
use crate::recording::candidates::EncoderPlan;

use super::{CaptureProducer, DeviceSelector, NegotiatedFormat};

/// Resolved recording bound to its target file
#[derive(Debug, Clone)]
pub struct RecordingPlan {
    /// Encoder/muxer plans from the fallback resolution
    pub resolved: ResolvedRecording,
    /// Target movie path with the container's extension
    pub target: PathBuf,
}

/// Everything the pipeline needs at build time
pub struct PipelineConfig {
    /// Which source to instantiate
    pub selector: DeviceSelector,
    /// Requested frame size
    pub size: SizeRequest,
    /// Requested channel layout
    pub format: PixelFormat,
    /// Requested bits per channel
    pub bit_depth: u32,
    /// Region of interest
    pub roi: Option<RoiRect>,
    /// Behaviour flags
    pub flags: RecordingFlags,
    /// Recording branch, if any
    pub recording: Option<RecordingPlan>,
    /// Queue the appsink callbacks push into
    pub queue: Arc<FrameQueue>,
}

/// GStreamer-backed frame producer
pub struct GstProducer {
    pipeline: gst::Pipeline,
    source: gst::Element,
    capsfilter: gst::Element,
    appsink: gst_app::AppSink,
    filesink: Option<gst::Element>,
    negotiated: Arc<Mutex<Option<NegotiatedFormat>>>,
    queue: Arc<FrameQueue>,
    size: SizeRequest,
    format: PixelFormat,
    bit_depth: u32,
    recording: bool,
}

impl GstProducer {
    /// Build the pipeline for `config`. Elements are created and linked
    /// but no state transition happens until [`preroll`](CaptureProducer::preroll).
    pub fn open(config: PipelineConfig) -> CaptureResult<Self> {
        gst::init().map_err(|e| CaptureError::Backend(format!("GStreamer init failed: {}", e)))?;

        let pipeline = gst::Pipeline::new();
        let source = create_source(&config.selector)?;

        let videoconvert = make_element("videoconvert")?;
        let videoscale = make_element("videoscale")?;
        let capsfilter = make_element("capsfilter")?;
        capsfilter.set_property("caps", build_caps(&config));

        let crop = match &config.roi {
            None => None,
            Some(roi) => Some(build_crop(roi, config.size)?),
        };

        pipeline
            .add_many([&source, &videoconvert, &videoscale, &capsfilter])
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        link(&source, &videoconvert)?;
        link(&videoconvert, &videoscale)?;
        link(&videoscale, &capsfilter)?;

        // The element the live and recording branches hang off
        let mut head = capsfilter.clone();
        if let Some(crop) = &crop {
            if config.recording.is_none() || config.flags.crop_recording() {
                // Crop is common to both branches
                pipeline
                    .add(crop)
                    .map_err(|e| CaptureError::Backend(e.to_string()))?;
                link(&head, crop)?;
                head = crop.clone();
            }
        }

        let appsink = build_appsink(&config)?;

        let filesink = match &config.recording {
            None => {
                pipeline
                    .add(appsink.upcast_ref::<gst::Element>())
                    .map_err(|e| CaptureError::Backend(e.to_string()))?;
                link(&head, appsink.upcast_ref())?;
                None
            }
            Some(plan) => {
                let tee = make_element("tee")?;
                pipeline
                    .add(&tee)
                    .map_err(|e| CaptureError::Backend(e.to_string()))?;

                // Keep recording framerate stable without touching the
                // live branch, unless the caller wants it shared
                let common_rate = !config.flags.rate_convert_recording_only();
                if common_rate {
                    let videorate = make_element("videorate")?;
                    pipeline
                        .add(&videorate)
                        .map_err(|e| CaptureError::Backend(e.to_string()))?;
                    link(&head, &videorate)?;
                    link(&videorate, &tee)?;
                } else {
                    link(&head, &tee)?;
                }

                // Live branch
                let live_queue = make_element("queue")?;
                pipeline
                    .add_many([&live_queue, appsink.upcast_ref()])
                    .map_err(|e| CaptureError::Backend(e.to_string()))?;
                link(&tee, &live_queue)?;
                let mut live_head = live_queue.clone();
                if let Some(crop) = &crop {
                    if !config.flags.crop_recording() {
                        pipeline
                            .add(crop)
                            .map_err(|e| CaptureError::Backend(e.to_string()))?;
                        link(&live_head, crop)?;
                        live_head = crop.clone();
                    }
                }
                link(&live_head, appsink.upcast_ref())?;

                // Recording branch
                Some(build_recording_branch(
                    &pipeline,
                    &tee,
                    plan,
                    config.flags.rate_convert_recording_only(),
                )?)
            }
        };

        let negotiated = Arc::new(Mutex::new(None));
        wire_callbacks(&appsink, &config, Arc::clone(&negotiated));

        Ok(GstProducer {
            pipeline,
            source,
            capsfilter,
            appsink,
            filesink,
            negotiated,
            queue: config.queue,
            size: config.size,
            format: config.format,
            bit_depth: config.bit_depth,
            recording: config.recording.is_some(),
        })
    }

    fn set_state_bounded(
        &mut self,
        state: gst::State,
        target: &'static str,
        timeout: Duration,
    ) -> CaptureResult<gst::StateChangeSuccess> {
        if self.pipeline.set_state(state).is_err() {
            super::bus::drain(&self.pipeline, false);
            return Err(CaptureError::StateTransitionFailure(format!(
                "transition to {} refused",
                target
            )));
        }
        let (result, _current, _pending) = self
            .pipeline
            .state(gst::ClockTime::from_nseconds(timeout.as_nanos() as u64));
        match result {
            Ok(success) => Ok(success),
            Err(_) => {
                super::bus::drain(&self.pipeline, false);
                // Distinguish a refused transition from one still pending
                let (_, _, pending) = self.pipeline.state(gst::ClockTime::ZERO);
                if pending != gst::State::VoidPending {
                    Err(CaptureError::StateTransitionTimeout { target })
                } else {
                    Err(CaptureError::StateTransitionFailure(format!(
                        "transition to {} failed",
                        target
                    )))
                }
            }
        }
    }

    fn stored_negotiated(&self) -> Option<NegotiatedFormat> {
        *self.negotiated.lock().unwrap()
    }

    /// Read negotiated format off the appsink pad once caps are fixed
    fn pad_negotiated(&self) -> Option<NegotiatedFormat> {
        let caps = self.appsink.static_pad("sink")?.current_caps()?;
        let info = VideoInfo::from_caps(&caps).ok()?;
        let fps = info.fps();
        Some(NegotiatedFormat {
            width: info.width(),
            height: info.height(),
            fps: if fps.denom() != 0 {
                fps.numer() as f64 / fps.denom() as f64
            } else {
                0.0
            },
            format: self.format,
            bit_depth: self.bit_depth,
        })
    }
}

impl CaptureProducer for GstProducer {
    fn preroll(&mut self, timeout: Duration) -> CaptureResult<NegotiatedFormat> {
        self.set_state_bounded(gst::State::Ready, "ready", Duration::from_secs(10))?;
        let outcome = self.set_state_bounded(gst::State::Paused, "paused", Duration::from_secs(10))?;

        if outcome == gst::StateChangeSuccess::NoPreroll {
            // Live sources deliver no buffers before PLAYING; negotiation
            // completes at the first start instead
            debug!("Live source, skipping the preroll buffer wait");
            self.queue.preroll_arrived();
        } else if !self.queue.wait_preroll(timeout) {
            super::bus::drain(&self.pipeline, true);
            if self.queue.eos_seen() {
                return Err(CaptureError::StateTransitionFailure(
                    "premature end of stream during preroll".into(),
                ));
            }
            return Err(CaptureError::StateTransitionTimeout { target: "preroll" });
        }
        super::bus::drain(&self.pipeline, false);

        let negotiated = self
            .stored_negotiated()
            .or_else(|| self.pad_negotiated())
            .unwrap_or(NegotiatedFormat {
                // Nothing negotiated yet: the caps filter will enforce an
                // explicit request once the pipeline plays
                width: match self.size {
                    SizeRequest::Exact { width, .. } => width,
                    SizeRequest::Auto => 0,
                },
                height: match self.size {
                    SizeRequest::Exact { height, .. } => height,
                    SizeRequest::Auto => 0,
                },
                fps: 0.0,
                format: self.format,
                bit_depth: self.bit_depth,
            });

        // An explicit request the device cannot actually deliver fails the
        // open instead of silently capturing at the wrong size
        if let SizeRequest::Exact { width, height } = self.size {
            if negotiated.width != width || negotiated.height != height {
                return Err(CaptureError::UnsupportedResolution { width, height });
            }
        }

        info!(
            width = negotiated.width,
            height = negotiated.height,
            fps = negotiated.fps,
            "Pipeline prerolled"
        );
        Ok(negotiated)
    }

    fn start(&mut self, rate: Option<f64>, timeout: Duration) -> CaptureResult<()> {
        if let Some(fps) = rate {
            // Pin the requested rate in the caps; the device falls back to
            // its default if it cannot honor it
            let mut caps = self.capsfilter.property::<gst::Caps>("caps");
            caps.make_mut()
                .set("framerate", gst::Fraction::new((fps + 0.5) as i32, 1));
            self.capsfilter.set_property("caps", &caps);
        }
        self.set_state_bounded(gst::State::Playing, "playing", timeout)?;
        Ok(())
    }

    fn current_fps(&self) -> f64 {
        self.stored_negotiated()
            .or_else(|| self.pad_negotiated())
            .map(|n| n.fps)
            .unwrap_or(0.0)
    }

    fn stop(&mut self) -> CaptureResult<()> {
        if self.recording {
            // EOS lets the muxer write duration and index before teardown
            debug!("Sending EOS to finalize the recording");
            if !self.pipeline.send_event(gst::event::Eos::new()) {
                warn!("Failed to send EOS to the recording pipeline");
            }
            if let Some(bus) = self.pipeline.bus() {
                let _ = bus.timed_pop_filtered(
                    gst::ClockTime::from_seconds(2),
                    &[gst::MessageType::Eos, gst::MessageType::Error],
                );
            }
        }
        self.set_state_bounded(gst::State::Paused, "paused", Duration::from_secs(10))?;
        self.set_state_bounded(gst::State::Ready, "ready", Duration::from_secs(10))?;
        Ok(())
    }

    fn base_time_nanos(&self) -> u64 {
        self.pipeline
            .base_time()
            .map(|t| t.nseconds())
            .unwrap_or(0)
    }

    fn drain_events(&mut self, wait: bool) {
        super::bus::drain(&self.pipeline, wait);
    }

    fn control(&mut self, control: DeviceControl, auto: bool, value: ParamValue) -> ParamReply {
        let property = control.property();
        let element = source_element(&self.source);

        if !element.has_property(property) {
            return ParamReply::Unsupported;
        }

        let old = read_number(&element, property)
            .map(|raw| raw / control.unit_scale())
            .unwrap_or(f64::MAX);

        if auto {
            let auto_property = format!("{}-auto", property);
            if element.has_property(&auto_property) {
                element.set_property_from_str(&auto_property, "true");
            }
            element.set_property_from_str(property, &format_number(control.auto_value()));
        } else if let ParamValue::Set(new) = value {
            let scaled = new * control.unit_scale();
            let clamped = control.clamp(scaled as i64);
            let auto_property = format!("{}-auto", property);
            if element.has_property(&auto_property) {
                element.set_property_from_str(&auto_property, "false");
            }
            element.set_property_from_str(property, &format_number(clamped as f64));
        }

        ParamReply::Previous(old)
    }

    fn named_control(&mut self, label: &str, value: ParamValue) -> ParamReply {
        let element = source_element(&self.source);
        let Some(balance) = element.dynamic_cast_ref::<gstreamer_video::ColorBalance>() else {
            warn!(label, "Source has no color balance interface for this parameter");
            return ParamReply::Unsupported;
        };

        for channel in balance.list_channels() {
            if channel.label() == label {
                let old = balance.value(&channel) as f64;
                if let ParamValue::Set(new) = value {
                    let clamped =
                        (new as i32).clamp(channel.min_value(), channel.max_value());
                    balance.set_value(&channel, clamped);
                }
                return ParamReply::Previous(old);
            }
        }
        warn!(label, "Unknown device parameter, ignored");
        ParamReply::Unsupported
    }

    fn retarget_recording(&mut self, path: &std::path::Path) -> bool {
        match &self.filesink {
            Some(filesink) => {
                filesink.set_property("location", path.to_string_lossy().as_ref());
                true
            }
            None => false,
        }
    }

    fn shutdown(&mut self) {
        super::bus::drain(&self.pipeline, false);
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

impl Drop for GstProducer {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

fn make_element(name: &str) -> CaptureResult<gst::Element> {
    gst::ElementFactory::make(name)
        .build()
        .map_err(|e| CaptureError::Backend(format!("failed to create {}: {}", name, e)))
}

fn link(src: &gst::Element, dst: &gst::Element) -> CaptureResult<()> {
    src.link(dst).map_err(|_| {
        CaptureError::Backend(format!(
            "failed to link {} to {}",
            src.name(),
            dst.name()
        ))
    })
}

fn create_source(selector: &DeviceSelector) -> CaptureResult<gst::Element> {
    match selector {
        DeviceSelector::Index(index) => {
            let source = make_element("v4l2src")?;
            source.set_property("device", format!("/dev/video{}", index));
            Ok(source)
        }
        DeviceSelector::TestPattern => {
            let source = make_element("videotestsrc")?;
            source.set_property_from_str("is-live", "true");
            Ok(source)
        }
        DeviceSelector::LaunchBin(description) => {
            info!(description = %description, "Creating source from launch bin description");
            let bin = gst::parse::bin_from_description(description, true).map_err(|e| {
                CaptureError::Backend(format!("source bin description rejected: {}", e))
            })?;
            Ok(bin.upcast())
        }
        DeviceSelector::PendingLaunchBin => Err(CaptureError::Backend(
            "pending source bin must be resolved before pipeline construction".into(),
        )),
    }
}

fn video_format_string(format: PixelFormat, bit_depth: u32) -> &'static str {
    match (format, bit_depth) {
        (PixelFormat::Gray, 16) => "GRAY16_LE",
        (PixelFormat::Gray, _) => "GRAY8",
        (PixelFormat::Yuyv, _) => "YUY2",
        (PixelFormat::Rgb, 8) => "RGB",
        (PixelFormat::Rgb, _) | (PixelFormat::Rgba, 16) => "RGBA64_LE",
        (PixelFormat::Rgba, _) => "RGBA",
    }
}

fn build_caps(config: &PipelineConfig) -> gst::Caps {
    let mut builder = gst::Caps::builder("video/x-raw").field(
        "format",
        video_format_string(config.format, config.bit_depth),
    );
    if let SizeRequest::Exact { width, height } = config.size {
        builder = builder
            .field("width", width as i32)
            .field("height", height as i32);
    }
    builder.build()
}

fn build_crop(roi: &RoiRect, size: SizeRequest) -> CaptureResult<gst::Element> {
    let crop = make_element("videocrop")?;
    match size {
        SizeRequest::Exact { width, height } => {
            if roi.x + roi.width > width || roi.y + roi.height > height {
                return Err(CaptureError::Backend(format!(
                    "ROI {}x{}+{}+{} exceeds the {}x{} frame",
                    roi.width, roi.height, roi.x, roi.y, width, height
                )));
            }
            crop.set_property("left", roi.x as i32);
            crop.set_property("top", roi.y as i32);
            crop.set_property("right", (width - roi.x - roi.width) as i32);
            crop.set_property("bottom", (height - roi.y - roi.height) as i32);
        }
        SizeRequest::Auto => {
            // Without a fixed source size the crop margins are unknowable
            // at build time; deliver full frames instead of guessing
            warn!("ROI requires an explicit capture resolution, ignoring the ROI");
        }
    }
    Ok(crop)
}

fn build_appsink(config: &PipelineConfig) -> CaptureResult<gst_app::AppSink> {
    let appsink = make_element("appsink")?
        .dynamic_cast::<gst_app::AppSink>()
        .map_err(|_| CaptureError::Backend("failed to cast appsink".into()))?;

    let caps = gst::Caps::builder("video/x-raw")
        .field(
            "format",
            video_format_string(config.format, config.bit_depth),
        )
        .build();
    appsink.set_caps(Some(&caps));
    appsink.set_property("emit-signals", false);
    appsink.set_property("sync", false);
    // The device queue owns the drop decision; the sink keeps only a small
    // handoff buffer and never discards
    appsink.set_property("max-buffers", 2u32);
    appsink.set_property("drop", false);
    appsink.set_property("enable-last-sample", false);
    Ok(appsink)
}

fn wire_callbacks(
    appsink: &gst_app::AppSink,
    config: &PipelineConfig,
    negotiated: Arc<Mutex<Option<NegotiatedFormat>>>,
) {
    let queue = Arc::clone(&config.queue);
    let preroll_queue = Arc::clone(&config.queue);
    let eos_queue = Arc::clone(&config.queue);
    let preroll_negotiated = negotiated;
    let format = config.format;
    let bit_depth = config.bit_depth;

    appsink.set_callbacks(
        gst_app::AppSinkCallbacks::builder()
            .new_preroll(move |sink| {
                let sample = sink.pull_preroll().map_err(|_| gst::FlowError::Error)?;
                if let Some(caps) = sample.caps() {
                    if let Ok(video_info) = VideoInfo::from_caps(caps) {
                        let fps = video_info.fps();
                        let fps = if fps.denom() != 0 {
                            fps.numer() as f64 / fps.denom() as f64
                        } else {
                            0.0
                        };
                        *preroll_negotiated.lock().unwrap() = Some(NegotiatedFormat {
                            width: video_info.width(),
                            height: video_info.height(),
                            fps,
                            format,
                            bit_depth,
                        });
                    }
                }
                preroll_queue.preroll_arrived();
                Ok(gst::FlowSuccess::Ok)
            })
            .new_sample(move |sink| {
                let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                let (width, height) = match sample.caps().and_then(|c| VideoInfo::from_caps(c).ok())
                {
                    Some(info) => (info.width(), info.height()),
                    None => (0, 0),
                };
                let Some(buffer) = sample.buffer_owned() else {
                    return Ok(gst::FlowSuccess::Ok);
                };
                let pts_nanos = buffer.pts().map(|t| t.nseconds());
                // Zero-copy handoff: the mapped buffer lives until the
                // consumer drops the frame
                let Ok(mapped) = buffer.into_mapped_buffer_readable() else {
                    warn!("Failed to map capture buffer, frame lost");
                    return Ok(gst::FlowSuccess::Ok);
                };
                queue.push(Frame {
                    data: FrameData::from_mapped_buffer(mapped),
                    width,
                    height,
                    format,
                    bit_depth,
                    pts_nanos,
                });
                Ok(gst::FlowSuccess::Ok)
            })
            .eos(move |_| {
                debug!("Video sink reached end of stream");
                eos_queue.mark_eos();
                eos_queue.terminate();
            })
            .build(),
    );
}

/// Instantiate an encoder plan: plain elements by factory name,
/// descriptions with inline parameters via the bin parser
fn instantiate_plan(plan: &EncoderPlan) -> CaptureResult<gst::Element> {
    let element = if plan.description.contains(char::is_whitespace) {
        gst::parse::bin_from_description(&plan.description, true)
            .map_err(|e| {
                CaptureError::Recording(crate::errors::RecordingError::CodecUnavailable(format!(
                    "encoder description '{}' rejected: {}",
                    plan.description, e
                )))
            })?
            .upcast()
    } else {
        make_element(&plan.description)?
    };
    apply_properties(&element, &plan.properties);
    Ok(element)
}

fn apply_properties(element: &gst::Element, properties: &[(String, String)]) {
    for (property, value) in properties {
        if element.has_property(property) {
            element.set_property_from_str(property, value);
            debug!(element = %element.name(), property = %property, value = %value, "Applied property");
        } else {
            debug!(element = %element.name(), property = %property, "Property not supported, skipped");
        }
    }
}

/// Parser element smoothing the encoder-muxer link, per stream format
fn parser_for_mime(video_mime: &str) -> Option<&'static str> {
    if video_mime.contains("x-h264") {
        Some("h264parse")
    } else if video_mime.contains("mpeg") {
        Some("mpeg4videoparse")
    } else {
        None
    }
}

fn build_recording_branch(
    pipeline: &gst::Pipeline,
    tee: &gst::Element,
    plan: &RecordingPlan,
    rate_convert_here: bool,
) -> CaptureResult<gst::Element> {
    let record_queue = make_element("queue")?;
    let encoder = instantiate_plan(&plan.resolved.video)?;

    let parser = parser_for_mime(&plan.resolved.video_mime).and_then(|name| {
        match gst::ElementFactory::make(name).build() {
            Ok(parser) => Some(parser),
            Err(e) => {
                warn!(parser = name, error = %e, "Parser unavailable, linking encoder directly");
                None
            }
        }
    });

    let muxer = make_element(&plan.resolved.muxer.element)?;
    apply_properties(&muxer, &plan.resolved.muxer.properties);

    let filesink = make_element("filesink")?;
    filesink.set_property("location", plan.target.to_string_lossy().as_ref());
    info!(path = %plan.target.display(), "Recording to file");

    pipeline
        .add_many([&record_queue, &encoder, &muxer, &filesink])
        .map_err(|e| CaptureError::Backend(e.to_string()))?;

    link(tee, &record_queue)?;
    let mut head = record_queue.clone();

    if rate_convert_here {
        let videorate = make_element("videorate")?;
        pipeline
            .add(&videorate)
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        link(&head, &videorate)?;
        head = videorate;
    }

    link(&head, &encoder)?;
    if let Some(parser) = &parser {
        pipeline
            .add(parser)
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        link(&encoder, parser)?;
        link(parser, &muxer)?;
    } else {
        link(&encoder, &muxer)?;
    }
    link(&muxer, &filesink)?;

    // Audio branch feeds the same muxer
    if let Some(audio) = &plan.resolved.audio {
        let audio_source: gst::Element = match &audio.source_bin {
            Some(description) => gst::parse::bin_from_description(description, true)
                .map_err(|e| {
                    CaptureError::Backend(format!("audio source description rejected: {}", e))
                })?
                .upcast(),
            None => make_element("autoaudiosrc")?,
        };
        let audio_queue = make_element("queue")?;
        let audioconvert = make_element("audioconvert")?;
        let audioresample = make_element("audioresample")?;
        let audio_encoder = instantiate_plan(&audio.encoder)?;

        pipeline
            .add_many([
                &audio_source,
                &audio_queue,
                &audioconvert,
                &audioresample,
                &audio_encoder,
            ])
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        link(&audio_source, &audio_queue)?;
        link(&audio_queue, &audioconvert)?;
        link(&audioconvert, &audioresample)?;
        link(&audioresample, &audio_encoder)?;
        link(&audio_encoder, &muxer)?;
    }

    Ok(filesink)
}

fn source_element(source: &gst::Element) -> gst::Element {
    // Launch bin sources wrap the real element; controls live on the
    // innermost source
    match source.downcast_ref::<gst::Bin>() {
        Some(bin) => bin
            .iterate_sources()
            .into_iter()
            .flatten()
            .next()
            .unwrap_or_else(|| source.clone()),
        None => source.clone(),
    }
}

fn read_number(element: &gst::Element, property: &str) -> Option<f64> {
    let value = element.property_value(property);
    if let Ok(v) = value.get::<f64>() {
        return Some(v);
    }
    if let Ok(v) = value.get::<f32>() {
        return Some(v as f64);
    }
    if let Ok(v) = value.get::<i32>() {
        return Some(v as f64);
    }
    if let Ok(v) = value.get::<u32>() {
        return Some(v as f64);
    }
    if let Ok(v) = value.get::<i64>() {
        return Some(v as f64);
    }
    if let Ok(v) = value.get::<u64>() {
        return Some(v as f64);
    }
    if let Ok(v) = value.get::<bool>() {
        return Some(v as u8 as f64);
    }
    None
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
