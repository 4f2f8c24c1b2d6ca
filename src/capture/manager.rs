// SPDX-License-Identifier: MPL-2.0

//! Handle-based capture API
//!
//! The [`CaptureManager`] owns the device slot table and the process-global
//! parameters. All public operations address devices through integer-backed
//! [`CaptureHandle`]s, so scripting front ends can hold plain numbers while
//! every lookup is generation checked.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{info, warn};

use crate::backend::pipeline::{GstProducer, PipelineConfig, RecordingPlan};
use crate::backend::synthetic::SyntheticProducer;
use crate::backend::{CaptureProducer, DeviceSelector};
use crate::config::Settings;
use crate::errors::{CaptureError, CaptureResult, FetchError};
use crate::recording::builder::{GstRegistry, ResolvedRecording, launch_line, resolve};
use crate::recording::spec::CodecSpec;
use crate::recording::{RecordingFlags, RecordingRequest};

use super::device::{CaptureDevice, DeviceInit, FetchMode, Fetched, RoiRect};
use super::frame::PixelFormat;
use super::negotiate::{RateRequest, SizeRequest};
use super::params::{ParamCommand, ParamReply, ParamValue};
use super::queue::{DropPolicy, FrameQueue};
use super::slots::{CaptureHandle, SlotTable};
use super::state::CaptureState;

/// Parameters of an open request
#[derive(Debug, Clone)]
pub struct OpenRequest {
    /// Which source to open
    pub device: DeviceSelector,
    /// Requested channels per pixel (1, 2, 3 or 4)
    pub channels: u32,
    /// Requested bits per channel (8 or 16)
    pub bit_depth: u32,
    /// Requested frame size
    pub size: SizeRequest,
    /// Region of interest; defaults to the full frame
    pub roi: Option<RoiRect>,
    /// Frame queue depth (0 = unbounded)
    pub buffer_depth: usize,
    /// Queue overflow policy
    pub drop_policy: DropPolicy,
    /// Movie recording request, if any
    pub recording: Option<RecordingRequest>,
    /// Behaviour flags
    pub flags: RecordingFlags,
}

impl Default for OpenRequest {
    fn default() -> Self {
        OpenRequest {
            device: DeviceSelector::Index(0),
            channels: 4,
            bit_depth: 8,
            size: SizeRequest::Auto,
            roi: None,
            buffer_depth: 8,
            drop_policy: DropPolicy::KeepAll,
            recording: None,
            flags: RecordingFlags::default(),
        }
    }
}

/// Addressee of a parameter access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Process-global settings (external protocol: handle -1)
    Global,
    /// One open device
    Device(CaptureHandle),
}

/// Owner of all capture device state
pub struct CaptureManager {
    slots: Mutex<SlotTable<Arc<CaptureDevice>>>,
    /// Source bin spec consumed by the next open of the custom-source device
    pending_source: Mutex<Option<String>>,
    settings: Settings,
}

impl CaptureManager {
    /// Manager with default settings
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Manager with explicit settings
    pub fn with_settings(settings: Settings) -> Self {
        CaptureManager {
            slots: Mutex::new(SlotTable::new()),
            pending_source: Mutex::new(None),
            settings,
        }
    }

    /// The settings this manager was built with
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Open a capture device.
    ///
    /// Builds the recording pipeline first if one was requested, prerolls
    /// the source within a bounded timeout, and only then claims a slot.
    /// Any failure rolls the whole sequence back; no partially opened
    /// record is ever observable.
    pub fn open(&self, request: OpenRequest) -> CaptureResult<CaptureHandle> {
        let format = PixelFormat::from_channels(request.channels).ok_or_else(|| {
            CaptureError::Backend(format!(
                "invalid channel count {}, expected 1-4",
                request.channels
            ))
        })?;
        if request.bit_depth != 8 && request.bit_depth != 16 {
            return Err(CaptureError::Backend(format!(
                "invalid bit depth {}, expected 8 or 16",
                request.bit_depth
            )));
        }

        let selector = self.resolve_selector(request.device.clone())?;
        let queue = Arc::new(FrameQueue::new(request.buffer_depth, request.drop_policy));

        let recording_plan = self.resolve_recording(&request, &selector)?;
        let recording_active = recording_plan.is_some();

        let (producer, friendly_name): (Box<dyn CaptureProducer>, String) = match &selector {
            DeviceSelector::TestPattern => {
                let producer = SyntheticProducer::open(
                    Arc::clone(&queue),
                    request.size,
                    request.roi,
                    format,
                    request.bit_depth,
                )?;
                (Box::new(producer), "Synthetic test pattern".to_string())
            }
            other => {
                let name = match other {
                    DeviceSelector::Index(index) => format!("capture device {}", index),
                    _ => "custom source bin".to_string(),
                };
                let producer = GstProducer::open(PipelineConfig {
                    selector: other.clone(),
                    size: request.size,
                    format,
                    bit_depth: request.bit_depth,
                    roi: request.roi,
                    flags: request.flags,
                    recording: recording_plan,
                    queue: Arc::clone(&queue),
                })?;
                (Box::new(producer), name)
            }
        };

        let device = CaptureDevice::open(DeviceInit {
            producer,
            queue,
            flags: request.flags,
            roi: request.roi,
            recording_active,
            friendly_name,
        })?;

        let mut slots = self.slots.lock().unwrap();
        match slots.allocate(Arc::new(device)) {
            Ok(handle) => {
                info!(handle = %handle, open = slots.open_count(), "Capture device opened");
                Ok(handle)
            }
            Err(e) => {
                // Roll back the fully built device; the caller sees only
                // the slot exhaustion
                drop(slots);
                Err(e)
            }
        }
    }

    /// Start capture on `handle`; returns the authoritative frame rate
    pub fn start(
        &self,
        handle: CaptureHandle,
        rate: RateRequest,
        drop_frames: bool,
        deadline: Option<Instant>,
    ) -> CaptureResult<f64> {
        let device = self.device(handle)?;
        let rate = match rate {
            RateRequest::Auto => None,
            RateRequest::Exact(fps) => Some(fps),
        };
        device.start(rate, drop_frames, deadline)
    }

    /// Fetch a frame from `handle`
    pub fn fetch(&self, handle: CaptureHandle, mode: FetchMode) -> Result<Fetched, FetchError> {
        let device = self.device(handle)?;
        device.fetch(mode)
    }

    /// Stop capture on `handle`; returns the dropped frame count
    pub fn stop(&self, handle: CaptureHandle, drop_frames: bool) -> CaptureResult<u64> {
        let device = self.device(handle)?;
        device.stop(drop_frames)
    }

    /// Close `handle` and free its slot. Closing an already closed handle
    /// is a well-defined `InvalidHandle` error.
    pub fn close(&self, handle: CaptureHandle) -> CaptureResult<()> {
        let device = self.slots.lock().unwrap().free(handle)?;
        device.close();
        Ok(())
    }

    /// Lifecycle state of `handle`
    pub fn state(&self, handle: CaptureHandle) -> CaptureResult<CaptureState> {
        Ok(self.device(handle)?.state())
    }

    /// Uniform parameter protocol over devices and process-global settings
    pub fn set_parameter(
        &self,
        target: Target,
        key: &str,
        value: ParamValue,
    ) -> CaptureResult<ParamReply> {
        match target {
            Target::Global => match ParamCommand::parse(key) {
                ParamCommand::SetNextSourceBin(spec) => {
                    info!(spec = %spec, "Stored source bin for the next custom-source open");
                    *self.pending_source.lock().unwrap() = Some(spec);
                    Ok(ParamReply::Ok)
                }
                _ => Ok(ParamReply::Unsupported),
            },
            Target::Device(handle) => {
                let device = self.device(handle)?;
                Ok(device.set_parameter(key, value))
            }
        }
    }

    /// Resolve a codec spec string into a concrete recording plan without
    /// opening a device
    pub fn resolve_recording_spec(&self, spec: &str) -> CaptureResult<ResolvedRecording> {
        let spec = CodecSpec::parse(spec)?;
        let sound = spec.audio_track.is_some();
        Ok(resolve(&spec, &self.settings.candidates(), &GstRegistry, sound)?)
    }

    /// gst-launch style pipeline fragment for externally-launched movie
    /// writing
    pub fn recording_launch_line(&self, spec: &str) -> CaptureResult<String> {
        Ok(launch_line(&self.resolve_recording_spec(spec)?))
    }

    /// Number of open devices
    pub fn open_count(&self) -> usize {
        self.slots.lock().unwrap().open_count()
    }

    fn device(&self, handle: CaptureHandle) -> CaptureResult<Arc<CaptureDevice>> {
        Ok(Arc::clone(self.slots.lock().unwrap().get(handle)?))
    }

    fn resolve_selector(&self, selector: DeviceSelector) -> CaptureResult<DeviceSelector> {
        match selector {
            DeviceSelector::PendingLaunchBin => {
                match self.pending_source.lock().unwrap().take() {
                    Some(spec) => Ok(DeviceSelector::LaunchBin(spec)),
                    None => Err(CaptureError::Backend(
                        "no pending source bin spec; set one via SetNextCaptureBinSpec= first"
                            .into(),
                    )),
                }
            }
            other => Ok(other),
        }
    }

    fn resolve_recording(
        &self,
        request: &OpenRequest,
        selector: &DeviceSelector,
    ) -> CaptureResult<Option<RecordingPlan>> {
        let Some(recording) = &request.recording else {
            return Ok(None);
        };
        if *selector == DeviceSelector::TestPattern {
            warn!("Recording is not supported on the synthetic source; request ignored");
            return Ok(None);
        }

        gstreamer::init().map_err(|e| CaptureError::Backend(e.to_string()))?;

        let spec_str = if recording.codec_spec.trim().is_empty() {
            self.settings.default_codec_spec.as_str()
        } else {
            recording.codec_spec.as_str()
        };
        let spec = CodecSpec::parse(spec_str)?;
        let resolved = resolve(
            &spec,
            &self.settings.candidates(),
            &GstRegistry,
            request.flags.record_audio(),
        )?;

        // The container decides the real extension
        let target = recording.target.with_extension(resolved.extension());
        Ok(Some(RecordingPlan { resolved, target }))
    }
}

impl Default for CaptureManager {
    fn default() -> Self {
        Self::new()
    }
}
