// SPDX-License-Identifier: MPL-2.0

//! Per-device capture orchestration
//!
//! A [`CaptureDevice`] ties one backend producer to one frame queue and
//! drives the lifecycle state machine across Open/Start/Fetch/Stop/Close.
//! The producer pushes asynchronously; the caller's threads fetch, so all
//! mutable device state sits behind locks and the stop path orders the
//! state transition before waking blocked consumers.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::backend::{CaptureProducer, NegotiatedFormat};
use crate::errors::{CaptureError, CaptureResult, FetchError};
use crate::recording::RecordingFlags;

use super::frame::Frame;
use super::params::{ParamCommand, ParamReply, ParamValue};
use super::queue::{BlockMode, FrameQueue, PopError};
use super::state::CaptureState;

/// Bounded wait for pipeline readiness during open
pub const PREROLL_TIMEOUT: Duration = Duration::from_secs(30);
/// Bounded wait for the first live frame during start
pub const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(10);
/// Default bounded wait of a blocking fetch
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Region of interest in full-frame coordinates; drives the dimensions of
/// delivered frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiRect {
    /// Left edge in pixels
    pub x: u32,
    /// Top edge in pixels
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Blocking behaviour of fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Return immediately if no frame is queued
    NonBlocking,
    /// Wait up to [`FETCH_TIMEOUT`] for a frame
    Blocking,
    /// Grant the backend processing time only; never returns a frame
    NoOp,
}

/// A fetched frame plus its delivery statistics
#[derive(Debug, Clone)]
pub struct Fetched {
    /// The frame
    pub frame: Frame,
    /// Capture timestamp in seconds: absolute time, or pipeline running
    /// time when the pipeline-timestamps flag is set
    pub timestamp: f64,
    /// Frames dropped since start to keep delivery recent
    pub dropped: u64,
    /// Frames still queued behind this one
    pub pending: usize,
}

struct Session {
    negotiated: Option<NegotiatedFormat>,
    fps: f64,
    /// Pipeline base time snapshot taken at stop, for post-stop fetches
    saved_base_time_nanos: u64,
    /// Frames discarded at fetch time in most-recent-only mode
    fetch_dropped: u64,
    frames_fetched: u64,
    /// Deliver only the most recent frame, discarding backlog at fetch
    drop_at_fetch: bool,
    movie_path: Option<PathBuf>,
}

/// Everything needed to construct a device
pub struct DeviceInit {
    /// Backend producer, not yet prerolled
    pub producer: Box<dyn CaptureProducer>,
    /// The queue the producer pushes into
    pub queue: Arc<FrameQueue>,
    /// Behaviour flags
    pub flags: RecordingFlags,
    /// Region of interest, if any
    pub roi: Option<RoiRect>,
    /// Whether a recording pipeline is attached
    pub recording_active: bool,
    /// Human-readable device name for queries
    pub friendly_name: String,
}

/// One open capture device
pub struct CaptureDevice {
    queue: Arc<FrameQueue>,
    flags: RecordingFlags,
    roi: Option<RoiRect>,
    recording_active: bool,
    friendly_name: String,
    state: Mutex<CaptureState>,
    producer: Mutex<Box<dyn CaptureProducer>>,
    session: Mutex<Session>,
}

impl CaptureDevice {
    /// Open a device: preroll the producer within the bounded timeout and
    /// move it to Ready.
    ///
    /// On any failure the producer is shut down before the error
    /// propagates, so no partially constructed record survives.
    pub fn open(init: DeviceInit) -> CaptureResult<Self> {
        let DeviceInit {
            mut producer,
            queue,
            flags,
            roi,
            recording_active,
            friendly_name,
        } = init;

        debug!(device = %friendly_name, "Opening capture device");

        let negotiated = if flags.skip_preroll() {
            debug!("Preroll skipped by flags");
            None
        } else {
            match producer.preroll(PREROLL_TIMEOUT) {
                Ok(negotiated) => Some(negotiated),
                Err(e) => {
                    // Roll back: release everything the producer built
                    producer.drain_events(false);
                    producer.shutdown();
                    return Err(e);
                }
            }
        };

        if queue.eos_seen() {
            producer.shutdown();
            return Err(CaptureError::StateTransitionFailure(
                "premature end of stream during preroll".into(),
            ));
        }

        if let Some(negotiated) = &negotiated {
            info!(
                device = %friendly_name,
                width = negotiated.width,
                height = negotiated.height,
                fps = negotiated.fps,
                "Capture device ready"
            );
        }

        Ok(CaptureDevice {
            queue,
            flags,
            roi,
            recording_active,
            friendly_name,
            state: Mutex::new(CaptureState::Ready),
            producer: Mutex::new(producer),
            session: Mutex::new(Session {
                negotiated,
                fps: negotiated.map(|n| n.fps).unwrap_or(0.0),
                saved_base_time_nanos: 0,
                fetch_dropped: 0,
                frames_fetched: 0,
                drop_at_fetch: false,
                movie_path: None,
            }),
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> CaptureState {
        *self.state.lock().unwrap()
    }

    /// The device's frame queue (producer side wiring, statistics)
    pub fn queue(&self) -> &Arc<FrameQueue> {
        &self.queue
    }

    /// Start capture: flush stale frames, reset statistics, start the
    /// producer and wait for the first live frame.
    ///
    /// `drop_frames` selects most-recent-only delivery for this run.
    /// Starting an already capturing device is an error and leaves its
    /// counters and queue untouched. Returns the authoritative frame rate.
    pub fn start(
        &self,
        rate: Option<f64>,
        drop_frames: bool,
        deadline: Option<Instant>,
    ) -> CaptureResult<f64> {
        let mut state = self.state.lock().unwrap();
        if !state.can_transition(CaptureState::Capturing) {
            return Err(CaptureError::InvalidState {
                state: *state,
                operation: "start capture",
            });
        }

        {
            let mut session = self.session.lock().unwrap();
            session.drop_at_fetch = drop_frames;
            session.fetch_dropped = 0;
            session.frames_fetched = 0;
            session.saved_base_time_nanos = 0;
        }

        // Flush anything a previous run left behind, then open the gate
        // for the producer
        self.queue.reset_for_start();

        // Honor a requested start deadline before going live
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }

        let mut producer = self.producer.lock().unwrap();
        if let Err(e) = producer.start(rate, FIRST_FRAME_TIMEOUT) {
            producer.drain_events(false);
            self.queue.terminate();
            return Err(e);
        }

        // The negotiated rate is only authoritative once a real frame
        // has arrived
        if !self.flags.no_live_feedback() && !self.queue.wait_first_frame(FIRST_FRAME_TIMEOUT) {
            warn!(
                device = %self.friendly_name,
                "No frame arrived within the start timeout, continuing anyway"
            );
        }
        producer.drain_events(false);
        let live_fps = producer.current_fps();
        drop(producer);

        let fps = {
            let mut session = self.session.lock().unwrap();
            // Prefer what the producer actually runs at, then the request,
            // then the preroll estimate
            session.fps = if live_fps > 0.0 {
                live_fps
            } else if let Some(rate) = rate {
                rate
            } else {
                session.negotiated.map(|n| n.fps).unwrap_or(0.0)
            };
            session.fps
        };

        *state = CaptureState::Capturing;
        info!(device = %self.friendly_name, fps, "Capture started");
        Ok(fps)
    }

    /// Fetch one frame according to `mode`.
    ///
    /// Polling loops are the expected usage: `NotReady` means try again,
    /// `Terminated` means the device must be restarted before any frame
    /// can arrive.
    pub fn fetch(&self, mode: FetchMode) -> Result<Fetched, FetchError> {
        {
            let mut producer = self.producer.lock().unwrap();
            producer.drain_events(false);
        }

        // Pure disk recording delivers no frames to fetch
        if self.flags.no_live_feedback() {
            return Err(FetchError::NotReady);
        }
        if mode == FetchMode::NoOp {
            return Err(FetchError::NotReady);
        }

        // Most-recent-only delivery: discard the backlog first
        if self.session.lock().unwrap().drop_at_fetch {
            let mut discarded = 0u64;
            while self.queue.len() > 1 {
                if self.queue.pop(BlockMode::NonBlocking).is_err() {
                    break;
                }
                discarded += 1;
            }
            if discarded > 0 {
                self.session.lock().unwrap().fetch_dropped += discarded;
            }
        }

        let block = match mode {
            FetchMode::NonBlocking => BlockMode::NonBlocking,
            FetchMode::Blocking => BlockMode::BoundedWait(FETCH_TIMEOUT),
            FetchMode::NoOp => unreachable!(),
        };

        let frame = self.queue.pop(block).map_err(|e| match e {
            PopError::Empty => FetchError::NotReady,
            PopError::Terminated => FetchError::Terminated,
        })?;

        // Lock order is producer before session throughout, so take the
        // live base time first
        let live_base_nanos = if self.flags.pipeline_timestamps() {
            0
        } else {
            self.producer.lock().unwrap().base_time_nanos()
        };

        let mut session = self.session.lock().unwrap();
        session.frames_fetched += 1;

        // Frames fetched after stop are timestamped against the base time
        // snapshot taken at stop
        let base_nanos = if self.flags.pipeline_timestamps() || live_base_nanos != 0 {
            live_base_nanos
        } else {
            session.saved_base_time_nanos
        };
        let timestamp = (frame.pts_nanos.unwrap_or(0) + base_nanos) as f64 / 1e9;

        Ok(Fetched {
            frame,
            timestamp,
            dropped: self.queue.dropped() + session.fetch_dropped,
            pending: self.queue.len(),
        })
    }

    /// Stop capture.
    ///
    /// Quiesces the producer, then terminates the queue so concurrent
    /// blocking fetches observe `Terminated`. With `drop_frames` the
    /// backlog is drained; otherwise remaining frames stay fetchable.
    /// Returns the total number of dropped frames for this run.
    pub fn stop(&self, drop_frames: bool) -> CaptureResult<u64> {
        let mut state = self.state.lock().unwrap();
        match *state {
            CaptureState::Capturing => {}
            // Stopping a device that isn't capturing is a no-op
            CaptureState::Ready => return Ok(self.dropped_total()),
            other => {
                return Err(CaptureError::InvalidState {
                    state: other,
                    operation: "stop capture",
                });
            }
        }
        *state = CaptureState::Stopping;

        let mut producer = self.producer.lock().unwrap();

        // Snapshot the pipeline clock for post-stop timestamp correction
        {
            let mut session = self.session.lock().unwrap();
            session.saved_base_time_nanos = producer.base_time_nanos();
        }

        if let Err(e) = producer.stop() {
            warn!(device = %self.friendly_name, error = %e, "Producer stop reported failure");
        }
        producer.drain_events(false);
        drop(producer);

        // State first, then wake consumers: blocked pops must observe
        // Terminated, not their timeout
        self.queue.terminate();

        if drop_frames {
            let drained = self.queue.drain(usize::MAX);
            debug!(device = %self.friendly_name, drained, "Drained queued frames at stop");
        }

        let dropped = self.dropped_total();
        let session = self.session.lock().unwrap();
        if dropped > 0 {
            info!(
                device = %self.friendly_name,
                dropped,
                "Capture dropped frames to stay in sync with realtime"
            );
        }
        debug!(
            device = %self.friendly_name,
            fetched = session.frames_fetched,
            "Capture stopped"
        );
        drop(session);

        *state = CaptureState::Ready;
        Ok(dropped)
    }

    /// Close the device, forcing a stop first if it is capturing. The
    /// producer is quiescent before any resource is released.
    pub fn close(&self) {
        let capturing = self.state() == CaptureState::Capturing;
        if capturing {
            if let Err(e) = self.stop(true) {
                warn!(device = %self.friendly_name, error = %e, "Stop during close failed");
            }
        }

        let mut state = self.state.lock().unwrap();
        *state = CaptureState::Closed;
        drop(state);

        self.queue.terminate();
        let drained = self.queue.drain(usize::MAX);
        if drained > 0 {
            debug!(device = %self.friendly_name, drained, "Released queued frames at close");
        }

        let mut producer = self.producer.lock().unwrap();
        producer.drain_events(false);
        producer.shutdown();
        info!(device = %self.friendly_name, "Capture device closed");
    }

    /// Total frames dropped this run: queue overflow drops plus
    /// most-recent-only fetch discards
    pub fn dropped_total(&self) -> u64 {
        self.queue.dropped() + self.session.lock().unwrap().fetch_dropped
    }

    /// Target movie path set via `SetNewMoviename=`, if any
    pub fn recording_target(&self) -> Option<PathBuf> {
        self.session.lock().unwrap().movie_path.clone()
    }

    /// Uniform string-keyed parameter access; see
    /// [`ParamCommand`](super::params::ParamCommand) for the key grammar
    pub fn set_parameter(&self, key: &str, value: ParamValue) -> ParamReply {
        match ParamCommand::parse(key) {
            ParamCommand::SetNextSourceBin(_) => {
                warn!("SetNextCaptureBinSpec addresses the process-global target, not a device");
                ParamReply::Rejected
            }
            ParamCommand::SetMovieName {
                path,
                codec_change_requested,
            } => self.rename_movie(path, codec_change_requested),
            ParamCommand::TriggerCount => {
                // Hardware trigger counters don't exist on this backend
                ParamReply::Rejected
            }
            ParamCommand::PrintParameters => {
                info!(
                    "Controllable parameters: Shutter, Aperture, EVCompensation, Flickermode, \
                     Whitebalancemode, Flashmode, Scenemode, Focusmode, Gain, plus any \
                     backend-reported channel by label"
                );
                ParamReply::Ok
            }
            ParamCommand::GetFramerate => {
                ParamReply::Previous(self.session.lock().unwrap().fps)
            }
            ParamCommand::GetRoi => {
                let rect = match (self.roi, self.session.lock().unwrap().negotiated) {
                    (Some(roi), _) => [
                        roi.x as f64,
                        roi.y as f64,
                        (roi.x + roi.width) as f64,
                        (roi.y + roi.height) as f64,
                    ],
                    (None, Some(n)) => [0.0, 0.0, n.width as f64, n.height as f64],
                    (None, None) => [0.0, 0.0, 0.0, 0.0],
                };
                ParamReply::Rect(rect)
            }
            ParamCommand::GetVendorName => ParamReply::Text("Unknown Vendor".into()),
            ParamCommand::GetModelName => ParamReply::Text(self.friendly_name.clone()),
            ParamCommand::Control { control, auto } => {
                self.producer.lock().unwrap().control(control, auto, value)
            }
            ParamCommand::Named(label) => {
                self.producer.lock().unwrap().named_control(&label, value)
            }
        }
    }

    fn rename_movie(&self, path: String, codec_change_requested: bool) -> ParamReply {
        if !self.recording_active {
            warn!(
                device = %self.friendly_name,
                "Tried to change the target movie file, but recording is not enabled"
            );
            return ParamReply::Rejected;
        }
        if codec_change_requested {
            warn!("Changing the recording codec requires reopening the device; ignored");
        }

        let path = PathBuf::from(path);
        self.producer.lock().unwrap().retarget_recording(&path);
        info!(device = %self.friendly_name, path = %path.display(), "Recording retargeted");
        self.session.lock().unwrap().movie_path = Some(path);
        ParamReply::Ok
    }
}

impl Drop for CaptureDevice {
    fn drop(&mut self) {
        if self.state() != CaptureState::Closed {
            self.close();
        }
    }
}
