// SPDX-License-Identifier: MPL-2.0

//! Synthetic test pattern producer
//!
//! A hardware-free backend that generates frames on a producer thread at a
//! fixed rate. Used for the test-pattern device index, and by the test
//! suites to exercise the full device lifecycle without a camera or a
//! GStreamer runtime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::capture::device::RoiRect;
use crate::capture::frame::{Frame, PixelFormat};
use crate::capture::loop_runner::{LoopAction, ProducerLoop};
use crate::capture::negotiate::{CaptureMode, RateSet, SizeRequest, negotiate_mode};
use crate::capture::params::{DeviceControl, ParamReply, ParamValue};
use crate::capture::queue::FrameQueue;
use crate::errors::CaptureResult;

use super::{CaptureProducer, NegotiatedFormat};

/// Pattern source producing frames from a dedicated thread
pub struct SyntheticProducer {
    queue: Arc<FrameQueue>,
    negotiated: NegotiatedFormat,
    producer: Option<ProducerLoop>,
    controls: HashMap<DeviceControl, (f64, bool)>,
    named: HashMap<&'static str, f64>,
}

impl SyntheticProducer {
    /// Capture modes the pattern source advertises
    pub fn modes() -> Vec<CaptureMode> {
        [(320, 240), (640, 480), (1280, 720)]
            .into_iter()
            .map(|(width, height)| CaptureMode {
                width,
                height,
                bits_per_pixel: Some(24),
                rates: RateSet::Range(1.0, 120.0),
            })
            .collect()
    }

    /// Negotiate the request against the advertised modes and build a
    /// producer for the resulting format
    pub fn open(
        queue: Arc<FrameQueue>,
        size: SizeRequest,
        roi: Option<RoiRect>,
        format: PixelFormat,
        bit_depth: u32,
    ) -> CaptureResult<Self> {
        let negotiated = negotiate_mode(&Self::modes(), size, format.channels(), bit_depth)?;

        // The ROI sub-rectangle drives delivered frame dimensions
        let (width, height) = match roi {
            Some(roi) => (roi.width, roi.height),
            None => (negotiated.width, negotiated.height),
        };

        // Named channels a real camera would expose through color balance
        let named = HashMap::from([("Brightness", 128.0), ("Contrast", 128.0)]);

        Ok(SyntheticProducer {
            queue,
            negotiated: NegotiatedFormat {
                width,
                height,
                fps: 30.0,
                format,
                bit_depth,
            },
            producer: None,
            controls: HashMap::new(),
            named,
        })
    }
}

impl CaptureProducer for SyntheticProducer {
    fn preroll(&mut self, _timeout: Duration) -> CaptureResult<NegotiatedFormat> {
        // Pattern data is available instantly
        self.queue.preroll_arrived();
        Ok(self.negotiated)
    }

    fn start(&mut self, rate: Option<f64>, _timeout: Duration) -> CaptureResult<()> {
        let fps = match rate {
            Some(fps) if fps > 0.0 => fps,
            _ => self.negotiated.fps,
        };
        self.negotiated.fps = fps;
        let interval = Duration::from_secs_f64(1.0 / fps);
        let interval_nanos = interval.as_nanos() as u64;

        let queue = Arc::clone(&self.queue);
        let format = self.negotiated;
        let frame_len = (format.width * format.height * format.format.channels()) as usize
            * (format.bit_depth as usize / 8);

        let mut seq: u64 = 0;
        self.producer = Some(ProducerLoop::spawn("synthetic-capture", move || {
            let frame = Frame::from_bytes(
                vec![(seq % 256) as u8; frame_len],
                format.width,
                format.height,
                format.format,
                format.bit_depth,
                Some(seq * interval_nanos),
            );
            queue.push(frame);
            seq += 1;
            std::thread::sleep(interval);
            LoopAction::Continue
        }));
        Ok(())
    }

    fn stop(&mut self) -> CaptureResult<()> {
        if let Some(mut producer) = self.producer.take() {
            producer.stop();
        }
        Ok(())
    }

    fn current_fps(&self) -> f64 {
        self.negotiated.fps
    }

    fn base_time_nanos(&self) -> u64 {
        0
    }

    fn drain_events(&mut self, _wait: bool) {}

    fn control(&mut self, control: DeviceControl, auto: bool, value: ParamValue) -> ParamReply {
        let entry = self
            .controls
            .entry(control)
            .or_insert((control.auto_value(), true));
        let old = entry.0;
        if auto {
            *entry = (control.auto_value(), true);
        } else if let ParamValue::Set(new) = value {
            let clamped = control.clamp(new as i64) as f64;
            *entry = (clamped, false);
        }
        debug!(?control, old, "Synthetic control access");
        ParamReply::Previous(old)
    }

    fn named_control(&mut self, label: &str, value: ParamValue) -> ParamReply {
        match self.named.get_mut(label) {
            Some(stored) => {
                let old = *stored;
                if let ParamValue::Set(new) = value {
                    *stored = new.clamp(0.0, 255.0);
                }
                ParamReply::Previous(old)
            }
            None => ParamReply::Unsupported,
        }
    }

    fn retarget_recording(&mut self, _path: &std::path::Path) -> bool {
        false
    }

    fn shutdown(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::queue::{BlockMode, DropPolicy};

    fn open_default(queue: Arc<FrameQueue>) -> SyntheticProducer {
        SyntheticProducer::open(queue, SizeRequest::Auto, None, PixelFormat::Rgb, 8).unwrap()
    }

    #[test]
    fn test_auto_negotiates_largest_mode() {
        let queue = Arc::new(FrameQueue::new(0, DropPolicy::KeepAll));
        let mut producer = open_default(Arc::clone(&queue));
        let format = producer.preroll(Duration::from_secs(1)).unwrap();
        assert_eq!((format.width, format.height), (1280, 720));
    }

    #[test]
    fn test_unsupported_exact_size_fails() {
        let queue = Arc::new(FrameQueue::new(0, DropPolicy::KeepAll));
        let result = SyntheticProducer::open(
            queue,
            SizeRequest::Exact {
                width: 123,
                height: 456,
            },
            None,
            PixelFormat::Rgb,
            8,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_roi_drives_frame_dimensions() {
        let queue = Arc::new(FrameQueue::new(0, DropPolicy::KeepAll));
        queue.reset_for_start();
        let mut producer = SyntheticProducer::open(
            Arc::clone(&queue),
            SizeRequest::Exact {
                width: 640,
                height: 480,
            },
            Some(RoiRect {
                x: 0,
                y: 0,
                width: 320,
                height: 240,
            }),
            PixelFormat::Rgb,
            8,
        )
        .unwrap();

        producer.preroll(Duration::from_secs(1)).unwrap();
        producer.start(Some(60.0), Duration::from_secs(1)).unwrap();
        let frame = queue.pop(BlockMode::BoundedWait(Duration::from_secs(5))).unwrap();
        producer.stop().unwrap();

        assert_eq!((frame.width, frame.height), (320, 240));
        assert_eq!(frame.data.len(), 320 * 240 * 3);
    }

    #[test]
    fn test_stop_quiesces_producer() {
        let queue = Arc::new(FrameQueue::new(0, DropPolicy::KeepAll));
        queue.reset_for_start();
        let mut producer = open_default(Arc::clone(&queue));
        producer.preroll(Duration::from_secs(1)).unwrap();
        producer.start(Some(120.0), Duration::from_secs(1)).unwrap();
        assert!(queue.wait_first_frame(Duration::from_secs(5)));
        producer.stop().unwrap();

        // After stop returns, no new pushes can occur
        let settled = queue.pushed();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.pushed(), settled);
    }

    #[test]
    fn test_controls_roundtrip() {
        let queue = Arc::new(FrameQueue::new(0, DropPolicy::KeepAll));
        let mut producer = open_default(queue);

        // First access returns the auto default
        let reply = producer.control(DeviceControl::Aperture, false, ParamValue::Set(300.0));
        assert_eq!(reply, ParamReply::Previous(0.0));
        // Clamped to the control's range
        let reply = producer.control(DeviceControl::Aperture, false, ParamValue::Query);
        assert_eq!(reply, ParamReply::Previous(255.0));

        assert_eq!(
            producer.named_control("Brightness", ParamValue::Set(200.0)),
            ParamReply::Previous(128.0)
        );
        assert_eq!(
            producer.named_control("Sharpness", ParamValue::Query),
            ParamReply::Unsupported
        );
    }
}
