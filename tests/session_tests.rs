// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the capture device lifecycle
//!
//! These run against the synthetic test pattern backend, so they exercise
//! the full open/start/fetch/stop/close path without hardware.

use std::time::{Duration, Instant};

use framegrab::backend::DeviceSelector;
use framegrab::capture::{
    CaptureManager, CaptureState, DropPolicy, FetchMode, OpenRequest, ParamReply, ParamValue,
    RateRequest, RoiRect, SizeRequest, Target,
};
use framegrab::errors::{CaptureError, FetchError};

fn test_request() -> OpenRequest {
    OpenRequest {
        device: DeviceSelector::TestPattern,
        channels: 3,
        ..Default::default()
    }
}

#[test]
fn test_full_lifecycle() {
    let manager = CaptureManager::new();
    let handle = manager.open(test_request()).unwrap();
    assert_eq!(manager.state(handle).unwrap(), CaptureState::Ready);

    let fps = manager
        .start(handle, RateRequest::Exact(60.0), false, None)
        .unwrap();
    assert!(fps > 0.0);
    assert_eq!(manager.state(handle).unwrap(), CaptureState::Capturing);

    let fetched = manager.fetch(handle, FetchMode::Blocking).unwrap();
    assert_eq!(fetched.frame.width, 1280);
    assert_eq!(fetched.frame.height, 720);
    assert_eq!(fetched.frame.data.len(), 1280 * 720 * 3);

    manager.stop(handle, true).unwrap();
    assert_eq!(manager.state(handle).unwrap(), CaptureState::Ready);

    manager.close(handle).unwrap();
    assert_eq!(manager.open_count(), 0);
}

#[test]
fn test_fetch_after_close_is_invalid_handle() {
    let manager = CaptureManager::new();
    let handle = manager.open(test_request()).unwrap();
    manager.close(handle).unwrap();

    assert!(matches!(
        manager.fetch(handle, FetchMode::NonBlocking),
        Err(FetchError::Device(CaptureError::InvalidHandle))
    ));
}

#[test]
fn test_double_close_is_well_defined() {
    let manager = CaptureManager::new();
    let handle = manager.open(test_request()).unwrap();
    manager.close(handle).unwrap();
    // Second close errors cleanly, never crashes
    assert!(matches!(
        manager.close(handle),
        Err(CaptureError::InvalidHandle)
    ));
}

#[test]
fn test_close_while_capturing_forces_stop() {
    let manager = CaptureManager::new();
    let handle = manager.open(test_request()).unwrap();
    manager
        .start(handle, RateRequest::Exact(60.0), false, None)
        .unwrap();
    manager.close(handle).unwrap();
    assert!(matches!(
        manager.state(handle),
        Err(CaptureError::InvalidHandle)
    ));
}

#[test]
fn test_start_while_capturing_is_rejected() {
    let manager = CaptureManager::new();
    let handle = manager.open(test_request()).unwrap();
    manager
        .start(handle, RateRequest::Exact(30.0), false, None)
        .unwrap();

    // Let some frames accumulate
    let first = manager.fetch(handle, FetchMode::Blocking).unwrap();

    let err = manager
        .start(handle, RateRequest::Exact(30.0), false, None)
        .unwrap_err();
    assert!(matches!(err, CaptureError::InvalidState { .. }));

    // The running capture was not disturbed: frames keep flowing with
    // advancing timestamps
    let second = manager.fetch(handle, FetchMode::Blocking).unwrap();
    assert!(second.frame.pts_nanos >= first.frame.pts_nanos);

    manager.close(handle).unwrap();
}

#[test]
fn test_stop_keeps_backlog_fetchable_then_terminates() {
    let manager = CaptureManager::new();
    let handle = manager.open(test_request()).unwrap();
    manager
        .start(handle, RateRequest::Exact(100.0), false, None)
        .unwrap();

    // Accumulate a backlog, then stop without dropping
    std::thread::sleep(Duration::from_millis(100));
    manager.stop(handle, false).unwrap();

    // Queued frames survive the stop and come out in order...
    let mut timestamps = Vec::new();
    loop {
        match manager.fetch(handle, FetchMode::Blocking) {
            Ok(fetched) => timestamps.push(fetched.frame.pts_nanos.unwrap()),
            Err(FetchError::Terminated) => break,
            Err(e) => panic!("unexpected fetch error: {:?}", e),
        }
    }
    assert!(!timestamps.is_empty());
    assert!(timestamps.windows(2).all(|w| w[0] < w[1]));

    // ...and the terminal condition is sticky
    assert!(matches!(
        manager.fetch(handle, FetchMode::NonBlocking),
        Err(FetchError::Terminated)
    ));

    manager.close(handle).unwrap();
}

#[test]
fn test_stop_with_drop_empties_queue() {
    let manager = CaptureManager::new();
    let handle = manager.open(test_request()).unwrap();
    manager
        .start(handle, RateRequest::Exact(100.0), false, None)
        .unwrap();
    std::thread::sleep(Duration::from_millis(100));
    manager.stop(handle, true).unwrap();

    assert!(matches!(
        manager.fetch(handle, FetchMode::NonBlocking),
        Err(FetchError::Terminated)
    ));
    manager.close(handle).unwrap();
}

#[test]
fn test_keep_all_loses_no_frames() {
    let manager = CaptureManager::new();
    let handle = manager
        .open(OpenRequest {
            buffer_depth: 0,
            drop_policy: DropPolicy::KeepAll,
            ..test_request()
        })
        .unwrap();
    manager
        .start(handle, RateRequest::Exact(200.0), false, None)
        .unwrap();
    std::thread::sleep(Duration::from_millis(100));
    manager.stop(handle, false).unwrap();

    // Synthetic timestamps are sequential multiples of the frame interval,
    // so gap-free timestamps prove nothing was discarded
    let mut timestamps = Vec::new();
    while let Ok(fetched) = manager.fetch(handle, FetchMode::NonBlocking) {
        timestamps.push(fetched.frame.pts_nanos.unwrap());
        assert_eq!(fetched.dropped, 0);
    }
    let interval = 1_000_000_000u64 / 200;
    for (i, pts) in timestamps.iter().enumerate() {
        assert_eq!(*pts, i as u64 * interval);
    }
    manager.close(handle).unwrap();
}

#[test]
fn test_drop_oldest_delivers_most_recent() {
    let manager = CaptureManager::new();
    let handle = manager
        .open(OpenRequest {
            buffer_depth: 1,
            drop_policy: DropPolicy::DropOldest,
            ..test_request()
        })
        .unwrap();
    manager
        .start(handle, RateRequest::Exact(200.0), false, None)
        .unwrap();

    // Let well over 5 frames arrive without fetching
    std::thread::sleep(Duration::from_millis(100));

    let fetched = manager.fetch(handle, FetchMode::Blocking).unwrap();
    // Depth 1 means at most the newest frame was queued
    assert!(fetched.pending <= 1);
    assert!(fetched.dropped >= 4);
    // Delivered frame is recent, not the first one captured
    assert!(fetched.frame.pts_nanos.unwrap() > 0);

    let dropped = manager.stop(handle, true).unwrap();
    assert!(dropped >= fetched.dropped);
    manager.close(handle).unwrap();
}

#[test]
fn test_stop_wakes_blocked_fetch_with_terminated() {
    let manager = std::sync::Arc::new(CaptureManager::new());
    let handle = manager.open(test_request()).unwrap();
    // 1 fps: the first frame arrives immediately, the second a full
    // second later, leaving a window where fetch must block
    manager
        .start(handle, RateRequest::Exact(1.0), false, None)
        .unwrap();
    manager.fetch(handle, FetchMode::Blocking).unwrap();

    let fetcher_manager = std::sync::Arc::clone(&manager);
    let fetcher = std::thread::spawn(move || {
        let start = Instant::now();
        let result = fetcher_manager.fetch(handle, FetchMode::Blocking);
        (result, start.elapsed())
    });

    std::thread::sleep(Duration::from_millis(100));
    manager.stop(handle, true).unwrap();

    let (result, elapsed) = fetcher.join().unwrap();
    assert!(matches!(result, Err(FetchError::Terminated)));
    // Promptly woken, not timed out
    assert!(elapsed < Duration::from_secs(5));
    manager.close(handle).unwrap();
}

#[test]
fn test_roi_drives_fetched_dimensions() {
    let manager = CaptureManager::new();
    let handle = manager
        .open(OpenRequest {
            size: SizeRequest::Exact {
                width: 640,
                height: 480,
            },
            roi: Some(RoiRect {
                x: 0,
                y: 0,
                width: 320,
                height: 240,
            }),
            ..test_request()
        })
        .unwrap();
    manager
        .start(handle, RateRequest::Exact(60.0), false, None)
        .unwrap();

    let fetched = manager.fetch(handle, FetchMode::Blocking).unwrap();
    assert_eq!(fetched.frame.width, 320);
    assert_eq!(fetched.frame.height, 240);
    assert_eq!(fetched.frame.data.len(), 320 * 240 * 3);

    manager.close(handle).unwrap();
}

#[test]
fn test_unsupported_resolution_fails_open() {
    let manager = CaptureManager::new();
    let err = manager
        .open(OpenRequest {
            size: SizeRequest::Exact {
                width: 123,
                height: 457,
            },
            ..test_request()
        })
        .unwrap_err();
    assert!(matches!(err, CaptureError::UnsupportedResolution { .. }));
    // Rollback: nothing was left allocated
    assert_eq!(manager.open_count(), 0);
}

#[test]
fn test_restart_after_stop() {
    let manager = CaptureManager::new();
    let handle = manager.open(test_request()).unwrap();

    for _ in 0..3 {
        manager
            .start(handle, RateRequest::Exact(60.0), false, None)
            .unwrap();
        let fetched = manager.fetch(handle, FetchMode::Blocking).unwrap();
        assert_eq!(fetched.frame.width, 1280);
        manager.stop(handle, true).unwrap();
    }

    manager.close(handle).unwrap();
}

#[test]
fn test_parameter_protocol() {
    let manager = CaptureManager::new();
    let handle = manager.open(test_request()).unwrap();

    // Mapped control: first reply carries the auto default, set sticks
    let reply = manager
        .set_parameter(Target::Device(handle), "Aperture", ParamValue::Set(17.0))
        .unwrap();
    assert_eq!(reply, ParamReply::Previous(0.0));
    let reply = manager
        .set_parameter(Target::Device(handle), "Aperture", ParamValue::Query)
        .unwrap();
    assert_eq!(reply, ParamReply::Previous(17.0));

    // Auto suffix resets to automatic mode
    let reply = manager
        .set_parameter(Target::Device(handle), "ApertureAuto", ParamValue::Query)
        .unwrap();
    assert_eq!(reply, ParamReply::Previous(17.0));
    let reply = manager
        .set_parameter(Target::Device(handle), "Aperture", ParamValue::Query)
        .unwrap();
    assert_eq!(reply, ParamReply::Previous(0.0));

    // Named fall-through and the unsupported sentinel
    let reply = manager
        .set_parameter(Target::Device(handle), "Brightness", ParamValue::Set(42.0))
        .unwrap();
    assert_eq!(reply, ParamReply::Previous(128.0));
    let reply = manager
        .set_parameter(Target::Device(handle), "NoSuchControl", ParamValue::Query)
        .unwrap();
    assert_eq!(reply, ParamReply::Unsupported);

    // Read-only queries
    let reply = manager
        .set_parameter(Target::Device(handle), "GetROI", ParamValue::Query)
        .unwrap();
    assert_eq!(reply, ParamReply::Rect([0.0, 0.0, 1280.0, 720.0]));
    assert!(matches!(
        manager
            .set_parameter(Target::Device(handle), "GetModelname", ParamValue::Query)
            .unwrap(),
        ParamReply::Text(_)
    ));

    manager.close(handle).unwrap();
}

#[test]
fn test_invalid_channel_count_rejected() {
    let manager = CaptureManager::new();
    let err = manager
        .open(OpenRequest {
            channels: 7,
            ..test_request()
        })
        .unwrap_err();
    assert!(matches!(err, CaptureError::Backend(_)));
}

#[test]
fn test_timestamps_advance_monotonically() {
    let manager = CaptureManager::new();
    let handle = manager.open(test_request()).unwrap();
    manager
        .start(handle, RateRequest::Exact(100.0), false, None)
        .unwrap();

    let mut last = -1.0f64;
    for _ in 0..5 {
        let fetched = manager.fetch(handle, FetchMode::Blocking).unwrap();
        assert!(fetched.timestamp >= last);
        last = fetched.timestamp;
    }

    manager.close(handle).unwrap();
}
