// SPDX-License-Identifier: MPL-2.0

//! CLI commands for capture operations
//!
//! This module provides command-line functionality for:
//! - Listing available capture devices
//! - Inspecting the encoder fallback chain
//! - Recording video to a movie file
//! - Monitoring live capture statistics

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use gstreamer::prelude::{DeviceExt, DeviceMonitorExt, DeviceMonitorExtManual};

use framegrab::backend::DeviceSelector;
use framegrab::capture::{
    CaptureManager, DropPolicy, FetchMode, OpenRequest, RateRequest, SizeRequest,
};
use framegrab::config::Settings;
use framegrab::errors::FetchError;
use framegrab::recording::builder::{ElementRegistry, GstRegistry};
use framegrab::recording::{RecordingFlags, RecordingRequest};
use framegrab::storage;

/// List all available capture devices
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    gstreamer::init()?;

    let monitor = gstreamer::DeviceMonitor::new();
    monitor.add_filter(Some("Video/Source"), None);
    monitor.start()?;
    let devices = monitor.devices();
    monitor.stop();

    if devices.is_empty() {
        println!("No capture devices found.");
        println!("The synthetic test pattern is always available via 'record --test'.");
        return Ok(());
    }

    println!("Available capture devices:");
    println!();
    for (index, device) in devices.iter().enumerate() {
        println!("  [{}] {}", index, device.display_name());
        if let Some(caps) = device.caps() {
            let mut sizes: Vec<(i32, i32)> = Vec::new();
            for structure in caps.iter() {
                if let (Ok(width), Ok(height)) =
                    (structure.get::<i32>("width"), structure.get::<i32>("height"))
                {
                    if !sizes.contains(&(width, height)) {
                        sizes.push((width, height));
                    }
                }
            }
            sizes.sort_by(|a, b| (b.0 * b.1).cmp(&(a.0 * a.1)));
            let preview: Vec<String> = sizes
                .iter()
                .take(3)
                .map(|(w, h)| format!("{}x{}", w, h))
                .collect();
            if !preview.is_empty() {
                println!("      Modes: {}", preview.join(", "));
            }
        }
        println!();
    }

    Ok(())
}

/// Show the encoder fallback chain and what the default spec resolves to
pub fn show_encoders() -> Result<(), Box<dyn std::error::Error>> {
    gstreamer::init()?;

    let settings = Settings::load();
    let registry = GstRegistry;

    println!("Encoder candidate chain (highest priority first):");
    for candidate in settings.candidates() {
        let mark = if registry.is_available(&candidate.element) {
            "ok"
        } else {
            "missing"
        };
        println!(
            "  {:<16} [{}]  muxer: {:<12} container: {}",
            candidate.element, mark, candidate.muxer, candidate.container_mime
        );
    }
    println!();

    let manager = CaptureManager::with_settings(settings);
    match manager.resolve_recording_spec(&manager.settings().default_codec_spec) {
        Ok(resolved) => {
            println!(
                "Default selection: {} -> {} (.{})",
                resolved.video.element_name(),
                resolved.muxer.element,
                resolved.extension()
            );
        }
        Err(e) => println!("Default spec does not resolve: {}", e),
    }

    Ok(())
}

/// Print the gst-launch style fragment for a codec spec
pub fn show_launch_line(spec: &str) -> Result<(), Box<dyn std::error::Error>> {
    gstreamer::init()?;
    let manager = CaptureManager::with_settings(Settings::load());
    println!("{}", manager.recording_launch_line(spec)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
/// Record video from a device to a movie file
pub fn record(
    camera: Option<u32>,
    test: bool,
    duration: u64,
    output: Option<PathBuf>,
    codec: Option<String>,
    audio: bool,
    size: Option<(u32, u32)>,
    fps: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load();
    let output = match output {
        Some(path) => path,
        None => storage::default_recording_path(settings.output_dir.as_deref(), "mov")?,
    };

    let device = if test {
        DeviceSelector::TestPattern
    } else {
        DeviceSelector::Index(camera.unwrap_or(0))
    };

    let manager = CaptureManager::with_settings(settings);
    let handle = manager.open(OpenRequest {
        device,
        channels: 4,
        size: match size {
            Some((width, height)) => SizeRequest::Exact { width, height },
            None => SizeRequest::Auto,
        },
        buffer_depth: 1,
        drop_policy: DropPolicy::DropOldest,
        recording: Some(RecordingRequest {
            target: output.clone(),
            codec_spec: codec.unwrap_or_default(),
        }),
        flags: RecordingFlags::from_bits(if audio { RecordingFlags::RECORD_AUDIO } else { 0 }),
        ..Default::default()
    })?;

    let rate = fps.map(RateRequest::Exact).unwrap_or(RateRequest::Auto);
    let negotiated = manager.start(handle, rate, true, None)?;
    println!(
        "Recording at {:.1} fps for up to {}s, Ctrl-C to stop early...",
        negotiated, duration
    );

    let interrupted = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))?;

    let deadline = Instant::now() + Duration::from_secs(duration);
    let mut frames: u64 = 0;
    while Instant::now() < deadline && !interrupted.load(Ordering::SeqCst) {
        match manager.fetch(handle, FetchMode::NonBlocking) {
            Ok(_) => frames += 1,
            Err(FetchError::NotReady) => std::thread::sleep(Duration::from_millis(5)),
            Err(e) => return Err(Box::new(e)),
        }
    }

    let dropped = manager.stop(handle, true)?;
    manager.close(handle)?;

    println!(
        "Recorded {} ({} live frames seen, {} dropped)",
        output.display(),
        frames,
        dropped
    );
    Ok(())
}

/// Run live capture without recording and print delivery statistics
pub fn monitor(
    camera: Option<u32>,
    test: bool,
    duration: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let device = if test {
        DeviceSelector::TestPattern
    } else {
        DeviceSelector::Index(camera.unwrap_or(0))
    };

    let manager = CaptureManager::with_settings(Settings::load());
    let handle = manager.open(OpenRequest {
        device,
        channels: 3,
        buffer_depth: 1,
        drop_policy: DropPolicy::DropOldest,
        ..Default::default()
    })?;

    let negotiated = manager.start(handle, RateRequest::Auto, true, None)?;
    println!("Capturing at {:.1} fps for {}s...", negotiated, duration);

    let started = Instant::now();
    let deadline = started + Duration::from_secs(duration);
    let mut frames: u64 = 0;
    let mut last_dims = (0u32, 0u32);
    while Instant::now() < deadline {
        match manager.fetch(handle, FetchMode::Blocking) {
            Ok(fetched) => {
                frames += 1;
                last_dims = (fetched.frame.width, fetched.frame.height);
            }
            Err(FetchError::NotReady) => continue,
            Err(e) => return Err(Box::new(e)),
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    let dropped = manager.stop(handle, true)?;
    manager.close(handle)?;

    println!(
        "Delivered {} frames of {}x{} in {:.1}s ({:.1} fps effective), {} dropped",
        frames,
        last_dims.0,
        last_dims.1,
        elapsed,
        frames as f64 / elapsed,
        dropped
    );
    Ok(())
}
