// SPDX-License-Identifier: MPL-2.0

//! Pipeline bus drain loop
//!
//! GStreamer delivers warnings, errors and end-of-stream notifications
//! asynchronously on the pipeline bus. Draining it from the lifecycle entry
//! points keeps those observable in the log. Bus messages are diagnostic
//! only: they never abort an in-progress operation by themselves, a failure
//! also shows up as a failed state transition.

use gstreamer as gst;
use gstreamer::prelude::*;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Drain all pending bus messages of `pipeline` into the log.
///
/// With `wait` set, polls for up to two seconds until at least one message
/// arrives. Returns whether any message was handled.
pub fn drain(pipeline: &gst::Pipeline, wait: bool) -> bool {
    let Some(bus) = pipeline.bus() else {
        return false;
    };

    let deadline = Instant::now() + Duration::from_secs(2);
    if wait {
        while Instant::now() < deadline && !bus.have_pending() {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    let mut workdone = false;
    while let Some(msg) = bus.pop() {
        workdone = true;
        log_message(&msg);
    }
    workdone
}

fn log_message(msg: &gst::Message) {
    let source = msg
        .src()
        .map(|s| s.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match msg.view() {
        gst::MessageView::Eos(_) => {
            debug!(source = %source, "Pipeline bus: end of stream");
        }
        gst::MessageView::Warning(w) => {
            warn!(
                source = %source,
                warning = %w.error(),
                debug = ?w.debug(),
                "Pipeline bus warning"
            );
        }
        gst::MessageView::Error(e) => {
            error!(
                source = %source,
                error = %e.error(),
                debug = ?e.debug(),
                "Pipeline bus error"
            );
            // Unsupported encoder properties are a common cause; the codec
            // spec override protocol lets users leave the offending option out
            if e.error().to_string().contains("property") {
                info!(
                    "A plugin rejected a property; consider overriding the codec \
                     settings via the VideoCodec= specification"
                );
            }
        }
        gst::MessageView::StateChanged(s) => {
            debug!(
                source = %source,
                current = ?s.current(),
                pending = ?s.pending(),
                "Pipeline state changed"
            );
        }
        _ => {}
    }
}
