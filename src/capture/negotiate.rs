// SPDX-License-Identifier: MPL-2.0

//! Resolution and framerate negotiation
//!
//! Open and Start validate user requests against the capability set the
//! backend enumerated from the device. Auto-detection favours the mode with
//! the largest pixel area whose bits-per-pixel can represent the requested
//! channel layout; explicit requests must be covered exactly by an
//! advertised mode.

use tracing::debug;

use crate::errors::{CaptureError, CaptureResult};

/// Requested frame size
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeRequest {
    /// Pick the best mode the device offers
    Auto,
    /// Require exactly this size
    Exact {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
}

/// Requested capture rate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RateRequest {
    /// Run at the backend's maximum / default rate
    #[default]
    Auto,
    /// Request this rate, in frames per second
    Exact(f64),
}

/// Frame rates supported by one capture mode
#[derive(Debug, Clone, PartialEq)]
pub enum RateSet {
    /// A single fixed rate
    Single(f64),
    /// A discrete list of rates
    List(Vec<f64>),
    /// A continuous range (min, max)
    Range(f64, f64),
    /// Device did not advertise rates for this mode
    Unknown,
}

impl RateSet {
    /// Best rate to report for a mode when the caller asked for auto
    pub fn nominal(&self) -> f64 {
        match self {
            RateSet::Single(rate) => *rate,
            RateSet::List(rates) => rates.iter().cloned().fold(0.0, f64::max),
            RateSet::Range(_, max) => *max,
            RateSet::Unknown => 0.0,
        }
    }

    /// Whether `requested` falls within this set, with the integer-rounding
    /// tolerance the wire formats use (rates within 1 fps match)
    pub fn supports(&self, requested: f64) -> bool {
        let wanted = (requested + 0.5).floor();
        match self {
            RateSet::Single(rate) => (wanted - rate).abs() < 1.0,
            RateSet::List(rates) => rates.iter().any(|rate| (wanted - rate).abs() < 1.0),
            RateSet::Range(min, max) => wanted >= *min && wanted <= *max,
            RateSet::Unknown => false,
        }
    }
}

/// One advertised capture mode of a device
#[derive(Debug, Clone)]
pub struct CaptureMode {
    /// Width in pixels; 1 means unspecified
    pub width: u32,
    /// Height in pixels; 1 means unspecified
    pub height: u32,
    /// Bits per pixel of the wire format, if advertised
    pub bits_per_pixel: Option<u32>,
    /// Supported frame rates
    pub rates: RateSet,
}

/// Outcome of size/rate negotiation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Negotiated {
    /// Negotiated width in pixels
    pub width: u32,
    /// Negotiated height in pixels
    pub height: u32,
    /// Nominal rate of the selected mode, 0.0 if unknown
    pub fps: f64,
}

/// Whether a mode can represent `channels` channels at `bit_depth` bits each.
///
/// The check is skipped when the mode doesn't advertise a bpp, for consumer
/// 8-bit requests, and for packed YUV (2-channel) layouts, where wire bpp
/// and caller-visible depth diverge.
fn depth_satisfied(mode: &CaptureMode, channels: u32, bit_depth: u32) -> bool {
    match mode.bits_per_pixel {
        None => true,
        Some(bpp) => bit_depth <= 8 || channels == 2 || bpp >= bit_depth * channels,
    }
}

/// Resolve a size request against the enumerated capability set.
///
/// DV sources advertise a fixed width of 720 with an unspecified height;
/// auto-detection resolves that to 576 (PAL), and explicit requests are
/// accepted only for exactly 480 or 576.
pub fn negotiate_mode(
    modes: &[CaptureMode],
    request: SizeRequest,
    channels: u32,
    bit_depth: u32,
) -> CaptureResult<Negotiated> {
    let mut selected: Option<&CaptureMode> = None;

    match request {
        SizeRequest::Auto => {
            let mut best_area = 0u64;
            for mode in modes {
                if !depth_satisfied(mode, channels, bit_depth) {
                    continue;
                }
                let area = mode.width as u64 * mode.height as u64;
                if area > best_area {
                    best_area = area;
                    selected = Some(mode);
                }
            }
        }
        SizeRequest::Exact { width, height } => {
            for mode in modes {
                // Width/height of 1 mean the device leaves that axis open
                if (mode.width > 1 && mode.width != width)
                    || (mode.height > 1 && mode.height != height)
                {
                    continue;
                }
                if mode.width == 1 && mode.height == 1 {
                    continue;
                }
                if !depth_satisfied(mode, channels, bit_depth) {
                    continue;
                }
                selected = Some(mode);
                break;
            }
        }
    }

    let (requested_width, requested_height) = match request {
        SizeRequest::Auto => (0, 0),
        SizeRequest::Exact { width, height } => (width, height),
    };

    let mode = selected.ok_or(CaptureError::UnsupportedResolution {
        width: requested_width,
        height: requested_height,
    })?;

    let mut width = mode.width;
    let mut height = mode.height;

    // DV special case: fixed width 720, unspecified height
    if width == 720 && height == 1 {
        match request {
            SizeRequest::Auto => {
                debug!("DV source with unspecified height, defaulting to 720x576 PAL");
                height = 576;
            }
            SizeRequest::Exact { height: 480, .. } => height = 480,
            SizeRequest::Exact { height: 576, .. } => height = 576,
            SizeRequest::Exact {
                width: w,
                height: h,
            } => {
                return Err(CaptureError::UnsupportedResolution {
                    width: w,
                    height: h,
                });
            }
        }
    } else if height == 1 || width == 1 {
        // Other open axes resolve to the explicit request
        if let SizeRequest::Exact {
            width: w,
            height: h,
        } = request
        {
            if width == 1 {
                width = w;
            }
            if height == 1 {
                height = h;
            }
        }
    }

    debug!(width, height, "Negotiated capture resolution");

    Ok(Negotiated {
        width,
        height,
        fps: mode.rates.nominal(),
    })
}

/// Validate a rate request against the selected mode's rate set.
///
/// Returns the rate to configure, or `None` to leave the device at its
/// default rate (auto request, or unsupported explicit rate, which is
/// non-fatal by design: the capture falls back to the device default).
pub fn negotiate_rate(rates: &RateSet, request: RateRequest) -> Option<f64> {
    match request {
        RateRequest::Auto => None,
        RateRequest::Exact(fps) => {
            if rates.supports(fps) {
                Some((fps + 0.5).floor())
            } else {
                tracing::warn!(
                    requested = fps,
                    "Requested framerate unsupported at current settings, using device default"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(width: u32, height: u32, bpp: Option<u32>, rates: RateSet) -> CaptureMode {
        CaptureMode {
            width,
            height,
            bits_per_pixel: bpp,
            rates,
        }
    }

    fn webcam_modes() -> Vec<CaptureMode> {
        vec![
            mode(320, 240, Some(24), RateSet::Single(30.0)),
            mode(640, 480, Some(24), RateSet::List(vec![15.0, 30.0])),
            mode(1280, 720, Some(24), RateSet::Range(5.0, 60.0)),
        ]
    }

    #[test]
    fn test_auto_picks_largest_area() {
        let negotiated =
            negotiate_mode(&webcam_modes(), SizeRequest::Auto, 3, 8).unwrap();
        assert_eq!((negotiated.width, negotiated.height), (1280, 720));
        assert_eq!(negotiated.fps, 60.0);
    }

    #[test]
    fn test_auto_respects_depth_constraint() {
        let modes = vec![
            mode(1920, 1080, Some(24), RateSet::Single(30.0)),
            mode(640, 480, Some(48), RateSet::Single(30.0)),
        ];
        // 16 bpc RGB needs 48 bpp: only the smaller mode qualifies
        let negotiated = negotiate_mode(&modes, SizeRequest::Auto, 3, 16).unwrap();
        assert_eq!((negotiated.width, negotiated.height), (640, 480));
        // At 8 bpc the constraint is skipped and area wins
        let negotiated = negotiate_mode(&modes, SizeRequest::Auto, 3, 8).unwrap();
        assert_eq!((negotiated.width, negotiated.height), (1920, 1080));
    }

    #[test]
    fn test_explicit_match_and_reject() {
        let negotiated = negotiate_mode(
            &webcam_modes(),
            SizeRequest::Exact {
                width: 640,
                height: 480,
            },
            3,
            8,
        )
        .unwrap();
        assert_eq!((negotiated.width, negotiated.height), (640, 480));

        let err = negotiate_mode(
            &webcam_modes(),
            SizeRequest::Exact {
                width: 800,
                height: 600,
            },
            3,
            8,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CaptureError::UnsupportedResolution {
                width: 800,
                height: 600
            }
        ));
    }

    #[test]
    fn test_dv_pal_auto_detect() {
        let modes = vec![mode(720, 1, None, RateSet::Single(25.0))];
        let negotiated = negotiate_mode(&modes, SizeRequest::Auto, 3, 8).unwrap();
        assert_eq!((negotiated.width, negotiated.height), (720, 576));
    }

    #[test]
    fn test_dv_explicit_heights() {
        let modes = vec![mode(720, 1, None, RateSet::Single(25.0))];
        for height in [480, 576] {
            let negotiated = negotiate_mode(
                &modes,
                SizeRequest::Exact { width: 720, height },
                3,
                8,
            )
            .unwrap();
            assert_eq!(negotiated.height, height);
        }
        // Any other height is impossible on DV hardware
        assert!(
            negotiate_mode(
                &modes,
                SizeRequest::Exact {
                    width: 720,
                    height: 500
                },
                3,
                8,
            )
            .is_err()
        );
    }

    #[test]
    fn test_rate_validation() {
        assert!(RateSet::Single(30.0).supports(30.0));
        assert!(RateSet::Single(30.0).supports(29.97));
        assert!(!RateSet::Single(30.0).supports(25.0));
        assert!(RateSet::List(vec![15.0, 30.0]).supports(15.0));
        assert!(!RateSet::List(vec![15.0, 30.0]).supports(24.0));
        assert!(RateSet::Range(5.0, 60.0).supports(42.0));
        assert!(!RateSet::Range(5.0, 60.0).supports(90.0));
        assert!(!RateSet::Unknown.supports(30.0));
    }

    #[test]
    fn test_rate_negotiation_falls_back_to_default() {
        let rates = RateSet::List(vec![15.0, 30.0]);
        assert_eq!(negotiate_rate(&rates, RateRequest::Exact(30.0)), Some(30.0));
        assert_eq!(negotiate_rate(&rates, RateRequest::Exact(120.0)), None);
        assert_eq!(negotiate_rate(&rates, RateRequest::Auto), None);
    }
}
