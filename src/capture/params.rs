// SPDX-License-Identifier: MPL-2.0

//! String-keyed device parameter protocol
//!
//! The external protocol is a flat string key plus a numeric value, because
//! the universe of controllable device features is not statically known.
//! Internally every key is resolved to a typed command at this boundary, so
//! dispatch below it is exhaustive. An `Auto` suffix on a control key forces
//! that control into automatic mode and clears any explicit value; unknown
//! keys answer `Unsupported` rather than erroring.

/// Value side of a set-parameter call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    /// Query only, do not modify (external edge encodes this as DBL_MAX)
    Query,
    /// Assign this value
    Set(f64),
}

impl ParamValue {
    /// Decode the external sentinel convention
    pub fn from_raw(value: f64) -> Self {
        if value == f64::MAX {
            ParamValue::Query
        } else {
            ParamValue::Set(value)
        }
    }
}

/// Answer of a set-parameter call
#[derive(Debug, Clone, PartialEq)]
pub enum ParamReply {
    /// Previous numeric value of the control
    Previous(f64),
    /// Acknowledged; the control has no meaningful previous value
    Ok,
    /// String-valued answer (vendor/model queries)
    Text(String),
    /// Rectangle answer ([left, top, right, bottom]) for ROI queries
    Rect([f64; 4]),
    /// Key understood but the request cannot be applied right now
    Rejected,
    /// This device/backend does not provide the control
    Unsupported,
}

/// Camera controls with a fixed mapping onto backend properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceControl {
    /// Exposure duration; external unit seconds, backend unit nanoseconds
    Shutter,
    /// Lens opening amount, 0-255
    Aperture,
    /// Exposure value compensation (float)
    EvCompensation,
    /// Anti-flicker mode, 0-3 (3 = auto)
    FlickerMode,
    /// White balance mode, 0-5 (0 = auto)
    WhiteBalanceMode,
    /// Focus mode, 0-7 (0 = auto)
    FocusMode,
    /// Flash mode, 0-4 (0 = auto)
    FlashMode,
    /// Scene preset, 0-6 (6 = auto)
    SceneMode,
    /// Sensor gain
    Gain,
}

impl DeviceControl {
    /// Backend property name for this control
    pub fn property(self) -> &'static str {
        match self {
            DeviceControl::Shutter => "exposure",
            DeviceControl::Aperture => "aperture",
            DeviceControl::EvCompensation => "ev-compensation",
            DeviceControl::FlickerMode => "flicker-mode",
            DeviceControl::WhiteBalanceMode => "white-balance-mode",
            DeviceControl::FocusMode => "focus-mode",
            DeviceControl::FlashMode => "flash-mode",
            DeviceControl::SceneMode => "scene-mode",
            DeviceControl::Gain => "gain",
        }
    }

    /// Clamp an integer-valued request to the control's legal range
    pub fn clamp(self, value: i64) -> i64 {
        let (min, max) = match self {
            DeviceControl::Aperture => (0, 255),
            DeviceControl::FlickerMode => (0, 3),
            DeviceControl::WhiteBalanceMode => (0, 5),
            DeviceControl::FocusMode => (0, 7),
            DeviceControl::FlashMode => (0, 4),
            DeviceControl::SceneMode => (0, 6),
            _ => return value,
        };
        value.clamp(min, max)
    }

    /// Value that selects automatic mode
    pub fn auto_value(self) -> f64 {
        match self {
            DeviceControl::FlickerMode => 3.0,
            DeviceControl::SceneMode => 6.0,
            _ => 0.0,
        }
    }

    /// Scale factor from external units to backend units
    /// (shutter: seconds -> nanoseconds)
    pub fn unit_scale(self) -> f64 {
        match self {
            DeviceControl::Shutter => 1e9,
            _ => 1.0,
        }
    }

    const ALL: [(&'static str, DeviceControl); 9] = [
        ("Shutter", DeviceControl::Shutter),
        ("Aperture", DeviceControl::Aperture),
        ("EVCompensation", DeviceControl::EvCompensation),
        ("Flickermode", DeviceControl::FlickerMode),
        ("Whitebalancemode", DeviceControl::WhiteBalanceMode),
        ("Focusmode", DeviceControl::FocusMode),
        ("Flashmode", DeviceControl::FlashMode),
        ("Scenemode", DeviceControl::SceneMode),
        ("Gain", DeviceControl::Gain),
    ];
}

/// Typed form of a parameter key
#[derive(Debug, Clone, PartialEq)]
pub enum ParamCommand {
    /// Store a gst-launch style source bin description consumed by the next
    /// open of the custom-source device (process-global, handle -1)
    SetNextSourceBin(String),
    /// Retarget the recording file between recordings
    SetMovieName {
        /// New target path
        path: String,
        /// A `:CodecType` suffix was present; codec changes need a reopen
        codec_change_requested: bool,
    },
    /// Hardware trigger counters (not available on this backend)
    TriggerCount,
    /// Log the set of controllable parameters
    PrintParameters,
    /// Query the negotiated capture rate
    GetFramerate,
    /// Query the region of interest
    GetRoi,
    /// Query the device vendor name
    GetVendorName,
    /// Query the device model name
    GetModelName,
    /// A mapped camera control, with automatic-mode request
    Control {
        /// Which control
        control: DeviceControl,
        /// `Auto` suffix present: force automatic mode
        auto: bool,
    },
    /// Unmapped key, tried against the backend's named channels
    /// (color balance labels) before answering Unsupported
    Named(String),
}

impl ParamCommand {
    /// Resolve a raw parameter key.
    ///
    /// Matching follows the established substring rules: prefix commands
    /// carry their argument after `=`, control names match anywhere in the
    /// key so an `Auto` suffix composes with them.
    pub fn parse(key: &str) -> ParamCommand {
        if let Some(rest) = key.strip_prefix("SetNextCaptureBinSpec=") {
            return ParamCommand::SetNextSourceBin(rest.to_string());
        }
        if let Some(rest) = key.strip_prefix("SetNewMoviename=") {
            let (path, codec_change_requested) = match rest.find(":CodecType") {
                Some(pos) => (&rest[..pos], true),
                None => (rest, false),
            };
            return ParamCommand::SetMovieName {
                path: path.to_string(),
                codec_change_requested,
            };
        }
        match key {
            "TriggerCount" | "WaitTriggerCount" => return ParamCommand::TriggerCount,
            "PrintParameters" => return ParamCommand::PrintParameters,
            "GetFramerate" => return ParamCommand::GetFramerate,
            "GetROI" => return ParamCommand::GetRoi,
            "GetVendorname" => return ParamCommand::GetVendorName,
            "GetModelname" => return ParamCommand::GetModelName,
            _ => {}
        }
        for (name, control) in DeviceControl::ALL {
            if key.contains(name) {
                return ParamCommand::Control {
                    control,
                    auto: key.contains("Auto"),
                };
            }
        }
        ParamCommand::Named(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_sentinel() {
        assert_eq!(ParamValue::from_raw(f64::MAX), ParamValue::Query);
        assert_eq!(ParamValue::from_raw(0.5), ParamValue::Set(0.5));
    }

    #[test]
    fn test_prefix_commands() {
        assert_eq!(
            ParamCommand::parse("SetNextCaptureBinSpec=videotestsrc ! capsfilter"),
            ParamCommand::SetNextSourceBin("videotestsrc ! capsfilter".into())
        );
        assert_eq!(
            ParamCommand::parse("SetNewMoviename=/tmp/run1.mov"),
            ParamCommand::SetMovieName {
                path: "/tmp/run1.mov".into(),
                codec_change_requested: false,
            }
        );
    }

    #[test]
    fn test_movie_rename_strips_codec_suffix() {
        assert_eq!(
            ParamCommand::parse("SetNewMoviename=/tmp/run2.mov:CodecType=theoraenc"),
            ParamCommand::SetMovieName {
                path: "/tmp/run2.mov".into(),
                codec_change_requested: true,
            }
        );
    }

    #[test]
    fn test_control_with_auto_suffix() {
        assert_eq!(
            ParamCommand::parse("Shutter"),
            ParamCommand::Control {
                control: DeviceControl::Shutter,
                auto: false
            }
        );
        assert_eq!(
            ParamCommand::parse("ShutterAuto"),
            ParamCommand::Control {
                control: DeviceControl::Shutter,
                auto: true
            }
        );
        assert_eq!(
            ParamCommand::parse("WhitebalancemodeAuto"),
            ParamCommand::Control {
                control: DeviceControl::WhiteBalanceMode,
                auto: true
            }
        );
    }

    #[test]
    fn test_unknown_key_falls_through_to_named() {
        assert_eq!(
            ParamCommand::parse("Saturation"),
            ParamCommand::Named("Saturation".into())
        );
    }

    #[test]
    fn test_control_ranges() {
        assert_eq!(DeviceControl::Aperture.clamp(500), 255);
        assert_eq!(DeviceControl::FlickerMode.clamp(-2), 0);
        assert_eq!(DeviceControl::Gain.clamp(10_000), 10_000);
        assert_eq!(DeviceControl::SceneMode.auto_value(), 6.0);
        assert_eq!(DeviceControl::Shutter.unit_scale(), 1e9);
    }
}
