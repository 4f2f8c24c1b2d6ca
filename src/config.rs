// SPDX-License-Identifier: MPL-2.0

//! Persisted subsystem settings
//!
//! Defaults that scripts rarely pass explicitly (codec spec, queue depth,
//! output directory) plus the encoder candidate priority table, which is
//! deliberately configuration data rather than a hard-coded invariant.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::capture::queue::DropPolicy;
use crate::recording::candidates::{VideoCandidate, default_candidates};

/// Subsystem settings, persisted as JSON in the user config directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Codec specification applied when a recording request leaves it empty
    pub default_codec_spec: String,
    /// Queue depth for new devices (0 = unbounded)
    pub default_buffer_depth: usize,
    /// Queue overflow policy for new devices
    pub default_drop_policy: DropPolicy,
    /// Recording output directory; falls back to the user video directory
    pub output_dir: Option<PathBuf>,
    /// Override of the encoder fallback chain, highest priority first
    pub encoder_candidates: Option<Vec<VideoCandidate>>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_codec_spec: "DEFAULTenc".to_string(),
            default_buffer_depth: 8,
            default_drop_policy: DropPolicy::KeepAll,
            output_dir: None,
            encoder_candidates: None,
        }
    }
}

impl Settings {
    /// Path of the settings file, if a config directory exists
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("framegrab").join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults on absence or
    /// parse failure
    pub fn load() -> Settings {
        let Some(path) = Self::config_path() else {
            return Settings::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed settings file, using defaults");
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        }
    }

    /// Persist settings to disk
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::config_path() else {
            return Err(std::io::Error::other("no config directory available"));
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, contents)
    }

    /// The effective encoder candidate chain
    pub fn candidates(&self) -> Vec<VideoCandidate> {
        self.encoder_candidates
            .clone()
            .unwrap_or_else(default_candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.default_codec_spec, "DEFAULTenc");
        assert_eq!(settings.default_drop_policy, DropPolicy::KeepAll);
        assert!(settings.encoder_candidates.is_none());
        assert_eq!(settings.candidates(), default_candidates());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut settings = Settings::default();
        settings.default_buffer_depth = 4;
        settings.encoder_candidates = Some(default_candidates());

        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"default_buffer_depth": 2}"#).unwrap();
        assert_eq!(settings.default_buffer_depth, 2);
        assert_eq!(settings.default_codec_spec, "DEFAULTenc");
    }
}
