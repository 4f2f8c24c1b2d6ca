// SPDX-License-Identifier: MPL-2.0

//! Output file locations for recordings

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory recordings land in: the configured override, else the user
/// video directory, else the working directory, each with a `framegrab`
/// subdirectory
pub fn recordings_dir(configured: Option<&Path>) -> PathBuf {
    match configured {
        Some(dir) => dir.to_path_buf(),
        None => dirs::video_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("framegrab"),
    }
}

/// Timestamped default path for a new recording with the given container
/// extension. Creates the directory if needed.
pub fn default_recording_path(
    configured: Option<&Path>,
    extension: &str,
) -> std::io::Result<PathBuf> {
    let dir = recordings_dir(configured);
    std::fs::create_dir_all(&dir)?;
    let filename = format!(
        "capture_{}.{}",
        Local::now().format("%Y-%m-%d_%H-%M-%S"),
        extension
    );
    let path = dir.join(filename);
    debug!(path = %path.display(), "Default recording path");
    Ok(path)
}
