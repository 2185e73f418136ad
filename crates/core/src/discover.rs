use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{Result, VidsumError};

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["mp4", "mov", "mkv", "avi", "webm"];

pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Resolve `input` to a sorted list of absolute video paths.
///
/// A directory is searched recursively. A missing path or an unsupported
/// single file is a configuration error; an empty directory is not.
pub fn discover_videos(input: &Path) -> Result<Vec<PathBuf>> {
    let input = std::path::absolute(input)?;

    if input.is_file() {
        if !is_supported_video(&input) {
            return Err(VidsumError::configuration(format!(
                "{} is not a supported video type ({})",
                input.display(),
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }
        return Ok(vec![input]);
    }

    if !input.is_dir() {
        return Err(VidsumError::configuration(format!(
            "input path not found: {}",
            input.display()
        )));
    }

    info!(dir = %input.display(), "scanning for videos");
    let mut videos: Vec<PathBuf> = WalkDir::new(&input)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_supported_video(path))
        .collect();
    videos.sort();

    Ok(videos)
}
