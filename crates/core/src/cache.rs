//! On-disk layout of per-video temp files and final artifacts.

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    path::{Path, PathBuf},
};

use crate::types::{Video, Window};

pub const MERGE_SEPARATOR: &str = "\n\n---\n\n";

/// Temp directory for one video, keyed by base name plus a hash of the full
/// path so same-named videos in different folders do not collide.
pub fn get_video_temp_dir(temp_root: &Path, video: &Video) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    video.path.hash(&mut hasher);
    let path_hash = hasher.finish();

    temp_root.join(format!("{}-{:016x}", video.base_name, path_hash))
}

pub fn get_chunk_path(temp_dir: &Path, video: &Video, window: &Window) -> PathBuf {
    temp_dir.join(format!("chunk_{}.{}", window.index, video.extension))
}

/// Per-chunk summary file, named after the remote file key
pub fn get_summary_path(temp_dir: &Path, remote_key: &str) -> PathBuf {
    temp_dir.join(format!("summary_{}.md", remote_key))
}

pub fn get_merged_path(output_dir: &Path, video: &Video) -> PathBuf {
    output_dir.join(format!("{}_summary.md", video.base_name))
}

pub fn get_refined_path(output_dir: &Path, video: &Video) -> PathBuf {
    output_dir.join(format!("{}_summary_v2.md", video.base_name))
}
