use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::warn;

use crate::{
    error::{Result, VidsumError},
    pacing::PacingPolicy,
};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TARGET_CHUNK_SECS: u32 = 900;
pub const DEFAULT_OVERLAP_SECS: u32 = 60;
pub const DEFAULT_TIMEOUT_PER_CHUNK_SECS: u64 = 1200;
pub const DEFAULT_ACTIVATION_TIMEOUT_SECS: u64 = 600;
pub const API_KEY_FILE_NAME: &str = "gemini-api-key.txt";

/// Settings for one batch run, passed explicitly to every component.
#[derive(Debug, Clone)]
pub struct SummarizeConfig {
    pub model: String,
    /// Target chunk length in seconds, `0` disables chunking.
    pub target_chunk_secs: u32,
    pub overlap_secs: u32,
    pub summary_timeout: Duration,
    pub activation_timeout: Duration,
    pub output_dir: PathBuf,
    /// Parent of the per-video temp directories.
    pub temp_root: PathBuf,
    pub keep_temp_files: bool,
    pub refine: bool,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            target_chunk_secs: DEFAULT_TARGET_CHUNK_SECS,
            overlap_secs: DEFAULT_OVERLAP_SECS,
            summary_timeout: Duration::from_secs(DEFAULT_TIMEOUT_PER_CHUNK_SECS),
            activation_timeout: Duration::from_secs(DEFAULT_ACTIVATION_TIMEOUT_SECS),
            output_dir: PathBuf::from("."),
            temp_root: default_temp_root(),
            keep_temp_files: false,
            refine: true,
        }
    }
}

impl SummarizeConfig {
    /// Clamp the overlap below the target chunk length.
    pub fn normalized(mut self) -> Self {
        if self.target_chunk_secs > 0 && self.overlap_secs >= self.target_chunk_secs {
            let adjusted = self.target_chunk_secs.saturating_sub(1);
            warn!(
                overlap = self.overlap_secs,
                target = self.target_chunk_secs,
                adjusted,
                "overlap must be shorter than the chunk duration, clamping"
            );
            self.overlap_secs = adjusted;
        }
        self
    }

    pub fn pacing(&self) -> PacingPolicy {
        PacingPolicy::for_model(&self.model)
    }
}

/// Root directory for temporary chunk files
pub fn default_temp_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("vidsum")
        .join("chunks")
}

pub fn default_api_key_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidsum")
        .join(API_KEY_FILE_NAME)
}

/// Read the API key; a missing or blank file is a configuration error.
pub fn load_api_key(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        VidsumError::configuration(format!(
            "cannot read API key file {}: {}",
            path.display(),
            e
        ))
    })?;

    let key = content.trim();
    if key.is_empty() {
        return Err(VidsumError::configuration(format!(
            "API key file {} is empty",
            path.display()
        )));
    }

    Ok(key.to_string())
}
