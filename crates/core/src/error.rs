use std::{path::PathBuf, time::Duration};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidsumError {
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Could not determine duration of {video_path}: {reason}")]
    DurationProbe { video_path: PathBuf, reason: String },

    #[error(
        "Invalid chunk layout: overlap {overlap:.2}s leaves no content in a {target:.2}s chunk"
    )]
    InvalidConfiguration { target: f64, overlap: f64 },

    #[error("Refusing to split {duration:.0}s into {core:.0}s chunks: duration looks corrupt")]
    TooManyChunks { duration: f64, core: f64 },

    #[error("Extraction failed for {chunk_path}: {reason}")]
    Extraction { chunk_path: PathBuf, reason: String },

    #[error("Upload failed for {path}: {reason}")]
    Upload { path: PathBuf, reason: String },

    #[error("Remote file {remote} was not ready after {waited:?}")]
    ActivationTimeout { remote: String, waited: Duration },

    #[error("Summary for {remote} timed out after {timeout:?}")]
    SummaryTimeout { remote: String, timeout: Duration },

    #[error("Summary service error: {reason}")]
    SummaryService { reason: String },

    #[error("No summaries available to merge for {video}")]
    MergeEmpty { video: String },

    #[error("Refinement failed: {reason}")]
    Refinement { reason: String },

    #[error("Processing cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VidsumError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Only configuration problems stop the whole run; everything else is
    /// handled at the chunk, phase or video level.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

pub type Result<T> = std::result::Result<T, VidsumError>;
