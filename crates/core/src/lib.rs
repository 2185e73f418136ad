//! Vidsum Core Library
//!
//! Splits long videos into overlapping chunks, summarizes each chunk with a
//! remote multimodal model and merges the results into one document.

pub mod cache;
pub mod config;
pub mod discover;
pub mod error;
pub mod format;
pub mod materialize;
pub mod media;
pub mod merge;
pub mod pacing;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod provider;
pub mod refine;
pub mod signal;
pub mod submit;
pub mod types;

// Re-export commonly used items at crate root
pub use config::{SummarizeConfig, default_api_key_path, default_temp_root, load_api_key};
pub use discover::discover_videos;
pub use error::{Result, VidsumError};
pub use format::{format_duration, format_timestamp};
pub use media::{FfmpegEngine, MediaEngine};
pub use merge::{MergedSummary, merge_summaries};
pub use pacing::{CallKind, Clock, Pacer, PacingPolicy, TokioClock};
pub use pipeline::{BatchReport, Summarizer};
pub use planner::plan;
pub use progress::{Phase, ProgressEvent, ProgressReporter, SilentReporter};
pub use provider::{GeminiClient, SummaryService};
pub use signal::StopSignal;
pub use types::{
    ChunkFailure, ChunkRecord, ChunkState, RemoteFile, Segment, Stage, SummaryArtifact, Video,
    VideoOutcome, Window,
};
