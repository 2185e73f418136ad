//! Per-phase progress notifications for front ends.

use std::fmt;

use crate::types::{ChunkFailure, Video, VideoOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Probe,
    Chunk,
    Upload,
    Summarize,
    Merge,
    Refine,
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Probe => "Probing duration",
            Phase::Chunk => "Creating chunks",
            Phase::Upload => "Uploading chunks",
            Phase::Summarize => "Summarizing chunks",
            Phase::Merge => "Merging summaries",
            Phase::Refine => "Refining summary",
            Phase::Cleanup => "Cleaning up",
        };
        f.write_str(label)
    }
}

#[derive(Debug)]
pub enum ProgressEvent<'a> {
    VideoStarted {
        video: &'a Video,
        position: usize,
        total: usize,
    },
    PhaseStarted {
        phase: Phase,
    },
    ChunkStarted {
        phase: Phase,
        index: usize,
        total: usize,
    },
    ChunkFailed {
        index: usize,
        failure: &'a ChunkFailure,
    },
    PhaseFinished {
        phase: Phase,
        detail: String,
    },
    VideoFinished {
        video: &'a Video,
        outcome: &'a VideoOutcome,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent<'_>);
}

/// Reporter that ignores everything; logging still happens through `tracing`.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn report(&self, _event: ProgressEvent<'_>) {}
}
