//! Reassembling per-chunk summaries into one document.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use crate::{
    cache::{MERGE_SEPARATOR, get_merged_path},
    error::Result,
    types::{ChunkRecord, ChunkState, Video},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedSummary {
    pub text: String,
    /// Window indices whose summaries made it in, in timeline order.
    pub included: Vec<usize>,
    /// Window indices without a summary.
    pub missing: Vec<usize>,
}

/// Join available summaries in window order, regardless of the order the
/// records (or their files) were produced in. `None` when nothing is available.
pub fn merge_summaries(records: &[ChunkRecord]) -> Option<MergedSummary> {
    let mut ordered: Vec<&ChunkRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.window.index);

    let mut parts = Vec::new();
    let mut included = Vec::new();
    let mut missing = Vec::new();
    for record in ordered {
        match record.artifact() {
            Some(artifact) => {
                parts.push(artifact.text.as_str());
                included.push(record.window.index);
            }
            None => missing.push(record.window.index),
        }
    }

    if parts.is_empty() {
        return None;
    }

    Some(MergedSummary {
        text: parts.join(MERGE_SEPARATOR),
        included,
        missing,
    })
}

fn missing_reason(record: &ChunkRecord) -> String {
    match &record.state {
        ChunkState::Failed(failure) => format!("{} failed: {}", failure.stage, failure.reason),
        _ => "no summary produced".to_string(),
    }
}

/// Merge and write `<base>_summary.md` into `output_dir`, replacing any
/// earlier file. Returns `None` (and writes nothing) when no chunk has a summary.
pub async fn write_merged_summary(
    records: &[ChunkRecord],
    video: &Video,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    for record in records.iter().filter(|r| r.artifact().is_none()) {
        warn!(
            chunk = record.window.index,
            reason = %missing_reason(record),
            "summary missing from merge"
        );
    }

    let Some(merged) = merge_summaries(records) else {
        warn!(video = %video.base_name, "no content to merge");
        return Ok(None);
    };

    fs::create_dir_all(output_dir).await?;
    let path = get_merged_path(output_dir, video);
    fs::write(&path, &merged.text).await?;
    info!(
        path = %path.display(),
        included = merged.included.len(),
        missing = merged.missing.len(),
        "merged summary written"
    );

    Ok(Some(path))
}
