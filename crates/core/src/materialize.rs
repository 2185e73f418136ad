//! Turning planned windows into local chunk files.

use std::path::Path;

use tracing::{info, warn};

use crate::{
    cache::get_chunk_path,
    config::SummarizeConfig,
    error::{Result, VidsumError},
    format::format_window,
    media::MediaEngine,
    planner::{self, plan},
    progress::{Phase, ProgressEvent, ProgressReporter},
    signal::StopSignal,
    types::{ChunkRecord, ChunkState, Ledger, Segment, Stage, Video, Window},
};

/// Plan windows for `duration`, degrading to one whole-video window when the
/// chunk layout is unusable.
pub fn plan_windows(duration: f64, config: &SummarizeConfig) -> Result<Vec<Window>> {
    match plan(
        duration,
        config.target_chunk_secs as f64,
        config.overlap_secs as f64,
    ) {
        Err(e @ VidsumError::InvalidConfiguration { .. }) => {
            warn!(error = %e, "processing as a single segment");
            Ok(vec![planner::whole(duration)])
        }
        result => result,
    }
}

fn covers_whole_video(windows: &[Window], duration: f64) -> bool {
    matches!(windows, [only] if only.start <= 0.0 && only.end >= duration)
}

/// Cut every planned window into `temp_dir`. Failed windows stay in the
/// ledger as [`ChunkState::Failed`] so later phases keep the original order.
pub async fn materialize_chunks(
    media: &dyn MediaEngine,
    video: &Video,
    duration: f64,
    config: &SummarizeConfig,
    temp_dir: &Path,
    stop: &mut StopSignal,
    reporter: &dyn ProgressReporter,
) -> Result<Ledger> {
    let windows = plan_windows(duration, config)?;
    let whole_copy = covers_whole_video(&windows, duration);
    info!(
        duration,
        target = config.target_chunk_secs,
        overlap = config.overlap_secs,
        chunks = windows.len(),
        "planned chunks"
    );

    let total = windows.len();
    let mut ledger = Vec::with_capacity(total);

    for window in windows {
        stop.check()?;
        reporter.report(ProgressEvent::ChunkStarted {
            phase: Phase::Chunk,
            index: window.index,
            total,
        });

        let output = get_chunk_path(temp_dir, video, &window);
        let result = if whole_copy {
            media.copy_whole(&video.path, &output).await
        } else {
            media
                .extract_segment(&video.path, window.start, window.duration(), &output)
                .await
        };

        let mut record = ChunkRecord::planned(window);
        match result {
            Ok(local_path) => {
                info!(chunk = window.index, span = %format_window(&window), path = %local_path.display(), "created chunk");
                record.state = ChunkState::Materialized(Segment { window, local_path });
            }
            Err(e) => {
                warn!(chunk = window.index, error = %e, "skipping chunk");
                record.fail(Stage::Extract, e.to_string());
                if let ChunkState::Failed(failure) = &record.state {
                    reporter.report(ProgressEvent::ChunkFailed {
                        index: window.index,
                        failure,
                    });
                }
            }
        }
        ledger.push(record);
    }

    Ok(ledger)
}
