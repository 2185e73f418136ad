//! Per-video orchestration and the batch loop.
//!
//! Each video runs inside its own failure boundary: any error is logged and
//! turned into a [`VideoOutcome`], and cleanup of remote files and the temp
//! directory always runs afterwards.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use tokio::fs;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    cache::{get_refined_path, get_video_temp_dir},
    config::SummarizeConfig,
    error::{Result, VidsumError},
    format::format_duration,
    materialize::materialize_chunks,
    media::MediaEngine,
    merge::write_merged_summary,
    pacing::{Clock, Pacer, TokioClock},
    progress::{Phase, ProgressEvent, ProgressReporter, SilentReporter},
    provider::SummaryService,
    refine::refine_merged_summary,
    signal::StopSignal,
    submit::ChunkSubmitter,
    types::{ChunkState, RemoteFile, Video, VideoOutcome},
};

pub struct BatchReport {
    pub run_id: Uuid,
    pub results: Vec<(Video, VideoOutcome)>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.results.iter().filter(|(_, o)| o.is_completed()).count()
    }
}

pub struct Summarizer {
    config: SummarizeConfig,
    media: Arc<dyn MediaEngine>,
    service: Arc<dyn SummaryService>,
    pacer: Pacer,
    reporter: Arc<dyn ProgressReporter>,
}

impl Summarizer {
    pub fn new(
        config: SummarizeConfig,
        media: Arc<dyn MediaEngine>,
        service: Arc<dyn SummaryService>,
    ) -> Self {
        let pacer = Pacer::new(config.pacing(), Arc::new(TokioClock));
        Self {
            config,
            media,
            service,
            pacer,
            reporter: Arc::new(SilentReporter),
        }
    }

    /// Swap the pacing clock, e.g. for a fake one in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.pacer = Pacer::new(self.config.pacing(), clock);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Process `videos` one after another. A raised stop signal finishes the
    /// current video's cleanup and skips the rest.
    pub async fn run_batch(&mut self, videos: &[PathBuf], stop: &mut StopSignal) -> BatchReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("batch", %run_id, videos = videos.len());

        async {
            let total = videos.len();
            let mut results = Vec::with_capacity(total);

            for (position, path) in videos.iter().enumerate() {
                if stop.is_raised() {
                    warn!(remaining = total - position, "stop requested, skipping remaining videos");
                    break;
                }

                let video = Video::new(path);
                self.reporter.report(ProgressEvent::VideoStarted {
                    video: &video,
                    position: position + 1,
                    total,
                });

                let outcome = self.process_video(&video, stop).await;
                self.reporter.report(ProgressEvent::VideoFinished {
                    video: &video,
                    outcome: &outcome,
                });
                results.push((video, outcome));
            }

            info!("all video processing complete");
            BatchReport { run_id, results }
        }
        .instrument(span)
        .await
    }

    /// Run every phase for one video, then clean up no matter how it ended.
    pub async fn process_video(&mut self, video: &Video, stop: &mut StopSignal) -> VideoOutcome {
        let span = info_span!("video", name = %video.base_name);
        async {
            let started = Instant::now();
            let temp_dir = get_video_temp_dir(&self.config.temp_root, video);
            let mut held: Vec<RemoteFile> = Vec::new();

            let outcome = match self.run_phases(video, &temp_dir, &mut held, stop).await {
                Ok(outcome) => outcome,
                Err(VidsumError::Cancelled) => {
                    warn!("cancelled, cleaning up");
                    VideoOutcome::Cancelled
                }
                Err(e @ (VidsumError::DurationProbe { .. } | VidsumError::TooManyChunks { .. })) => {
                    warn!(error = %e, "skipping video");
                    VideoOutcome::Skipped {
                        reason: e.to_string(),
                    }
                }
                Err(error) => {
                    error!(video = %video.path.display(), error = %error, "unhandled error while processing video");
                    VideoOutcome::Failed { error }
                }
            };

            self.cleanup(&temp_dir, held).await;
            info!(elapsed = %format_duration(started.elapsed()), "finished video");
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_phases(
        &mut self,
        video: &Video,
        temp_dir: &Path,
        held: &mut Vec<RemoteFile>,
        stop: &mut StopSignal,
    ) -> Result<VideoOutcome> {
        self.prepare_temp_dir(temp_dir).await?;

        self.phase_started(Phase::Probe);
        let duration = self.media.probe_duration(&video.path).await?;
        self.phase_finished(Phase::Probe, format!("{:.2}s", duration));

        self.phase_started(Phase::Chunk);
        let mut ledger = materialize_chunks(
            self.media.as_ref(),
            video,
            duration,
            &self.config,
            temp_dir,
            stop,
            self.reporter.as_ref(),
        )
        .await?;
        let created = ledger
            .iter()
            .filter(|r| matches!(r.state, ChunkState::Materialized(_)))
            .count();
        self.phase_finished(Phase::Chunk, format!("{}/{} chunks", created, ledger.len()));
        if created == 0 {
            return Ok(skipped(video, "no video chunks were created"));
        }

        let mut submitter = ChunkSubmitter {
            service: self.service.as_ref(),
            pacer: &mut self.pacer,
            reporter: self.reporter.as_ref(),
            config: &self.config,
        };

        self.reporter
            .report(ProgressEvent::PhaseStarted { phase: Phase::Upload });
        let active = submitter.upload_all(&mut ledger, held, stop).await?;
        self.reporter.report(ProgressEvent::PhaseFinished {
            phase: Phase::Upload,
            detail: format!("{}/{} uploaded", active, created),
        });
        if active == 0 {
            return Ok(skipped(video, "no chunks were uploaded"));
        }

        self.reporter
            .report(ProgressEvent::PhaseStarted { phase: Phase::Summarize });
        let produced = submitter.summarize_all(&mut ledger, temp_dir, stop).await?;
        self.reporter.report(ProgressEvent::PhaseFinished {
            phase: Phase::Summarize,
            detail: format!("{}/{} summarized", produced, active),
        });
        if produced == 0 {
            return Ok(skipped(video, "no chunk summaries were generated"));
        }

        self.phase_started(Phase::Merge);
        let Some(merged) = write_merged_summary(&ledger, video, &self.config.output_dir).await?
        else {
            let error = VidsumError::MergeEmpty {
                video: video.base_name.clone(),
            };
            return Ok(skipped(video, &error.to_string()));
        };
        self.phase_finished(Phase::Merge, merged.display().to_string());

        let refined = if self.config.refine {
            self.refine(video, &merged).await
        } else {
            None
        };

        Ok(VideoOutcome::Completed { merged, refined })
    }

    async fn refine(&mut self, video: &Video, merged: &Path) -> Option<PathBuf> {
        self.phase_started(Phase::Refine);
        let refined_path = get_refined_path(&self.config.output_dir, video);
        match refine_merged_summary(
            self.service.as_ref(),
            &mut self.pacer,
            merged,
            &refined_path,
            self.config.summary_timeout,
        )
        .await
        {
            Ok(Some(path)) => {
                self.phase_finished(Phase::Refine, path.display().to_string());
                Some(path)
            }
            Ok(None) => {
                self.phase_finished(Phase::Refine, "skipped".to_string());
                None
            }
            Err(e) => {
                warn!(error = %e, "refinement failed, keeping merged summary");
                self.phase_finished(Phase::Refine, "failed".to_string());
                None
            }
        }
    }

    async fn prepare_temp_dir(&self, temp_dir: &Path) -> Result<()> {
        if fs::try_exists(temp_dir).await? {
            info!(dir = %temp_dir.display(), "removing stale temporary directory");
            fs::remove_dir_all(temp_dir).await?;
        }
        fs::create_dir_all(temp_dir).await?;
        Ok(())
    }

    /// Delete remote files and the temp directory. Failures are logged only.
    async fn cleanup(&mut self, temp_dir: &Path, held: Vec<RemoteFile>) {
        self.phase_started(Phase::Cleanup);
        let mut deleted = 0;
        for file in &held {
            match self.service.delete(file).await {
                Ok(()) => {
                    info!(remote = %file, "deleted remote file");
                    deleted += 1;
                }
                Err(e) => warn!(remote = %file, error = %e, "could not delete remote file"),
            }
        }

        let local = if self.config.keep_temp_files {
            info!(dir = %temp_dir.display(), "temporary files kept");
            format!("kept {}", temp_dir.display())
        } else {
            match fs::remove_dir_all(temp_dir).await {
                Ok(()) => "temp files removed".to_string(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => "no temp files".to_string(),
                Err(e) => {
                    warn!(dir = %temp_dir.display(), error = %e, "could not delete temporary directory");
                    "temp files left behind".to_string()
                }
            }
        };

        self.phase_finished(
            Phase::Cleanup,
            format!("{}/{} remote files deleted, {}", deleted, held.len(), local),
        );
    }

    fn phase_started(&self, phase: Phase) {
        info!(%phase, "phase started");
        self.reporter.report(ProgressEvent::PhaseStarted { phase });
    }

    fn phase_finished(&self, phase: Phase, detail: String) {
        self.reporter
            .report(ProgressEvent::PhaseFinished { phase, detail });
    }
}

fn skipped(video: &Video, reason: &str) -> VideoOutcome {
    warn!(video = %video.base_name, reason, "abandoning video");
    VideoOutcome::Skipped {
        reason: reason.to_string(),
    }
}
