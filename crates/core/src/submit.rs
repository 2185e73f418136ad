//! Uploading chunks and requesting per-chunk summaries.

use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use crate::{
    cache::get_summary_path,
    config::SummarizeConfig,
    error::{Result, VidsumError},
    pacing::{CallKind, Pacer},
    progress::{Phase, ProgressEvent, ProgressReporter},
    provider::SummaryService,
    signal::StopSignal,
    types::{ChunkRecord, ChunkState, Ledger, RemoteFile, Stage, SummaryArtifact},
};

pub static SUMMARY_PROMPT: &str = r#"You are summarizing one part of a longer video. The clip may start or end mid-sentence because neighbouring parts overlap by a short margin.

Write a detailed summary of this clip in Markdown:
- Start with a short paragraph describing what happens in the clip.
- Follow with bullet points covering every topic, argument, demonstration, and conclusion, in the order they appear.
- Include names, numbers, code, and on-screen text that matter for understanding.
- Describe visual content only when it carries information not present in the speech.

Do not add an introduction about yourself and do not mention that this is a clip or a part of a video."#;

fn fail(record: &mut ChunkRecord, stage: Stage, reason: String, reporter: &dyn ProgressReporter) {
    record.fail(stage, reason);
    if let ChunkState::Failed(failure) = &record.state {
        reporter.report(ProgressEvent::ChunkFailed {
            index: record.window.index,
            failure,
        });
    }
}

/// Sequential, paced submission of one video's chunks.
pub struct ChunkSubmitter<'a> {
    pub service: &'a dyn SummaryService,
    pub pacer: &'a mut Pacer,
    pub reporter: &'a dyn ProgressReporter,
    pub config: &'a SummarizeConfig,
}

impl ChunkSubmitter<'_> {
    /// Upload every materialized chunk and wait for it to become active.
    ///
    /// Every file the service accepted is pushed to `held`, even if it never
    /// becomes active, so cleanup can delete it. Returns the number of chunks
    /// ready for summarization.
    pub async fn upload_all(
        &mut self,
        ledger: &mut Ledger,
        held: &mut Vec<RemoteFile>,
        stop: &mut StopSignal,
    ) -> Result<usize> {
        let total = ledger.len();
        let mut active = 0;

        for record in ledger.iter_mut() {
            let ChunkState::Materialized(segment) = &record.state else {
                continue;
            };
            let segment = segment.clone();

            stop.check()?;
            self.pacer.acquire(CallKind::Upload).await;
            self.reporter.report(ProgressEvent::ChunkStarted {
                phase: Phase::Upload,
                index: segment.index(),
                total,
            });
            info!(chunk = segment.index(), path = %segment.local_path.display(), "uploading chunk");

            let uploaded = match stop.guard(self.service.upload(&segment.local_path)).await {
                Err(VidsumError::Cancelled) => return Err(VidsumError::Cancelled),
                Ok(file) => file,
                Err(e) => {
                    warn!(chunk = segment.index(), error = %e, "upload failed");
                    fail(record, Stage::Upload, e.to_string(), self.reporter);
                    continue;
                }
            };
            held.push(uploaded.clone());

            match stop.guard(self.service.await_ready(uploaded)).await {
                Err(VidsumError::Cancelled) => return Err(VidsumError::Cancelled),
                Ok(file) => {
                    info!(chunk = segment.index(), remote = %file, "chunk active");
                    record.state = ChunkState::Uploaded(segment, file);
                    active += 1;
                }
                Err(e) => {
                    warn!(chunk = segment.index(), error = %e, "remote file never became active");
                    fail(record, Stage::Upload, e.to_string(), self.reporter);
                }
            }
        }

        Ok(active)
    }

    /// Summarize every active chunk, persisting each result to `temp_dir`
    /// before moving on. Returns the number of summaries produced.
    pub async fn summarize_all(
        &mut self,
        ledger: &mut Ledger,
        temp_dir: &Path,
        stop: &mut StopSignal,
    ) -> Result<usize> {
        let total = ledger.len();
        let mut produced = 0;

        for record in ledger.iter_mut() {
            let ChunkState::Uploaded(segment, remote) = &record.state else {
                continue;
            };
            let (index, remote) = (segment.index(), remote.clone());

            stop.check()?;
            self.pacer.acquire(CallKind::Generate).await;
            self.reporter.report(ProgressEvent::ChunkStarted {
                phase: Phase::Summarize,
                index,
                total,
            });
            info!(chunk = index, remote = %remote, model = %self.config.model, "generating summary");

            let text = match stop
                .guard(
                    self.service
                        .summarize(&remote, SUMMARY_PROMPT, self.config.summary_timeout),
                )
                .await
            {
                Err(VidsumError::Cancelled) => return Err(VidsumError::Cancelled),
                Ok(text) => text,
                Err(e) => {
                    warn!(chunk = index, error = %e, "no summary generated");
                    fail(record, Stage::Summarize, e.to_string(), self.reporter);
                    continue;
                }
            };

            let path = get_summary_path(temp_dir, remote.key());
            if let Err(e) = fs::write(&path, &text).await {
                warn!(chunk = index, path = %path.display(), error = %e, "could not save summary");
                fail(
                    record,
                    Stage::Summarize,
                    format!("could not save summary: {}", e),
                    self.reporter,
                );
                continue;
            }

            info!(chunk = index, path = %path.display(), "summary saved");
            record.state = ChunkState::Summarized(SummaryArtifact {
                key: remote.key().to_string(),
                text,
                path,
            });
            produced += 1;
        }

        Ok(produced)
    }
}
