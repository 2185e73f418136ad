use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use vidsum_core::{Phase, ProgressEvent, ProgressReporter, VideoOutcome, format_duration};

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(spinner_style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn done_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Probe => "Probed",
        Phase::Chunk => "Chunked",
        Phase::Upload => "Uploaded",
        Phase::Summarize => "Summarized",
        Phase::Merge => "Merged",
        Phase::Refine => "Refined",
        Phase::Cleanup => "Cleaned up",
    }
}

struct ActivePhase {
    spinner: ProgressBar,
    started: Instant,
}

/// Spinner per phase, one line per finished phase.
pub struct ConsoleReporter {
    active: Mutex<Option<ActivePhase>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    fn println(&self, line: String) {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        match active.as_ref() {
            Some(phase) => phase.spinner.println(line),
            None => println!("{}", line),
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn report(&self, event: ProgressEvent<'_>) {
        match event {
            ProgressEvent::VideoStarted {
                video,
                position,
                total,
            } => {
                println!(
                    "\n{} {}  {}",
                    style(format!("[{}/{}]", position, total)).dim(),
                    style(&video.base_name).cyan().bold(),
                    style(video.path.display()).dim()
                );
                println!("{}", style("─".repeat(60)).dim());
            }
            ProgressEvent::PhaseStarted { phase } => {
                let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(previous) = active.take() {
                    previous.spinner.finish_and_clear();
                }
                *active = Some(ActivePhase {
                    spinner: create_spinner(&format!("{}...", phase)),
                    started: Instant::now(),
                });
            }
            ProgressEvent::ChunkStarted {
                phase,
                index,
                total,
            } => {
                let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(current) = active.as_ref() {
                    current
                        .spinner
                        .set_message(format!("{} ({}/{})...", phase, index, total));
                }
            }
            ProgressEvent::ChunkFailed { index, failure } => {
                self.println(format!(
                    "  {} chunk {} {} failed: {}",
                    style("!").yellow().bold(),
                    index,
                    failure.stage,
                    style(&failure.reason).dim()
                ));
            }
            ProgressEvent::PhaseFinished { phase, detail } => {
                let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
                let line = |elapsed: Duration| {
                    format!(
                        "{} {}: {} {}",
                        style("✓").green().bold(),
                        done_label(phase),
                        detail,
                        style(format!("[{}]", format_duration(elapsed))).dim()
                    )
                };
                match active.take() {
                    Some(current) => current
                        .spinner
                        .finish_with_message(line(current.started.elapsed())),
                    None => println!("{}", line(Duration::ZERO)),
                }
            }
            ProgressEvent::VideoFinished { outcome, .. } => {
                let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(current) = active.take() {
                    current.spinner.finish_and_clear();
                }
                println!("{}", describe_outcome(outcome));
            }
        }
    }
}

pub fn describe_outcome(outcome: &VideoOutcome) -> String {
    match outcome {
        VideoOutcome::Completed { merged, refined } => {
            let mut line = format!(
                "{} {}",
                style("Saved:").green().bold(),
                style(merged.display()).cyan()
            );
            if let Some(refined) = refined {
                line.push_str(&format!(
                    "\n{} {}",
                    style("Refined:").green().bold(),
                    style(refined.display()).cyan()
                ));
            }
            line
        }
        VideoOutcome::Skipped { reason } => {
            format!("{} {}", style("Skipped:").yellow().bold(), reason)
        }
        VideoOutcome::Failed { error } => {
            format!("{} {}", style("Failed:").red().bold(), error)
        }
        VideoOutcome::Cancelled => format!("{}", style("Cancelled").yellow().bold()),
    }
}
