use std::{path::PathBuf, sync::Arc, time::Duration, time::Instant};

use anyhow::Result;
use clap::Parser;
use console::style;
use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vidsum_core::{
    FfmpegEngine, GeminiClient, StopSignal, SummarizeConfig, Summarizer, VidsumError,
    config::{
        DEFAULT_ACTIVATION_TIMEOUT_SECS, DEFAULT_MODEL, DEFAULT_OVERLAP_SECS,
        DEFAULT_TARGET_CHUNK_SECS, DEFAULT_TIMEOUT_PER_CHUNK_SECS,
    },
    default_api_key_path, default_temp_root, discover_videos, format_duration, load_api_key,
};

use crate::reporter::{ConsoleReporter, describe_outcome};

mod reporter;

#[derive(Parser)]
#[command(name = "vidsum")]
#[command(
    about = "Summarize long videos with Gemini: split into overlapping chunks, summarize each, merge the results"
)]
#[command(version)]
struct Cli {
    /// Video file or directory containing videos (searched recursively)
    input_path: PathBuf,

    /// Gemini model to use
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Target chunk duration in seconds (0 disables chunking)
    #[arg(long, default_value_t = DEFAULT_TARGET_CHUNK_SECS)]
    max_chunk_duration: u32,

    /// Overlap between adjacent chunks in seconds
    #[arg(long, default_value_t = DEFAULT_OVERLAP_SECS)]
    overlap_duration: u32,

    /// Timeout in seconds for each summary request
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_PER_CHUNK_SECS)]
    timeout_per_chunk: u64,

    /// How long to wait for an uploaded chunk to become usable, in seconds
    #[arg(long, default_value_t = DEFAULT_ACTIVATION_TIMEOUT_SECS)]
    activation_timeout: u64,

    /// Directory for the final summary files (default: current directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Parent directory for temporary chunks and per-chunk summaries
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Keep chunk files and per-chunk summaries after processing
    #[arg(short, long)]
    keep_temp_files: bool,

    /// Skip the refinement pass over the merged summary
    #[arg(long)]
    no_refine: bool,

    /// File containing the Gemini API key
    #[arg(long)]
    api_key_file: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> SummarizeConfig {
        SummarizeConfig {
            model: self.model.clone(),
            target_chunk_secs: self.max_chunk_duration,
            overlap_secs: self.overlap_duration,
            summary_timeout: Duration::from_secs(self.timeout_per_chunk),
            activation_timeout: Duration::from_secs(self.activation_timeout),
            output_dir: self.output_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            temp_root: self.temp_dir.clone().unwrap_or_else(default_temp_root),
            keep_temp_files: self.keep_temp_files,
            refine: !self.no_refine,
        }
        .normalized()
    }
}

fn fatal(error: VidsumError) -> ! {
    eprintln!("{} {}", style("Error:").red().bold(), error);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    // Validate credentials and input before touching anything
    let api_key_path = cli.api_key_file.clone().unwrap_or_else(default_api_key_path);
    let api_key = load_api_key(&api_key_path).unwrap_or_else(|e| fatal(e));
    let videos = discover_videos(&cli.input_path).unwrap_or_else(|e| fatal(e));

    if videos.is_empty() {
        println!("No video files found in {}", cli.input_path.display());
        return Ok(());
    }

    println!(
        "\n{}  {}",
        style("vidsum").cyan().bold(),
        style("Video Summarizer").dim()
    );
    println!(
        "{} video(s), model {}, chunks {}s with {}s overlap",
        videos.len(),
        style(&config.model).yellow(),
        config.target_chunk_secs,
        config.overlap_secs
    );

    let (stop_tx, stop_rx) = broadcast::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!(
            "\n{} stopping after cleanup of the current video (Ctrl-C again to quit now)...",
            style("Interrupted:").yellow().bold()
        );
        let _ = stop_tx.send(());

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "{} remote files and temporary chunks may be left behind",
                style("Aborted:").red().bold()
            );
            std::process::exit(130);
        }
    });

    let service = GeminiClient::new(api_key, &config.model)
        .unwrap_or_else(|e| fatal(e))
        .with_activation_timeout(config.activation_timeout);
    let mut summarizer = Summarizer::new(config, Arc::new(FfmpegEngine), Arc::new(service))
        .with_reporter(Arc::new(ConsoleReporter::new()));

    let total_start = Instant::now();
    let report = summarizer
        .run_batch(&videos, &mut StopSignal::new(stop_rx))
        .await;

    println!("\n{}", style("─".repeat(60)).dim());
    for (video, outcome) in &report.results {
        println!("{}  {}", style(&video.base_name).bold(), describe_outcome(outcome));
    }
    println!(
        "\n{} {} of {} video(s) summarized in {}\n",
        style("Done:").dim(),
        report.completed(),
        videos.len(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );

    Ok(())
}
