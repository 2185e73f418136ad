//! Media probing and cutting via ffprobe / ffmpeg.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{fs, process::Command};

use crate::error::{Result, VidsumError};

#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Duration of `video` in seconds.
    async fn probe_duration(&self, video: &Path) -> Result<f64>;

    /// Cut `[start, start + duration)` of `video` into `output` without re-encoding.
    async fn extract_segment(
        &self,
        video: &Path,
        start: f64,
        duration: f64,
        output: &Path,
    ) -> Result<PathBuf>;

    /// Copy the whole source, used when a single full-length window is planned.
    async fn copy_whole(&self, video: &Path, output: &Path) -> Result<PathBuf> {
        fs::copy(video, output)
            .await
            .map_err(|e| VidsumError::Extraction {
                chunk_path: output.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(output.to_path_buf())
    }
}

#[derive(Debug, Default, Clone)]
pub struct FfmpegEngine;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Video stream duration, falling back to the container duration.
fn parse_probe_duration(json: &str) -> std::result::Result<f64, String> {
    let probe: ProbeOutput = serde_json::from_str(json).map_err(|e| e.to_string())?;

    let stream_duration = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| "no video stream".to_string())?
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok());

    let format_duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok());

    stream_duration
        .or(format_duration)
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| "no duration in metadata".to_string())
}

/// Stream-copy arguments for one cut. Only video and audio are mapped; data
/// and timecode tracks (e.g. `mebx` in phone recordings) cannot be muxed into
/// every container.
fn segment_args(video: &Path, start: f64, duration: f64, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-v", "error", "-ss"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(format!("{:.3}", start).into());
    args.push("-t".into());
    args.push(format!("{:.3}", duration).into());
    args.push("-i".into());
    args.push(video.into());
    for arg in ["-map", "0:v", "-map", "0:a?", "-dn", "-c", "copy"] {
        args.push(arg.into());
    }
    args.push(output.into());
    args
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn probe_duration(&self, video: &Path) -> Result<f64> {
        let output = Command::new("ffprobe")
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("stream=codec_type,duration:format=duration")
            .arg("-of")
            .arg("json")
            .arg(video)
            .output()
            .await
            .map_err(|e| VidsumError::DurationProbe {
                video_path: video.to_path_buf(),
                reason: format!("failed to run ffprobe: {}", e),
            })?;

        if !output.status.success() {
            return Err(VidsumError::DurationProbe {
                video_path: video.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout)).map_err(|reason| {
            VidsumError::DurationProbe {
                video_path: video.to_path_buf(),
                reason,
            }
        })
    }

    async fn extract_segment(
        &self,
        video: &Path,
        start: f64,
        duration: f64,
        output: &Path,
    ) -> Result<PathBuf> {
        let result = Command::new("ffmpeg")
            .args(segment_args(video, start, duration, output))
            .output()
            .await
            .map_err(|e| VidsumError::Extraction {
                chunk_path: output.to_path_buf(),
                reason: format!("failed to run ffmpeg: {}", e),
            })?;

        if !result.status.success() {
            return Err(VidsumError::Extraction {
                chunk_path: output.to_path_buf(),
                reason: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(output.to_path_buf())
    }
}
