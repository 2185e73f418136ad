use std::{fmt, path::PathBuf};

/// A source video discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Video {
    pub path: PathBuf,
    /// File stem, used to derive every artifact name for this video.
    pub base_name: String,
    /// Extension without the dot, `mp4` when the source has none.
    pub extension: String,
}

impl Video {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let base_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "mp4".to_string());
        Self {
            path,
            base_name,
            extension,
        }
    }
}

/// A planned time window, before anything is cut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// 1-based ordinal in timeline order.
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl Window {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A window that has been materialized into a local media file.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub window: Window,
    pub local_path: PathBuf,
}

impl Segment {
    pub fn index(&self) -> usize {
        self.window.index
    }
}

/// A file accepted by the remote summarization service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Resource name, e.g. `files/abc123`.
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}

impl RemoteFile {
    /// Last path component of the resource name, used to name local artifacts.
    pub fn key(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for RemoteFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryArtifact {
    pub key: String,
    pub text: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Upload,
    Summarize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Upload => "upload",
            Stage::Summarize => "summarize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub stage: Stage,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkState {
    Planned,
    Materialized(Segment),
    Uploaded(Segment, RemoteFile),
    Summarized(SummaryArtifact),
    Failed(ChunkFailure),
}

/// Per-window progress through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub window: Window,
    pub state: ChunkState,
}

impl ChunkRecord {
    pub fn planned(window: Window) -> Self {
        Self {
            window,
            state: ChunkState::Planned,
        }
    }

    pub fn fail(&mut self, stage: Stage, reason: impl Into<String>) {
        self.state = ChunkState::Failed(ChunkFailure {
            stage,
            reason: reason.into(),
        });
    }

    pub fn artifact(&self) -> Option<&SummaryArtifact> {
        match &self.state {
            ChunkState::Summarized(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn segment(&self) -> Option<&Segment> {
        match &self.state {
            ChunkState::Materialized(segment) | ChunkState::Uploaded(segment, _) => Some(segment),
            _ => None,
        }
    }
}

/// Ordered per-window ledger for one video.
pub type Ledger = Vec<ChunkRecord>;

/// How processing of one video ended.
#[derive(Debug)]
pub enum VideoOutcome {
    Completed {
        merged: PathBuf,
        refined: Option<PathBuf>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: crate::VidsumError,
    },
    Cancelled,
}

impl VideoOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, VideoOutcome::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_derives_names_from_path() {
        let video = Video::new("/videos/talks/Keynote.MKV");
        assert_eq!(video.base_name, "Keynote");
        assert_eq!(video.extension, "MKV");

        let bare = Video::new("/videos/raw");
        assert_eq!(bare.base_name, "raw");
        assert_eq!(bare.extension, "mp4");
    }

    #[test]
    fn remote_key_is_last_path_component() {
        let remote = RemoteFile {
            name: "files/abc123".into(),
            uri: String::new(),
            mime_type: String::new(),
        };
        assert_eq!(remote.key(), "abc123");
    }

    #[test]
    fn failing_a_record_drops_its_segment() {
        let window = Window {
            index: 1,
            start: 0.0,
            end: 10.0,
        };
        let mut record = ChunkRecord {
            window,
            state: ChunkState::Materialized(Segment {
                window,
                local_path: "chunk_1.mp4".into(),
            }),
        };
        assert!(record.segment().is_some());
        record.fail(Stage::Upload, "boom");
        assert!(record.segment().is_none());
        assert!(record.artifact().is_none());
    }
}
