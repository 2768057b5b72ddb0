use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::{DedupOutcome, DropReason};
use crate::source::FrameSource;

/// Ordered slide list handed to the document assembler.
#[derive(Debug, Serialize)]
pub struct SlideManifest {
    pub generated_at: DateTime<Utc>,
    pub source_video: Option<PathBuf>,
    pub frames_dir: PathBuf,
    pub diff_threshold: f64,
    pub face_detection: bool,
    pub slides: Vec<SlideEntry>,
    pub dropped: Vec<DroppedEntry>,
}

#[derive(Debug, Serialize)]
pub struct SlideEntry {
    /// 1-based page number in the assembled deck.
    pub page: usize,
    pub sequence_index: usize,
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct DroppedEntry {
    pub sequence_index: usize,
    pub path: PathBuf,
    pub reason: DropReason,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("frame {0} has no backing file in the frames folder")]
    UnknownFrame(usize),
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write manifest {0}: {1}")]
    Write(String, std::io::Error),
}

impl SlideManifest {
    pub fn build(
        source: &FrameSource,
        outcome: &DedupOutcome,
        source_video: Option<&Path>,
        diff_threshold: f64,
        face_detection: bool,
    ) -> Result<Self, ManifestError> {
        let path_of = |index: usize| {
            source
                .path(index)
                .map(Path::to_path_buf)
                .ok_or(ManifestError::UnknownFrame(index))
        };

        let slides = outcome
            .kept
            .iter()
            .enumerate()
            .map(|(i, &index)| -> Result<SlideEntry, ManifestError> {
                Ok(SlideEntry {
                    page: i + 1,
                    sequence_index: index,
                    path: path_of(index)?,
                })
            })
            .collect::<Result<Vec<_>, ManifestError>>()?;

        let dropped = outcome
            .dropped
            .iter()
            .map(|(&index, &reason)| -> Result<DroppedEntry, ManifestError> {
                Ok(DroppedEntry {
                    sequence_index: index,
                    path: path_of(index)?,
                    reason,
                })
            })
            .collect::<Result<Vec<_>, ManifestError>>()?;

        Ok(Self {
            generated_at: Utc::now(),
            source_video: source_video.map(Path::to_path_buf),
            frames_dir: source.dir().to_path_buf(),
            diff_threshold,
            face_detection,
            slides,
            dropped,
        })
    }

    pub async fn write(&self, path: &Path) -> Result<(), ManifestError> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| ManifestError::Write(path.display().to_string(), e))?;
        info!(path = %path.display(), slides = self.slides.len(), "slide manifest written");
        Ok(())
    }
}
