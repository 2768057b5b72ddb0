use rayon::prelude::*;
use slide_deck_common::frame::Frame;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::engine::DedupError;

/// Extracted keyframes on disk, in extraction order.
///
/// Files are ordered by the number at the end of their stem, so
/// `frame_1000.jpeg` follows `frame_999.jpeg` even though a plain name sort
/// would not. Names without a trailing number sort after numbered ones, by
/// name.
#[derive(Debug, Clone)]
pub struct FrameSource {
    dir: PathBuf,
    paths: Vec<PathBuf>,
}

impl FrameSource {
    pub fn scan(dir: &Path, extension: &str) -> Result<Self, SourceError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| SourceError::ReadDir(dir.display().to_string(), e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SourceError::ReadDir(dir.display().to_string(), e))?;
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            if matches && path.is_file() {
                paths.push(path);
            }
        }

        paths.sort_by_cached_key(|p| sort_key(p));

        info!(
            dir = %dir.display(),
            extension,
            frames = paths.len(),
            "scanned frames folder"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            paths,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn path(&self, sequence_index: usize) -> Option<&Path> {
        self.paths.get(sequence_index).map(PathBuf::as_path)
    }

    /// Decode the frame at `sequence_index` as 8-bit RGB.
    pub fn load(&self, sequence_index: usize) -> Result<Frame, DedupError> {
        let path = self
            .paths
            .get(sequence_index)
            .ok_or(DedupError::UnknownFrame {
                index: sequence_index,
                available: self.paths.len(),
            })?;
        let image = image::open(path)
            .map_err(|source| DedupError::UnreadableFrame {
                index: sequence_index,
                path: path.clone(),
                source,
            })?
            .to_rgb8();
        debug!(
            frame = sequence_index,
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "decoded frame"
        );
        Ok(Frame::new(sequence_index, image, path.clone()))
    }

    /// Lazily decode frames one at a time, in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Frame, DedupError>> + '_ {
        (0..self.paths.len()).map(move |i| self.load(i))
    }

    /// Decode every frame on the rayon pool. Order is preserved.
    pub fn load_all(&self) -> Result<Vec<Frame>, DedupError> {
        (0..self.paths.len())
            .into_par_iter()
            .map(|i| self.load(i))
            .collect()
    }
}

fn sort_key(path: &Path) -> (bool, u64, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let number = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(trailing_number);
    (number.is_none(), number.unwrap_or(0), name)
}

fn trailing_number(stem: &str) -> Option<u64> {
    let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    stem[stem.len() - digits..].parse().ok()
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read frames folder {0}: {1}")]
    ReadDir(String, std::io::Error),
}
