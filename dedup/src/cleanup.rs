use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::engine::DedupOutcome;
use crate::source::FrameSource;

#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("dropped frame {0} has no backing file in the frames folder")]
    UnknownFrame(usize),
    #[error("failed to delete {0}: {1}")]
    Remove(String, std::io::Error),
}

/// Backing files of every dropped frame, in sequence order.
pub fn dropped_paths(source: &FrameSource, outcome: &DedupOutcome) -> Result<Vec<PathBuf>, CleanupError> {
    outcome
        .dropped
        .keys()
        .map(|&index| {
            source
                .path(index)
                .map(Path::to_path_buf)
                .ok_or(CleanupError::UnknownFrame(index))
        })
        .collect()
}

/// Delete the dropped frames' files once the pass has finished.
///
/// Stops at the first failure; files already removed stay removed.
/// `progress` is sized to the number of files and advanced per deletion.
pub async fn remove_dropped(
    source: &FrameSource,
    outcome: &DedupOutcome,
    progress: &ProgressBar,
) -> Result<usize, CleanupError> {
    let paths = dropped_paths(source, outcome)?;
    progress.set_length(paths.len() as u64);
    for path in &paths {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| CleanupError::Remove(path.display().to_string(), e))?;
        progress.inc(1);
        debug!(path = %path.display(), "deleted dropped frame");
    }
    info!(
        removed = paths.len(),
        dir = %source.dir().display(),
        "removed duplicates and full screen faces"
    );
    Ok(paths.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DropReason;
    use std::collections::BTreeMap;

    fn folder_with(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), b"jpeg bytes").unwrap();
        }
        dir
    }

    fn outcome(kept: Vec<usize>, dropped: &[usize]) -> DedupOutcome {
        DedupOutcome {
            kept,
            dropped: dropped
                .iter()
                .map(|&i| (i, DropReason::NearDuplicate { diff_percent: 1.0 }))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn removes_only_dropped_frames() {
        let dir = folder_with(&["frame_001.jpeg", "frame_002.jpeg", "frame_003.jpeg"]);
        let source = FrameSource::scan(dir.path(), "jpeg").unwrap();

        let progress = ProgressBar::hidden();
        let removed = remove_dropped(&source, &outcome(vec![1], &[0, 2]), &progress)
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(progress.length(), Some(2));
        assert_eq!(progress.position(), 2);
        assert!(!dir.path().join("frame_001.jpeg").exists());
        assert!(dir.path().join("frame_002.jpeg").exists());
        assert!(!dir.path().join("frame_003.jpeg").exists());
    }

    #[tokio::test]
    async fn nothing_dropped_removes_nothing() {
        let dir = folder_with(&["frame_001.jpeg"]);
        let source = FrameSource::scan(dir.path(), "jpeg").unwrap();
        let removed = remove_dropped(&source, &outcome(vec![0], &[]), &ProgressBar::hidden())
            .await.unwrap();
        assert_eq!(removed, 0);
        assert!(dir.path().join("frame_001.jpeg").exists());
    }

    #[tokio::test]
    async fn vanished_file_fails_loudly() {
        let dir = folder_with(&["frame_001.jpeg", "frame_002.jpeg"]);
        let source = FrameSource::scan(dir.path(), "jpeg").unwrap();
        std::fs::remove_file(dir.path().join("frame_001.jpeg")).unwrap();

        let err = remove_dropped(&source, &outcome(vec![1], &[0]), &ProgressBar::hidden())
            .await
            .unwrap_err();
        assert!(matches!(err, CleanupError::Remove(..)));
    }

    #[test]
    fn unknown_index_is_rejected() {
        let dir = folder_with(&["frame_001.jpeg"]);
        let source = FrameSource::scan(dir.path(), "jpeg").unwrap();
        let err = dropped_paths(&source, &outcome(vec![0], &[5])).unwrap_err();
        assert!(matches!(err, CleanupError::UnknownFrame(5)));
    }
}
