use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Runs ffmpeg to dump every I-frame of a video as a still image.
///
/// Scene changes in lecture recordings almost always coincide with keyframes,
/// so the I-frames are the slide candidates.
#[derive(Debug, Clone)]
pub struct KeyframeExtractor {
    ffmpeg_path: String,
    filename_pattern: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("video file {0} does not exist")]
    MissingVideo(String),
    #[error("failed to create frames folder {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to spawn ffmpeg: {0}")]
    Spawn(String),
    #[error("failed to wait for ffmpeg: {0}")]
    Wait(String),
    #[error("ffmpeg exited with non-zero status: {0}")]
    FfmpegFailed(String),
    #[error("failed to inspect frames folder {0}: {1}")]
    ReadDir(String, std::io::Error),
    #[error("frames folder {0} already holds files; empty it or point input.frames_dir at a new folder")]
    FramesDirNotEmpty(String),
}

impl KeyframeExtractor {
    pub fn new(ffmpeg_path: impl Into<String>, filename_pattern: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            filename_pattern: filename_pattern.into(),
        }
    }

    /// Command line for extracting `video` into `frames_dir`.
    pub fn args(&self, video: &Path, frames_dir: &Path) -> Vec<String> {
        let output: PathBuf = frames_dir.join(&self.filename_pattern);
        vec![
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            video.display().to_string(),
            "-vsync".into(),
            "0".into(),
            "-vf".into(),
            "select='eq(pict_type,PICT_TYPE_I)'".into(),
            "-f".into(),
            "image2".into(),
            output.display().to_string(),
        ]
    }

    /// Extract keyframes into `frames_dir`, creating it if needed.
    ///
    /// The folder must be empty: ffmpeg overwrites `frame_001..` in place, so
    /// leftovers from an earlier, longer video would otherwise be scanned as
    /// part of this one. Dropping the returned future kills ffmpeg.
    pub async fn extract(&self, video: &Path, frames_dir: &Path) -> Result<(), ExtractError> {
        if !video.is_file() {
            return Err(ExtractError::MissingVideo(video.display().to_string()));
        }
        let dir = frames_dir.display().to_string();
        tokio::fs::create_dir_all(frames_dir)
            .await
            .map_err(|e| ExtractError::CreateDir(dir.clone(), e))?;
        let mut entries = tokio::fs::read_dir(frames_dir)
            .await
            .map_err(|e| ExtractError::ReadDir(dir.clone(), e))?;
        if entries
            .next_entry()
            .await
            .map_err(|e| ExtractError::ReadDir(dir.clone(), e))?
            .is_some()
        {
            return Err(ExtractError::FramesDirNotEmpty(dir));
        }

        let args = self.args(video, frames_dir);
        debug!(ffmpeg = self.ffmpeg_path, ?args, "spawning ffmpeg");

        let child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractError::Spawn(e.to_string()))?;

        info!(
            video = %video.display(),
            frames_dir = %frames_dir.display(),
            "extracting keyframes"
        );

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExtractError::Wait(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(stderr = %stderr, "ffmpeg exited with error");
            return Err(ExtractError::FfmpegFailed(stderr.into_owned()));
        }

        info!("keyframe extraction complete");
        Ok(())
    }
}

/// Check whether ffmpeg is available. Logs a warning if not found.
pub async fn check_ffmpeg_available(ffmpeg_path: &str) -> bool {
    match Command::new(ffmpeg_path).arg("-version").output().await {
        Ok(out) if out.status.success() => {
            debug!(ffmpeg = ffmpeg_path, "ffmpeg is available");
            true
        }
        Ok(_) => {
            warn!(ffmpeg = ffmpeg_path, "ffmpeg returned non-zero for -version; extraction may fail");
            false
        }
        Err(e) => {
            warn!(
                ffmpeg = ffmpeg_path,
                error = %e,
                "ffmpeg not found; keyframe extraction will fail. Install ffmpeg or set extract.ffmpeg_path."
            );
            false
        }
    }
}
