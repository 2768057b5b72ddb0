use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Video to extract keyframes from. When unset, `frames_dir` must
    /// already contain the extracted frames.
    #[serde(default)]
    pub video: Option<PathBuf>,
    #[serde(default = "default_frames_dir")]
    pub frames_dir: PathBuf,
    #[serde(default = "default_frame_extension")]
    pub frame_extension: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    /// image2 muxer output pattern, relative to `input.frames_dir`.
    #[serde(default = "default_filename_pattern")]
    pub filename_pattern: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_face_detection")]
    pub face_detection: bool,
    /// Percentage; consecutive frames at or below this difference are merged.
    #[serde(default = "default_diff_threshold")]
    pub diff_threshold: f64,
    #[serde(default = "default_scale_step")]
    pub scale_step: f64,
    #[serde(default = "default_min_neighbors")]
    pub min_neighbors: u32,
    /// A face wider than this fraction of the frame height marks the frame
    /// as a presenter close-up.
    #[serde(default = "default_face_fraction_threshold")]
    pub face_fraction_threshold: f64,
    #[serde(default = "default_cascade_path")]
    pub cascade_path: PathBuf,
    /// Decode and face-check every frame up front on the rayon pool instead
    /// of streaming one frame at a time.
    #[serde(default = "default_parallel_analysis")]
    pub parallel_analysis: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,
    #[serde(default = "default_delete_dropped")]
    pub delete_dropped: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            video: None,
            frames_dir: default_frames_dir(),
            frame_extension: default_frame_extension(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            filename_pattern: default_filename_pattern(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            face_detection: default_face_detection(),
            diff_threshold: default_diff_threshold(),
            scale_step: default_scale_step(),
            min_neighbors: default_min_neighbors(),
            face_fraction_threshold: default_face_fraction_threshold(),
            cascade_path: default_cascade_path(),
            parallel_analysis: default_parallel_analysis(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            manifest_path: default_manifest_path(),
            delete_dropped: default_delete_dropped(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let dedup = &self.dedup;
        if !(0.0..=100.0).contains(&dedup.diff_threshold) {
            return Err(ConfigError::Invalid(format!(
                "dedup.diff_threshold must be within 0..=100, got {}",
                dedup.diff_threshold
            )));
        }
        if dedup.scale_step <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "dedup.scale_step must be greater than 1.0, got {}",
                dedup.scale_step
            )));
        }
        if dedup.face_fraction_threshold <= 0.0 || dedup.face_fraction_threshold > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "dedup.face_fraction_threshold must be within (0, 1], got {}",
                dedup.face_fraction_threshold
            )));
        }
        if self.input.frame_extension.is_empty() {
            return Err(ConfigError::Invalid(
                "input.frame_extension must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_frames_dir() -> PathBuf {
    PathBuf::from("frames")
}
fn default_frame_extension() -> String {
    "jpeg".into()
}
fn default_ffmpeg_path() -> String {
    "ffmpeg".into()
}
fn default_filename_pattern() -> String {
    "frame_%03d.jpeg".into()
}
fn default_face_detection() -> bool {
    true
}
fn default_diff_threshold() -> f64 {
    9.0
}
fn default_scale_step() -> f64 {
    1.1
}
fn default_min_neighbors() -> u32 {
    4
}
fn default_face_fraction_threshold() -> f64 {
    0.25
}
fn default_cascade_path() -> PathBuf {
    PathBuf::from("haarcascade_frontalface_default.xml")
}
fn default_parallel_analysis() -> bool {
    true
}
fn default_manifest_path() -> PathBuf {
    PathBuf::from("slides.json")
}
fn default_delete_dropped() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.input.video.is_none());
        assert_eq!(config.input.frames_dir, PathBuf::from("frames"));
        assert_eq!(config.input.frame_extension, "jpeg");
        assert_eq!(config.extract.filename_pattern, "frame_%03d.jpeg");
        assert!(config.dedup.face_detection);
        assert_eq!(config.dedup.diff_threshold, 9.0);
        assert_eq!(config.dedup.scale_step, 1.1);
        assert_eq!(config.dedup.min_neighbors, 4);
        assert_eq!(config.dedup.face_fraction_threshold, 0.25);
        assert!(config.dedup.parallel_analysis);
        assert!(config.output.delete_dropped);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::parse(
            r#"
            [input]
            video = "lecture.mp4"

            [dedup]
            face_detection = false
            diff_threshold = 4.5
            "#,
        )
        .unwrap();
        assert_eq!(config.input.video, Some(PathBuf::from("lecture.mp4")));
        assert_eq!(config.input.frames_dir, PathBuf::from("frames"));
        assert!(!config.dedup.face_detection);
        assert_eq!(config.dedup.diff_threshold, 4.5);
        assert_eq!(config.dedup.min_neighbors, 4);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = Config::parse("[dedup]\ndiff_threshold = 120.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_growing_scale_step() {
        let err = Config::parse("[dedup]\nscale_step = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_face_fraction() {
        let err = Config::parse("[dedup]\nface_fraction_threshold = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = Config::parse("[dedup\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::load(Path::new("/nonexistent/slide-deck.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile(..)));
    }
}
