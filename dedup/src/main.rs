use slide_deck_common::config::{Config, DedupConfig};
use slide_deck_dedup::cleanup::{self, CleanupError};
use indicatif::{ProgressBar, ProgressStyle};
use slide_deck_dedup::extract::{self, ExtractError, KeyframeExtractor};
use slide_deck_dedup::interrupt::{self, Interrupted};
use slide_deck_dedup::manifest::{ManifestError, SlideManifest};
use slide_deck_dedup::source::SourceError;
use slide_deck_dedup::{
    DedupError, Deduplicator, DetectorError, DetectorParams, FaceDetector, FaceHeuristic,
    FrameSource,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("keyframe extraction failed: {0}")]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("deduplication failed: {0}")]
    Dedup(#[from] DedupError),
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error("face detection is enabled but no detector backend is compiled in; rebuild with --features opencv or set dedup.face_detection = false")]
    NoFaceDetector,
    #[error("cleanup failed: {0}")]
    Cleanup(#[from] CleanupError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("deduplication task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        video = ?config.input.video,
        frames_dir = %config.input.frames_dir.display(),
        face_detection = config.dedup.face_detection,
        diff_threshold = config.dedup.diff_threshold,
        parallel_analysis = config.dedup.parallel_analysis,
        "starting slide-deck dedup"
    );

    let result = interrupt::until_ctrl_c(run(config))
        .await
        .map_err(PipelineError::from)
        .and_then(|r| r);
    if let Err(e) = result {
        error!(error = %e, "pipeline failed");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), PipelineError> {
    if let Some(video) = &config.input.video {
        extract::check_ffmpeg_available(&config.extract.ffmpeg_path).await;
        KeyframeExtractor::new(&config.extract.ffmpeg_path, &config.extract.filename_pattern)
            .extract(video, &config.input.frames_dir)
            .await?;
    }

    let source = FrameSource::scan(&config.input.frames_dir, &config.input.frame_extension)?;
    if source.is_empty() {
        warn!(
            frames_dir = %config.input.frames_dir.display(),
            "no frames found; writing an empty manifest"
        );
    }

    let dedup_progress = progress_bar(source.len(), "Processing frames");
    let dedup = build_deduplicator(&config.dedup)?.with_progress(dedup_progress.clone());
    let parallel = config.dedup.parallel_analysis;
    let (source, outcome) = tokio::task::spawn_blocking(move || {
        let outcome = if parallel {
            let frames = source.load_all()?;
            dedup.deduplicate(&frames)?
        } else {
            dedup.deduplicate_stream(source.iter())?
        };
        Ok::<_, DedupError>((source, outcome))
    })
    .await??;
    dedup_progress.finish_and_clear();

    if config.output.delete_dropped {
        let progress = progress_bar(outcome.dropped.len(), "Removing duplicates");
        cleanup::remove_dropped(&source, &outcome, &progress).await?;
        progress.finish_and_clear();
    } else {
        info!(dropped = outcome.dropped.len(), "keeping dropped frames on disk");
    }

    let manifest = SlideManifest::build(
        &source,
        &outcome,
        config.input.video.as_deref(),
        config.dedup.diff_threshold,
        config.dedup.face_detection,
    )?;
    manifest.write(&config.output.manifest_path).await?;

    info!(
        slides = outcome.kept.len(),
        dropped = outcome.dropped.len(),
        manifest = %config.output.manifest_path.display(),
        "slide deck ready"
    );
    Ok(())
}

fn progress_bar(len: usize, message: &'static str) -> ProgressBar {
    let style = ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    ProgressBar::new(len as u64).with_style(style).with_message(message)
}

fn build_deduplicator(config: &DedupConfig) -> Result<Deduplicator, PipelineError> {
    let dedup = Deduplicator::new(config.diff_threshold);
    if !config.face_detection {
        info!("face detection disabled");
        return Ok(dedup);
    }

    let detector = load_face_detector(&config.cascade_path)?;
    let params = DetectorParams {
        scale_step: config.scale_step,
        min_neighbors: config.min_neighbors,
    };
    let heuristic = FaceHeuristic::new(detector, params, config.face_fraction_threshold);
    info!(
        detector = heuristic.detector_name(),
        scale_step = params.scale_step,
        min_neighbors = params.min_neighbors,
        fraction = config.face_fraction_threshold,
        "face detection enabled"
    );
    Ok(dedup.with_face_heuristic(heuristic))
}

#[cfg(feature = "opencv")]
fn load_face_detector(path: &Path) -> Result<Box<dyn FaceDetector>, PipelineError> {
    use slide_deck_dedup::filter::cascade::CascadeFaceDetector;
    Ok(Box::new(CascadeFaceDetector::load(path)?))
}

#[cfg(not(feature = "opencv"))]
fn load_face_detector(_path: &Path) -> Result<Box<dyn FaceDetector>, PipelineError> {
    Err(PipelineError::NoFaceDetector)
}
