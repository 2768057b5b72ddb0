use image::GrayImage;
use slide_deck_common::frame::FaceBox;

/// Tuning knobs passed through to the face detector on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    /// Image pyramid scale factor between detection passes.
    pub scale_step: f64,
    /// Overlapping candidate hits required before a rectangle is reported.
    pub min_neighbors: u32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            scale_step: 1.1,
            min_neighbors: 4,
        }
    }
}

/// Face detection capability consumed by the face heuristic.
///
/// Implementations receive a single-channel luma image and return every face
/// rectangle they find. Construct one per process and inject it; the detector
/// may be shared across the rayon pool, hence `Send + Sync`.
pub trait FaceDetector: Send + Sync {
    fn detect(
        &self,
        gray: &GrayImage,
        params: &DetectorParams,
    ) -> Result<Vec<FaceBox>, DetectorError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("failed to load face detector model {0}: {1}")]
    Load(String, String),
    #[error("face detection failed: {0}")]
    Detect(String),
}
