//! Haar cascade face detector backed by OpenCV's `CascadeClassifier`.
//!
//! Enabled with the `opencv` feature. The frontal-face cascade shipped with
//! OpenCV (`haarcascade_frontalface_default.xml`) is the expected model.

use image::GrayImage;
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use slide_deck_common::frame::FaceBox;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use super::traits::{DetectorError, DetectorParams, FaceDetector};

/// `CascadeClassifier::detect_multi_scale` needs `&mut self`, so the
/// classifier sits behind a mutex and detections on the rayon pool serialize
/// on it.
pub struct CascadeFaceDetector {
    classifier: Mutex<CascadeClassifier>,
}

impl CascadeFaceDetector {
    pub fn load(path: &Path) -> Result<Self, DetectorError> {
        let display = path.display().to_string();
        let classifier = CascadeClassifier::new(&display)
            .map_err(|e| DetectorError::Load(display.clone(), e.to_string()))?;
        let empty = classifier
            .empty()
            .map_err(|e| DetectorError::Load(display.clone(), e.to_string()))?;
        if empty {
            return Err(DetectorError::Load(display, "cascade file is empty or unreadable".into()));
        }
        info!(model = display, "cascade face detector loaded");
        Ok(Self {
            classifier: Mutex::new(classifier),
        })
    }
}

impl FaceDetector for CascadeFaceDetector {
    fn detect(&self, gray: &GrayImage, params: &DetectorParams) -> Result<Vec<FaceBox>, DetectorError> {
        let detect_err = |e: opencv::Error| DetectorError::Detect(e.to_string());

        let mat = Mat::new_rows_cols_with_data(gray.height() as i32, gray.width() as i32, gray.as_raw())
            .map_err(detect_err)?;

        let mut faces = Vector::<Rect>::new();
        let mut classifier = self
            .classifier
            .lock()
            .map_err(|_| DetectorError::Detect("cascade classifier lock poisoned".into()))?;
        classifier
            .detect_multi_scale(
                &mat,
                &mut faces,
                params.scale_step,
                params.min_neighbors as i32,
                0,
                Size::new(0, 0),
                Size::new(0, 0),
            )
            .map_err(detect_err)?;

        Ok(faces
            .iter()
            .map(|r| {
                FaceBox::new(
                    r.x.max(0) as u32,
                    r.y.max(0) as u32,
                    r.width.max(0) as u32,
                    r.height.max(0) as u32,
                )
            })
            .collect())
    }

    fn name(&self) -> &str {
        "haar-cascade"
    }
}
