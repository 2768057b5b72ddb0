use image::{GrayImage, Luma, RgbImage};
use slide_deck_common::frame::Frame;
use tracing::debug;

use super::traits::{DetectorError, DetectorParams, FaceDetector};

/// Flags presenter close-ups.
///
/// A frame counts as face-dominated when any detected face is wider than
/// `fraction_threshold` of the frame height. Slides with a small webcam
/// inset stay below the threshold.
pub struct FaceHeuristic {
    detector: Box<dyn FaceDetector>,
    params: DetectorParams,
    fraction_threshold: f64,
}

impl FaceHeuristic {
    pub fn new(detector: Box<dyn FaceDetector>, params: DetectorParams, fraction_threshold: f64) -> Self {
        Self {
            detector,
            params,
            fraction_threshold,
        }
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    pub fn is_face_dominated(&self, frame: &Frame) -> Result<bool, DetectorError> {
        let gray = luma_bt601(&frame.image);
        let faces = self.detector.detect(&gray, &self.params)?;

        let limit = frame.height() as f64 * self.fraction_threshold;
        let widest = faces.iter().map(|f| f.width).max();
        let dominated = faces.iter().any(|f| f.width as f64 > limit);

        debug!(
            frame = frame.sequence_index,
            faces = faces.len(),
            widest,
            limit = format!("{:.1}", limit),
            dominated,
            "face check"
        );

        Ok(dominated)
    }
}

/// Rec.601 luma in 14-bit fixed point, the weighting Haar cascades are
/// trained against (0.299 R + 0.587 G + 0.114 B, rounded).
pub fn luma_bt601(image: &RgbImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let luma = (r as u32 * R + g as u32 * G + b as u32 * B + (1 << (SHIFT - 1))) >> SHIFT;
        Luma([luma as u8])
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use image::GrayImage;
    use slide_deck_common::frame::FaceBox;

    use super::*;

    /// Reports one face whose width is the luma value of the top-left pixel,
    /// so tests can dial the face size through the image content.
    pub struct MarkerDetector;

    impl FaceDetector for MarkerDetector {
        fn detect(
            &self,
            gray: &GrayImage,
            _params: &DetectorParams,
        ) -> Result<Vec<FaceBox>, DetectorError> {
            if gray.width() == 0 || gray.height() == 0 {
                return Ok(Vec::new());
            }
            let width = gray.get_pixel(0, 0).0[0] as u32;
            if width == 0 {
                return Ok(Vec::new());
            }
            Ok(vec![FaceBox::new(0, 0, width, width)])
        }

        fn name(&self) -> &str {
            "marker"
        }
    }

    /// Always errors, for failure-propagation tests.
    pub struct BrokenDetector;

    impl FaceDetector for BrokenDetector {
        fn detect(
            &self,
            _gray: &GrayImage,
            _params: &DetectorParams,
        ) -> Result<Vec<FaceBox>, DetectorError> {
            Err(DetectorError::Detect("classifier not loaded".into()))
        }
    }
}
