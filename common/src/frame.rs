use image::RgbImage;
use std::path::{Path, PathBuf};

/// A candidate slide frame decoded from the frames folder.
///
/// `sequence_index` is the frame's position in extraction order and is the
/// identifier used in dedup outcomes and the slide manifest.
#[derive(Debug, Clone)]
pub struct Frame {
    pub sequence_index: usize,
    pub image: RgbImage,
    pub source_path: PathBuf,
}

impl Frame {
    pub fn new(sequence_index: usize, image: RgbImage, source_path: impl Into<PathBuf>) -> Self {
        Self {
            sequence_index,
            image,
            source_path: source_path.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }
}

/// Axis-aligned face rectangle in pixel coordinates, as reported by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}
