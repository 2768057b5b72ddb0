use image::RgbImage;

const CHANNELS: usize = 3;
const MAX_CHANNEL_DIFF: f64 = 255.0;

/// Mean absolute pixel difference between two frames as a percentage.
///
/// Takes the absolute per-channel difference of every pixel, averages each
/// of the three channels, sums the channel means and normalizes by
/// `3 * 255`. 0.0 means pixel-identical, 100.0 means every channel of every
/// pixel is at the opposite extreme.
///
/// Both images must have the same dimensions; nothing is resized.
pub fn difference_percent(a: &RgbImage, b: &RgbImage) -> Result<f64, DimensionMismatch> {
    if a.dimensions() != b.dimensions() {
        return Err(DimensionMismatch {
            left: a.dimensions(),
            right: b.dimensions(),
        });
    }

    let pixel_count = a.width() as u64 * a.height() as u64;
    if pixel_count == 0 {
        return Ok(0.0);
    }

    let mut channel_sums = [0u64; CHANNELS];
    for (pa, pb) in a.pixels().zip(b.pixels()) {
        for (c, sum) in channel_sums.iter_mut().enumerate() {
            *sum += pa.0[c].abs_diff(pb.0[c]) as u64;
        }
    }

    let mean_sum: f64 = channel_sums
        .iter()
        .map(|&sum| sum as f64 / pixel_count as f64)
        .sum();

    Ok(100.0 * mean_sum / (CHANNELS as f64 * MAX_CHANNEL_DIFF))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("frame dimensions differ: {}x{} vs {}x{}", .left.0, .left.1, .right.0, .right.1)]
pub struct DimensionMismatch {
    pub left: (u32, u32),
    pub right: (u32, u32),
}
