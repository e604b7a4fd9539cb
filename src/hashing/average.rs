//! Average hash (aHash).

use image::DynamicImage;

use super::grid::luma_grid;
use super::HashValue;

/// Resize to `size × size` luma; bit `i` is set iff pixel `i` exceeds the mean.
pub fn average_hash(image: &DynamicImage, size: u32) -> HashValue {
    let grid = luma_grid(image, size, size);
    let mean = grid.values.iter().sum::<f64>() / grid.values.len() as f64;
    HashValue::from_bits(grid.values.iter().map(|&v| v > mean))
}
