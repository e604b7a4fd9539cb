//! Difference hash (dHash): encodes gradient direction, not brightness.

use image::DynamicImage;

use super::grid::luma_grid;
use super::HashValue;

/// Resize to `(N+1) × N`; bit set iff the pixel to the right is brighter.
pub fn horizontal_hash(image: &DynamicImage, size: u32) -> HashValue {
    let grid = luma_grid(image, size + 1, size);
    let n = size as usize;
    HashValue::from_bits(
        (0..grid.height)
            .flat_map(|y| (0..n).map(move |x| (x, y)))
            .map(|(x, y)| grid.get(x + 1, y) > grid.get(x, y)),
    )
}

/// Resize to `N × (N+1)`; bit set iff the pixel below is brighter.
pub fn vertical_hash(image: &DynamicImage, size: u32) -> HashValue {
    let grid = luma_grid(image, size, size + 1);
    let n = size as usize;
    HashValue::from_bits(
        (0..n)
            .flat_map(|y| (0..grid.width).map(move |x| (x, y)))
            .map(|(x, y)| grid.get(x, y + 1) > grid.get(x, y)),
    )
}
