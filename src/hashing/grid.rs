//! Shared grayscale-grid helpers for the hash families.

use image::imageops::{self, FilterType};
use image::DynamicImage;

/// A resized luma grid as floating point values, row-major.
pub(crate) struct Grid {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f64>,
}

impl Grid {
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.values[y * self.width + x]
    }
}

/// Convert to 8-bit luma and resize to exactly `width × height`.
pub(crate) fn luma_grid(image: &DynamicImage, width: u32, height: u32) -> Grid {
    let resized = imageops::resize(&image.to_luma8(), width, height, FilterType::Lanczos3);
    Grid {
        width: width as usize,
        height: height as usize,
        values: resized.pixels().map(|p| f64::from(p.0[0])).collect(),
    }
}

/// Median with the two middle values averaged for even lengths.
pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
