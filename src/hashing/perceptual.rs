//! Perceptual hash (pHash) over a 2-D discrete cosine transform.
//!
//! The full variant shrinks the image to a `4N × 4N` grid before the
//! transform and keeps the top-left `N × N` block of coefficients. The
//! simple variant transforms an `N × N` grid directly.
//!
//! The threshold is the median of the block's AC coefficients: the DC term
//! tracks overall brightness and would otherwise skew the split.

use std::f64::consts::PI;

use image::DynamicImage;

use super::grid::{luma_grid, median, Grid};
use super::HashValue;

/// Oversampling factor of the intermediate grid.
pub const HIGHFREQ_FACTOR: u32 = 4;

/// pHash with the `4N × 4N` intermediate grid.
pub fn perceptual_hash(image: &DynamicImage, size: u32) -> HashValue {
    let side = size * HIGHFREQ_FACTOR;
    low_frequency_hash(&luma_grid(image, side, side), size as usize)
}

/// pHash transforming the `N × N` grid directly.
pub fn perceptual_simple_hash(image: &DynamicImage, size: u32) -> HashValue {
    low_frequency_hash(&luma_grid(image, size, size), size as usize)
}

fn low_frequency_hash(grid: &Grid, size: usize) -> HashValue {
    let n = grid.width;
    let coefficients = dct_2d(&grid.values, n);

    let block: Vec<f64> = (0..size)
        .flat_map(|v| coefficients[v * n..v * n + size].iter().copied())
        .collect();
    let threshold = median(&block[1..]);

    HashValue::from_bits(block.iter().map(|&c| c > threshold))
}

/// Unnormalized 2-D DCT-II of an `n × n` row-major grid.
///
/// Each pass computes `2 Σ x[k] cos(π u (2k+1) / 2n)`; no coefficient is
/// rescaled.
fn dct_2d(pixels: &[f64], n: usize) -> Vec<f64> {
    let cosines: Vec<f64> = (0..n)
        .flat_map(|u| {
            (0..n).map(move |x| ((2 * x + 1) as f64 * u as f64 * PI / (2.0 * n as f64)).cos())
        })
        .collect();

    // Rows
    let mut rows = vec![0.0; n * n];
    for y in 0..n {
        let row = &pixels[y * n..(y + 1) * n];
        for u in 0..n {
            let basis = &cosines[u * n..(u + 1) * n];
            let sum: f64 = row.iter().zip(basis).map(|(p, c)| p * c).sum();
            rows[y * n + u] = 2.0 * sum;
        }
    }

    // Columns
    let mut out = vec![0.0; n * n];
    for x in 0..n {
        for v in 0..n {
            let basis = &cosines[v * n..(v + 1) * n];
            let sum: f64 = (0..n).map(|y| rows[y * n + x] * basis[y]).sum();
            out[v * n + x] = 2.0 * sum;
        }
    }
    out
}
