//! Wavelet hash (wHash).
//!
//! The image is resized to a square of side `N · 2^k`, with `k` the largest
//! number of halvings that still fits inside the image's shorter side. `k`
//! levels of 2-D decomposition then leave an `N × N` approximation band,
//! which is thresholded against its median. Boundaries wrap periodically so
//! every level halves the band exactly.

use image::DynamicImage;

use super::grid::{luma_grid, median};
use super::HashValue;

/// Low-pass filter of the Haar wavelet.
const HAAR: [f64; 2] = [
    std::f64::consts::FRAC_1_SQRT_2,
    std::f64::consts::FRAC_1_SQRT_2,
];

/// Low-pass filter of the Daubechies wavelet with four vanishing moments.
const DB4: [f64; 8] = [
    0.230_377_813_308_855_23,
    0.714_846_570_552_541_5,
    0.630_880_767_929_590_4,
    -0.027_983_769_416_983_85,
    -0.187_034_811_718_881_14,
    0.030_841_381_835_986_965,
    0.032_883_011_666_982_945,
    -0.010_597_401_784_997_278,
];

/// Wavelet family used for the decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wavelet {
    /// Two-tap Haar.
    Haar,
    /// Eight-tap Daubechies (db4).
    Daubechies4,
}

impl Wavelet {
    fn low_pass(self) -> &'static [f64] {
        match self {
            Self::Haar => &HAAR,
            Self::Daubechies4 => &DB4,
        }
    }
}

/// wHash with the Haar wavelet.
pub fn haar_hash(image: &DynamicImage, size: u32) -> HashValue {
    wavelet_hash(image, size, Wavelet::Haar)
}

/// wHash with the db4 wavelet.
pub fn db4_hash(image: &DynamicImage, size: u32) -> HashValue {
    wavelet_hash(image, size, Wavelet::Daubechies4)
}

/// Decompose and threshold the approximation band.
pub fn wavelet_hash(image: &DynamicImage, size: u32, wavelet: Wavelet) -> HashValue {
    let shortest = image.width().min(image.height());
    let levels = decomposition_levels(shortest, size);
    let side = size << levels;

    let grid = luma_grid(image, side, side);
    let mut band = grid.values;
    let mut n = grid.width;
    for _ in 0..levels {
        band = approximate(&band, n, wavelet.low_pass());
        n /= 2;
    }
    debug_assert_eq!(n, size as usize);

    let threshold = median(&band);
    HashValue::from_bits(band.iter().map(|&c| c > threshold))
}

/// Largest `k` with `size · 2^k <= shortest`, or zero when the image is
/// smaller than the hash grid.
pub fn decomposition_levels(shortest: u32, size: u32) -> u32 {
    let mut levels = 0;
    while u64::from(size) << (levels + 1) <= u64::from(shortest) {
        levels += 1;
    }
    levels
}

/// One level of separable low-pass filtering and downsampling of an `n × n`
/// band, returning the `n/2 × n/2` approximation.
fn approximate(band: &[f64], n: usize, filter: &[f64]) -> Vec<f64> {
    let half = n / 2;
    let tap = |sample: &dyn Fn(usize) -> f64, i: usize| -> f64 {
        filter
            .iter()
            .enumerate()
            .map(|(k, h)| h * sample((2 * i + k) % n))
            .sum()
    };

    let mut rows = vec![0.0; n * half];
    for y in 0..n {
        for i in 0..half {
            rows[y * half + i] = tap(&|x| band[y * n + x], i);
        }
    }

    let mut out = vec![0.0; half * half];
    for x in 0..half {
        for j in 0..half {
            out[j * half + x] = tap(&|y| rows[y * half + x], j);
        }
    }
    out
}
