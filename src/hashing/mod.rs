//! Perceptual fingerprinting of decoded images.
//!
//! # Overview
//!
//! The hash engine turns a decoded image into a fixed-size bit vector
//! ([`HashValue`]) with one of seven algorithm variants from four families:
//!
//! - [`average`]: mean-thresholded luma grid
//! - [`perceptual`]: median-thresholded low-frequency DCT block
//! - [`difference`]: horizontal or vertical brightness gradient
//! - [`wavelet`]: median-thresholded approximation band of a Haar or
//!   Daubechies-4 decomposition
//!
//! Every family first shrinks the image to a small grayscale grid, which is
//! where near-identical images collapse onto the same fingerprint.
//!
//! # Example
//!
//! ```no_run
//! use imgsieve::hashing::{Fingerprinter, HashAlgorithm};
//! use std::path::Path;
//!
//! let fingerprinter = Fingerprinter::new(HashAlgorithm::Perceptual, 8).unwrap();
//! let hash = fingerprinter.hash_path(Path::new("photo.jpg")).unwrap();
//! println!("{} ({} bits)", hash, hash.len());
//! ```

pub mod average;
pub mod difference;
mod grid;
pub mod perceptual;
pub mod wavelet;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::config::{suggest, ConfigError};

/// Smallest accepted hash size.
///
/// A 1×1 grid has no mean or median split to threshold against.
pub const MIN_HASH_SIZE: u32 = 2;

/// Largest accepted hash size (4096-bit fingerprints).
///
/// pHash resizes to `4N × 4N`; beyond this the grid outgrows most sources.
pub const MAX_HASH_SIZE: u32 = 64;

/// Default hash size (8 → 64-bit fingerprints).
pub const DEFAULT_HASH_SIZE: u32 = 8;

/// Supported fingerprinting algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    /// aHash - bit set where a pixel is brighter than the grid mean.
    Average,
    /// pHash - DCT over a 4N×4N grid, low-frequency block vs. its median.
    #[default]
    Perceptual,
    /// pHash without the oversized intermediate grid.
    PerceptualSimple,
    /// dHash - bit set where the right neighbour is brighter.
    DifferenceHorizontal,
    /// dHash - bit set where the lower neighbour is brighter.
    DifferenceVertical,
    /// wHash with the Haar wavelet.
    WaveletHaar,
    /// wHash with the 8-tap Daubechies wavelet.
    WaveletDb4,
}

impl HashAlgorithm {
    /// All variants, in declaration order.
    pub const ALL: [HashAlgorithm; 7] = [
        Self::Average,
        Self::Perceptual,
        Self::PerceptualSimple,
        Self::DifferenceHorizontal,
        Self::DifferenceVertical,
        Self::WaveletHaar,
        Self::WaveletDb4,
    ];

    /// Canonical configuration name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Perceptual => "perceptual",
            Self::PerceptualSimple => "perceptual-simple",
            Self::DifferenceHorizontal => "difference-horizontal",
            Self::DifferenceVertical => "difference-vertical",
            Self::WaveletHaar => "wavelet-haar",
            Self::WaveletDb4 => "wavelet-db4",
        }
    }

    /// Resolve a configuration name (canonical or short alias).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAlgorithm`] for anything else, with the
    /// closest known name as a suggestion when one is reasonably close.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        let normalized = name.trim().to_ascii_lowercase();
        let algorithm = match normalized.as_str() {
            "average" | "ahash" => Self::Average,
            "perceptual" | "phash" => Self::Perceptual,
            "perceptual-simple" | "phash_simple" | "phash-simple" => Self::PerceptualSimple,
            "difference-horizontal" | "dhash" | "dhash_horizontal" | "dhash-horizontal" => {
                Self::DifferenceHorizontal
            }
            "difference-vertical" | "dhash_vertical" | "dhash-vertical" => {
                Self::DifferenceVertical
            }
            "wavelet-haar" | "whash" | "whash-haar" => Self::WaveletHaar,
            "wavelet-db4" | "whash-db4" => Self::WaveletDb4,
            _ => {
                let names: Vec<&'static str> = Self::ALL.iter().map(|a| a.name()).collect();
                return Err(ConfigError::UnknownAlgorithm {
                    name: name.to_string(),
                    suggestion: suggest(&normalized, &names),
                });
            }
        };
        Ok(algorithm)
    }

    /// Number of bits produced for the given hash size.
    #[must_use]
    pub fn bit_len(self, size: u32) -> usize {
        (size as usize) * (size as usize)
    }

    fn compute_fn(self) -> ComputeFn {
        match self {
            Self::Average => average::average_hash,
            Self::Perceptual => perceptual::perceptual_hash,
            Self::PerceptualSimple => perceptual::perceptual_simple_hash,
            Self::DifferenceHorizontal => difference::horizontal_hash,
            Self::DifferenceVertical => difference::vertical_hash,
            Self::WaveletHaar => wavelet::haar_hash,
            Self::WaveletDb4 => wavelet::db4_hash,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An immutable fingerprint.
///
/// Bits are packed MSB-first in row-major grid order. Equality is bitwise
/// equality of both the bits and the bit length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashValue {
    len: usize,
    bytes: Box<[u8]>,
}

impl HashValue {
    /// Pack a sequence of bits into a hash value.
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        let mut bytes = Vec::new();
        let mut len = 0;
        for bit in bits {
            if len % 8 == 0 {
                bytes.push(0u8);
            }
            if bit {
                if let Some(last) = bytes.last_mut() {
                    *last |= 0x80 >> (len % 8);
                }
            }
            len += 1;
        }
        Self {
            len,
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Number of bits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the hash carries no bits at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Packed bytes; trailing padding bits are always zero.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Value of bit `index`, or `None` past the end.
    #[must_use]
    pub fn bit(&self, index: usize) -> Option<bool> {
        (index < self.len).then(|| self.bytes[index / 8] & (0x80 >> (index % 8)) != 0)
    }

    /// Iterate over all bits in order.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.bytes[i / 8] & (0x80 >> (i % 8)) != 0)
    }

    /// Number of differing bits.
    ///
    /// Bits past the end of the shorter value compare against zero.
    #[must_use]
    pub fn hamming_distance(&self, other: &HashValue) -> u32 {
        let shared: u32 = self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        let (longer, shorter) = if self.bytes.len() >= other.bytes.len() {
            (self, other)
        } else {
            (other, self)
        };
        let tail: u32 = longer.bytes[shorter.bytes.len()..]
            .iter()
            .map(|b| b.count_ones())
            .sum();
        shared + tail
    }

    /// Lowercase hexadecimal rendering of the packed bytes.
    #[must_use]
    pub fn to_hex(&self) -> String {
        use std::fmt::Write;
        self.bytes.iter().fold(
            String::with_capacity(self.bytes.len() * 2),
            |mut out, byte| {
                let _ = write!(out, "{byte:02x}");
                out
            },
        )
    }

    /// Parse the output of [`HashValue::to_hex`] back into a `len`-bit value.
    ///
    /// Returns `None` on malformed hex, a digit count that does not match
    /// `len`, or set padding bits.
    #[must_use]
    pub fn from_hex(hex: &str, len: usize) -> Option<Self> {
        if hex.len() != len.div_ceil(8) * 2 || !hex.is_ascii() {
            return None;
        }
        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
            .collect::<Option<Vec<u8>>>()?;
        let padding = (8 - len % 8) % 8;
        if let Some(last) = bytes.last() {
            if padding > 0 && last & ((1u8 << padding) - 1) != 0 {
                return None;
            }
        }
        Some(Self {
            len,
            bytes: bytes.into_boxed_slice(),
        })
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for HashValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// A candidate path could not be read or decoded as a raster image.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file could not be opened or sniffed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the candidate image
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The file content is not a supported raster image.
    #[error("failed to decode {path}: {source}")]
    Image {
        /// Path of the candidate image
        path: PathBuf,
        /// The underlying decoder error
        #[source]
        source: image::ImageError,
    },
}

impl DecodeError {
    /// The path that failed.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Image { path, .. } => path,
        }
    }
}

/// A decoded image, alive only for the duration of one hash computation.
#[derive(Debug)]
pub struct ImageRecord {
    path: PathBuf,
    image: DynamicImage,
}

impl ImageRecord {
    /// Decode the image at `path`, sniffing the format from its content.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] naming `path` if the file cannot be read or
    /// decoded.
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        let io_err = |source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        };
        let image = ImageReader::open(path)
            .map_err(io_err)?
            .with_guessed_format()
            .map_err(io_err)?
            .decode()
            .map_err(|source| DecodeError::Image {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_image(path.to_path_buf(), image))
    }

    /// Wrap an already decoded image.
    #[must_use]
    pub fn from_image(path: PathBuf, image: DynamicImage) -> Self {
        Self { path, image }
    }

    /// Source path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decoded pixels.
    #[must_use]
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Pixel count (width × height).
    #[must_use]
    pub fn resolution(&self) -> u64 {
        u64::from(self.image.width()) * u64::from(self.image.height())
    }
}

type ComputeFn = fn(&DynamicImage, u32) -> HashValue;

/// An algorithm and hash size resolved once into a single hashing capability.
#[derive(Clone, Copy)]
pub struct Fingerprinter {
    algorithm: HashAlgorithm,
    size: u32,
    compute: ComputeFn,
}

impl fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fingerprinter")
            .field("algorithm", &self.algorithm)
            .field("size", &self.size)
            .finish()
    }
}

impl Fingerprinter {
    /// Resolve `algorithm` at `size`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHashSize`] if `size` is outside
    /// [`MIN_HASH_SIZE`]`..=`[`MAX_HASH_SIZE`].
    pub fn new(algorithm: HashAlgorithm, size: u32) -> Result<Self, ConfigError> {
        if !(MIN_HASH_SIZE..=MAX_HASH_SIZE).contains(&size) {
            return Err(ConfigError::InvalidHashSize(size));
        }
        Ok(Self {
            algorithm,
            size,
            compute: algorithm.compute_fn(),
        })
    }

    /// The configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The configured hash size.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Fingerprint an already decoded record.
    #[must_use]
    pub fn hash(&self, record: &ImageRecord) -> HashValue {
        (self.compute)(record.image(), self.size)
    }

    /// Decode `path`, fingerprint it, and release the pixel buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the image cannot be decoded.
    pub fn hash_path(&self, path: &Path) -> Result<HashValue, DecodeError> {
        let record = ImageRecord::open(path)?;
        let hash = self.hash(&record);
        log::trace!("{} {} -> {}", self.algorithm, path.display(), hash);
        Ok(hash)
    }
}

/// Fingerprint `image` with `algorithm` at `size`.
///
/// `size` must lie in [`MIN_HASH_SIZE`]`..=`[`MAX_HASH_SIZE`]; use
/// [`Fingerprinter::new`] to validate it up front.
#[must_use]
pub fn hash(image: &DynamicImage, algorithm: HashAlgorithm, size: u32) -> HashValue {
    debug_assert!(
        (MIN_HASH_SIZE..=MAX_HASH_SIZE).contains(&size),
        "hash size {size} out of range"
    );
    (algorithm.compute_fn())(image, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    fn ramp(width: u32, height: u32) -> DynamicImage {
        let img = GrayImage::from_fn(width, height, |x, _| Luma([(x * 255 / (width - 1)) as u8]));
        DynamicImage::ImageLuma8(img)
    }

    fn checkerboard(side: u32, cell: u32) -> DynamicImage {
        let img = RgbImage::from_fn(side, side, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_hash_value_packing() {
        let hash = HashValue::from_bits([true, false, true, false, false, false, false, false, true]);
        assert_eq!(hash.len(), 9);
        assert_eq!(hash.as_bytes(), &[0b1010_0000, 0b1000_0000]);
        assert_eq!(hash.to_hex(), "a080");
        assert_eq!(hash.bit(0), Some(true));
        assert_eq!(hash.bit(1), Some(false));
        assert_eq!(hash.bit(8), Some(true));
        assert_eq!(hash.bit(9), None);
        assert_eq!(hash.bits().filter(|b| *b).count(), 3);
    }

    #[test]
    fn test_hash_value_equality_includes_length() {
        let a = HashValue::from_bits([true, false]);
        let b = HashValue::from_bits([true, false, false]);
        assert_ne!(a, b);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_hamming_distance() {
        let a = HashValue::from_bits([true; 16]);
        let b = HashValue::from_bits([true; 16]);
        assert_eq!(a.hamming_distance(&b), 0);

        let c = HashValue::from_bits((0..16).map(|i| i != 3));
        assert_eq!(a.hamming_distance(&c), 1);
        assert_eq!(c.hamming_distance(&a), 1);
    }

    #[test]
    fn test_from_hex() {
        let hash = HashValue::from_bits((0..12).map(|i| i % 3 == 0));
        assert_eq!(HashValue::from_hex(&hash.to_hex(), 12), Some(hash));
        assert_eq!(HashValue::from_hex("zz", 8), None);
        assert_eq!(HashValue::from_hex("ff", 12), None);
        // Padding bits of a 4-bit value must be clear
        assert_eq!(HashValue::from_hex("f1", 4), None);
    }

    #[test]
    fn test_empty_hash_value() {
        let hash = HashValue::from_bits(std::iter::empty());
        assert!(hash.is_empty());
        assert_eq!(hash.to_hex(), "");
    }

    #[test]
    fn test_algorithm_from_name_canonical_and_aliases() {
        for algorithm in HashAlgorithm::ALL {
            assert_eq!(HashAlgorithm::from_name(algorithm.name()).unwrap(), algorithm);
        }
        assert_eq!(HashAlgorithm::from_name("ahash").unwrap(), HashAlgorithm::Average);
        assert_eq!(HashAlgorithm::from_name("phash").unwrap(), HashAlgorithm::Perceptual);
        assert_eq!(
            HashAlgorithm::from_name("phash_simple").unwrap(),
            HashAlgorithm::PerceptualSimple
        );
        assert_eq!(
            HashAlgorithm::from_name("dhash").unwrap(),
            HashAlgorithm::DifferenceHorizontal
        );
        assert_eq!(
            HashAlgorithm::from_name("dhash_vertical").unwrap(),
            HashAlgorithm::DifferenceVertical
        );
        assert_eq!(HashAlgorithm::from_name("whash").unwrap(), HashAlgorithm::WaveletHaar);
        assert_eq!(HashAlgorithm::from_name("whash-db4").unwrap(), HashAlgorithm::WaveletDb4);
        assert_eq!(HashAlgorithm::from_name(" PHASH ").unwrap(), HashAlgorithm::Perceptual);
    }

    #[test]
    fn test_algorithm_from_name_unknown() {
        let err = HashAlgorithm::from_name("md5").unwrap_err();
        assert!(err.to_string().contains("md5"));

        match HashAlgorithm::from_name("perceptul").unwrap_err() {
            ConfigError::UnknownAlgorithm { suggestion, .. } => {
                assert_eq!(suggestion, Some("perceptual"));
            }
            other => panic!("Expected UnknownAlgorithm, got: {:?}", other),
        }
    }

    #[test]
    fn test_fingerprinter_rejects_tiny_size() {
        assert!(matches!(
            Fingerprinter::new(HashAlgorithm::Average, 1),
            Err(ConfigError::InvalidHashSize(1))
        ));
        assert!(Fingerprinter::new(HashAlgorithm::Average, 2).is_ok());
    }

    #[test]
    fn test_fingerprinter_rejects_oversized_size() {
        for size in [MAX_HASH_SIZE + 1, 1 << 16, u32::MAX] {
            assert!(matches!(
                Fingerprinter::new(HashAlgorithm::Perceptual, size),
                Err(ConfigError::InvalidHashSize(s)) if s == size
            ));
        }
    }

    #[test]
    fn test_largest_size_hashes() {
        let img = checkerboard(64, 8);
        let fingerprinter = Fingerprinter::new(HashAlgorithm::Average, MAX_HASH_SIZE).unwrap();
        let value = fingerprinter.hash(&ImageRecord::from_image(PathBuf::from("x.png"), img));
        assert_eq!(value.len(), HashAlgorithm::Average.bit_len(MAX_HASH_SIZE));
    }

    #[test]
    fn test_every_algorithm_is_deterministic_with_square_bit_length() {
        let img = checkerboard(96, 12);
        for algorithm in HashAlgorithm::ALL {
            for size in [4, 6, 8] {
                let first = hash(&img, algorithm, size);
                let second = hash(&img, algorithm, size);
                assert_eq!(first, second, "{algorithm} at {size} not deterministic");
                assert_eq!(first.len(), algorithm.bit_len(size), "{algorithm} at {size}");
            }
        }
    }

    #[test]
    fn test_identical_pixels_in_different_color_models_hash_equal() {
        let gray = ramp(64, 32);
        let rgb = DynamicImage::ImageRgb8(gray.to_rgb8());
        for algorithm in HashAlgorithm::ALL {
            assert_eq!(hash(&gray, algorithm, 8), hash(&rgb, algorithm, 8), "{algorithm}");
        }
    }

    #[test]
    fn test_fingerprinter_matches_free_function() {
        let img = checkerboard(64, 8);
        let record = ImageRecord::from_image(PathBuf::from("board.png"), img.clone());
        let fingerprinter = Fingerprinter::new(HashAlgorithm::WaveletHaar, 8).unwrap();
        assert_eq!(fingerprinter.hash(&record), hash(&img, HashAlgorithm::WaveletHaar, 8));
        assert_eq!(record.resolution(), 64 * 64);
    }

    #[test]
    fn test_open_missing_file_names_path() {
        let err = ImageRecord::open(Path::new("/definitely/missing/e.gif")).unwrap_err();
        assert_eq!(err.path(), Path::new("/definitely/missing/e.gif"));
        assert!(err.to_string().contains("e.gif"));
    }
}
