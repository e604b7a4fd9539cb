//! Rendering a finished run.
//!
//! - [`text`]: the human report, followed by the deletion list
//! - [`json`]: a machine-readable report for scripting
//!
//! # Example
//!
//! ```no_run
//! use imgsieve::duplicates::{Sieve, SieveConfig};
//! use imgsieve::hashing::{Fingerprinter, HashAlgorithm};
//! use imgsieve::output::{json::JsonReport, RunSettings};
//! use std::path::Path;
//!
//! let fingerprinter = Fingerprinter::new(HashAlgorithm::Perceptual, 8).unwrap();
//! let sieve = Sieve::new(fingerprinter, SieveConfig::default());
//! let report = sieve.run_dir(Path::new("."), false).unwrap();
//!
//! let settings = RunSettings::new(fingerprinter, Default::default());
//! println!("{}", JsonReport::new(&report, &settings).to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

use crate::duplicates::PolicyKind;
use crate::hashing::Fingerprinter;

pub use json::JsonReport;
pub use text::TextReport;

/// The settings a run was made with, echoed in reports.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    /// Hash algorithm and size
    pub fingerprinter: Fingerprinter,
    /// Retention policy
    pub policy: PolicyKind,
    /// Near-match threshold, if enabled
    pub max_distance: Option<u32>,
}

impl RunSettings {
    /// Settings for exact-match grouping.
    #[must_use]
    pub fn new(fingerprinter: Fingerprinter, policy: PolicyKind) -> Self {
        Self {
            fingerprinter,
            policy,
            max_distance: None,
        }
    }

    /// Record the near-match threshold.
    #[must_use]
    pub fn with_max_distance(mut self, max_distance: Option<u32>) -> Self {
        self.max_distance = max_distance;
        self
    }
}
