//! JSON report for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2026-01-01T12:00:00Z",
//!   "algorithm": "perceptual",
//!   "hash_size": 8,
//!   "policy": "resolution",
//!   "max_distance": null,
//!   "groups": [
//!     {
//!       "hash": "c3a1...",
//!       "retained": "photos/a.png",
//!       "discarded": ["photos/a_copy.jpg"]
//!     }
//!   ],
//!   "deletion_set": ["photos/a_copy.jpg"],
//!   "summary": {
//!     "images_found": 5,
//!     "images_hashed": 5,
//!     "skipped": [],
//!     "distinct_hashes": 3,
//!     "duplicate_groups": 1,
//!     "grouped_images": 2,
//!     "marked_for_deletion": 1,
//!     "reclaimable_bytes": 51200,
//!     "duration": 0.42
//!   }
//! }
//! ```

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::RunSettings;
use crate::duplicates::{DeletionSet, SieveReport, SieveSummary};
use crate::hashing::{HashAlgorithm, HashValue};

/// One resolved group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup {
    /// Shared fingerprint, hex
    pub hash: HashValue,
    /// Surviving file
    pub retained: PathBuf,
    /// Files to remove
    pub discarded: Vec<PathBuf>,
}

/// Complete JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
    /// Hash family
    pub algorithm: HashAlgorithm,
    /// Hash grid side
    pub hash_size: u32,
    /// Retention policy name
    pub policy: &'static str,
    /// Near-match threshold, if enabled
    pub max_distance: Option<u32>,
    /// Groups with their resolution
    pub groups: Vec<JsonGroup>,
    /// Every path marked for deletion
    pub deletion_set: DeletionSet,
    /// Counters
    pub summary: SieveSummary,
}

impl JsonReport {
    /// Build the report for a finished run.
    #[must_use]
    pub fn new(report: &SieveReport, settings: &RunSettings) -> Self {
        let groups = report
            .groups
            .iter()
            .zip(&report.resolutions)
            .map(|(group, resolution)| JsonGroup {
                hash: group.hash().clone(),
                retained: resolution.retained.clone(),
                discarded: resolution.discarded.clone(),
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            algorithm: settings.fingerprinter.algorithm(),
            hash_size: settings.fingerprinter.size(),
            policy: settings.policy.name(),
            max_distance: settings.max_distance,
            groups,
            deletion_set: report.deletion_set.clone(),
            summary: report.summary.clone(),
        }
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error while writing JSON: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::{DuplicateGroup, PolicyKind, Resolution};
    use crate::hashing::Fingerprinter;

    #[test]
    fn test_json_report_shape() {
        let group = DuplicateGroup::new(
            HashValue::from_bits([true; 8]),
            vec![PathBuf::from("a.png"), PathBuf::from("b.png")],
        )
        .unwrap();
        let mut deletion_set = DeletionSet::new();
        deletion_set.insert(PathBuf::from("b.png"));
        let report = SieveReport {
            groups: vec![group],
            resolutions: vec![Resolution {
                retained: PathBuf::from("a.png"),
                discarded: vec![PathBuf::from("b.png")],
            }],
            deletion_set,
            summary: SieveSummary::default(),
        };
        let settings = RunSettings::new(
            Fingerprinter::new(HashAlgorithm::DifferenceHorizontal, 8).unwrap(),
            PolicyKind::Newest,
        );

        let json = JsonReport::new(&report, &settings).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["algorithm"], "difference-horizontal");
        assert_eq!(value["hash_size"], 8);
        assert_eq!(value["policy"], "newest");
        assert!(value["max_distance"].is_null());
        assert_eq!(value["groups"][0]["hash"], "ff");
        assert_eq!(value["groups"][0]["retained"], "a.png");
        assert_eq!(value["groups"][0]["discarded"][0], "b.png");
        assert_eq!(value["deletion_set"][0], "b.png");
        assert!(value["generated_at"].is_string());
        assert!(value["summary"]["duration"].is_number());
    }

    #[test]
    fn test_write_to_appends_newline() {
        let settings = RunSettings::new(
            Fingerprinter::new(HashAlgorithm::Average, 4).unwrap(),
            PolicyKind::First,
        );
        let report = JsonReport::new(&SieveReport::default(), &settings);
        let mut out = Vec::new();
        report.write_to(&mut out, true).unwrap();
        assert!(out.ends_with(b"}\n"));
    }
}
