//! Duplicate detection and resolution.
//!
//! This module provides:
//! - Exact-fingerprint grouping ([`groups`])
//! - Opt-in Hamming-distance grouping ([`similar`])
//! - Survivor selection and the deletion set ([`selector`])
//! - The end-to-end pipeline ([`sieve`])

pub mod groups;
pub mod selector;
pub mod sieve;
pub mod similar;

pub use groups::{group_by_hash, DuplicateGroup, GroupingStats, HashIndex};
pub use selector::{
    pixel_count, resolve_groups, select, DeletionSet, FirstSeenPolicy, LargestFilePolicy,
    NewestPolicy, PolicyKind, Resolution, ResolutionPolicy, RetentionPolicy, SelectError,
};
pub use sieve::{
    HashOutcome, Sieve, SieveConfig, SieveError, SieveReport, SieveSummary, SkippedFile,
};
pub use similar::{group_by_distance, HammingMetric, SimilarityIndex};
