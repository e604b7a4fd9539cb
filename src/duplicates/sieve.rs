//! The detection pipeline: enumerate, hash, group, resolve.
//!
//! # Overview
//!
//! [`Sieve`] ties the stages together:
//!
//! 1. **Enumerate** candidate files with the [`Walker`](crate::scanner::Walker)
//! 2. **Hash** every candidate on a rayon pool, one decoded image per worker
//! 3. **Group** fingerprints in encounter order on the calling thread
//! 4. **Resolve** each group to a survivor with the configured policy
//!
//! Workers only return fingerprints. The indexed collect keeps them in input
//! order and a single consumer builds the index, so output never depends on
//! scheduling.
//!
//! # Example
//!
//! ```no_run
//! use imgsieve::duplicates::{PolicyKind, Sieve, SieveConfig};
//! use imgsieve::hashing::{Fingerprinter, HashAlgorithm};
//! use std::path::Path;
//!
//! let fingerprinter = Fingerprinter::new(HashAlgorithm::Perceptual, 8).unwrap();
//! let sieve = Sieve::new(fingerprinter, SieveConfig::default().with_policy(PolicyKind::Resolution));
//! let report = sieve.run_dir(Path::new("photos"), false).unwrap();
//! for path in report.deletion_set.iter() {
//!     println!("would delete {}", path.display());
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::groups::{group_by_hash, DuplicateGroup};
use super::selector::{select, DeletionSet, PolicyKind, Resolution, SelectError};
use super::similar::group_by_distance;
use crate::hashing::{DecodeError, Fingerprinter, HashValue};
use crate::progress::{phase, ProgressCallback};
use crate::scanner::{ScanError, Walker, WalkerConfig};

/// Pipeline failure.
#[derive(Debug, Error)]
pub enum SieveError {
    /// The run was cancelled.
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The root does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Enumeration failed.
    #[error(transparent)]
    Scan(ScanError),

    /// An image could not be decoded (strict mode only).
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A group's survivor could not be chosen (strict mode only).
    #[error(transparent)]
    Select(#[from] SelectError),

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl From<ScanError> for SieveError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::NotFound(p) => Self::PathNotFound(p),
            ScanError::NotADirectory(p) => Self::NotADirectory(p),
            other => Self::Scan(other),
        }
    }
}

/// Pipeline options.
#[derive(Clone, Default)]
pub struct SieveConfig {
    /// Worker threads; 0 uses every available core.
    pub threads: usize,
    /// Abort on the first undecodable image.
    pub strict: bool,
    /// Group by Hamming distance instead of exact equality.
    pub max_distance: Option<u32>,
    /// Survivor selection.
    pub policy: PolicyKind,
    /// Cooperative cancellation.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Progress sink.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for SieveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SieveConfig")
            .field("threads", &self.threads)
            .field("strict", &self.strict)
            .field("max_distance", &self.max_distance)
            .field("policy", &self.policy)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl SieveConfig {
    /// Set the worker count.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set strict mode.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Enable near-match grouping.
    #[must_use]
    pub fn with_max_distance(mut self, max_distance: Option<u32>) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Set the retention policy.
    #[must_use]
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    /// Set the shutdown flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// A file left out of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    /// The file
    pub path: PathBuf,
    /// Why it was skipped
    pub reason: String,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SieveSummary {
    /// Candidate files enumerated
    pub images_found: usize,
    /// Images successfully fingerprinted
    pub images_hashed: usize,
    /// Files that could not be read, decoded or resolved
    pub skipped: Vec<SkippedFile>,
    /// Distinct fingerprints among hashed images
    pub distinct_hashes: usize,
    /// Groups with 2+ members
    pub duplicate_groups: usize,
    /// Images in some group
    pub grouped_images: usize,
    /// Paths marked for deletion
    pub marked_for_deletion: usize,
    /// Total size of the marked files
    pub reclaimable_bytes: u64,
    /// Wall-clock time of the run
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl SieveSummary {
    /// Reclaimable space in human-readable form.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        bytesize::ByteSize::b(self.reclaimable_bytes).to_string()
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct SieveReport {
    /// Duplicate groups in encounter order
    pub groups: Vec<DuplicateGroup>,
    /// One resolution per resolved group, same order
    pub resolutions: Vec<Resolution>,
    /// Paths to remove
    pub deletion_set: DeletionSet,
    /// Counters
    pub summary: SieveSummary,
}

impl SieveReport {
    /// Whether any duplicate was found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }
}

/// Fingerprints of a list of paths, in the same order.
#[derive(Debug, Default)]
pub struct HashOutcome {
    /// Successfully hashed images
    pub hashed: Vec<(PathBuf, HashValue)>,
    /// Images skipped after a decode failure
    pub skipped: Vec<SkippedFile>,
}

/// Near-duplicate detection pipeline.
#[derive(Debug)]
pub struct Sieve {
    fingerprinter: Fingerprinter,
    config: SieveConfig,
}

impl Sieve {
    /// Create a pipeline.
    #[must_use]
    pub fn new(fingerprinter: Fingerprinter, config: SieveConfig) -> Self {
        Self {
            fingerprinter,
            config,
        }
    }

    /// The fingerprinting capability in use.
    #[must_use]
    pub fn fingerprinter(&self) -> &Fingerprinter {
        &self.fingerprinter
    }

    /// Enumerate `root` and run the pipeline over what is found.
    ///
    /// # Errors
    ///
    /// [`SieveError::PathNotFound`], [`SieveError::NotADirectory`], plus
    /// everything [`Sieve::run`] can return.
    pub fn run_dir(&self, root: &Path, recursive: bool) -> Result<SieveReport, SieveError> {
        let mut walker = Walker::new(root, WalkerConfig::default().with_recursive(recursive));
        if let Some(flag) = &self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        walker.validate()?;

        self.phase_start(phase::ENUMERATE, 0);
        let mut paths = Vec::new();
        let mut skipped = Vec::new();
        for item in walker.walk() {
            match item {
                Ok(path) => {
                    paths.push(path);
                    if let Some(cb) = &self.config.progress_callback {
                        if let Some(last) = paths.last() {
                            cb.on_progress(paths.len(), &last.to_string_lossy());
                        }
                    }
                }
                Err(e) if self.config.strict => return Err(e.into()),
                Err(e) => skipped.push(SkippedFile {
                    path: scan_error_path(&e),
                    reason: e.to_string(),
                }),
            }
        }
        self.phase_end(phase::ENUMERATE);

        if self.config.is_shutdown_requested() {
            return Err(SieveError::Interrupted);
        }

        let mut report = self.run(paths)?;
        skipped.append(&mut report.summary.skipped);
        report.summary.skipped = skipped;
        Ok(report)
    }

    /// Hash, group and resolve `paths`, treating their order as encounter
    /// order.
    ///
    /// # Errors
    ///
    /// [`SieveError::Interrupted`] on cancellation. In strict mode, the first
    /// decode or selection failure.
    pub fn run(&self, paths: Vec<PathBuf>) -> Result<SieveReport, SieveError> {
        let start = Instant::now();
        let images_found = paths.len();

        let outcome = self.hash_paths(&paths)?;
        let images_hashed = outcome.hashed.len();
        let mut skipped = outcome.skipped;

        let (groups, stats) = match self.config.max_distance {
            Some(k) => group_by_distance(outcome.hashed, k),
            None => group_by_hash(outcome.hashed),
        };

        let (groups, resolutions, deletion_set) = self.resolve(groups, &mut skipped)?;

        let reclaimable_bytes = deletion_set
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum();

        // Groups left untouched by a failed selection are not reported
        let summary = SieveSummary {
            images_found,
            images_hashed,
            skipped,
            distinct_hashes: stats.distinct_hashes,
            duplicate_groups: groups.len(),
            grouped_images: groups.iter().map(DuplicateGroup::len).sum(),
            marked_for_deletion: deletion_set.len(),
            reclaimable_bytes,
            duration: start.elapsed(),
        };

        log::info!(
            "Sieve complete: {} found, {} hashed, {} group(s), {} marked for deletion",
            summary.images_found,
            summary.images_hashed,
            summary.duplicate_groups,
            summary.marked_for_deletion
        );

        Ok(SieveReport {
            groups,
            resolutions,
            deletion_set,
            summary,
        })
    }

    /// Fingerprint `paths` on the worker pool.
    ///
    /// Results come back in input order. Decode failures are skipped, or in
    /// strict mode the earliest one is returned.
    ///
    /// # Errors
    ///
    /// [`SieveError::Interrupted`], [`SieveError::ThreadPool`], or
    /// [`SieveError::Decode`] in strict mode.
    pub fn hash_paths(&self, paths: &[PathBuf]) -> Result<HashOutcome, SieveError> {
        self.phase_start(phase::HASH, paths.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()?;
        log::debug!(
            "Hashing {} image(s) with {} on {} thread(s)",
            paths.len(),
            self.fingerprinter.algorithm(),
            pool.current_num_threads()
        );

        let done = AtomicUsize::new(0);
        // Index of the earliest strict-mode failure; later paths are not hashed
        let first_failure = AtomicUsize::new(usize::MAX);
        let results: Vec<Option<Result<HashValue, DecodeError>>> = pool.install(|| {
            paths
                .par_iter()
                .enumerate()
                .map(|(i, path)| {
                    if self.config.is_shutdown_requested()
                        || i > first_failure.load(Ordering::Relaxed)
                    {
                        return None;
                    }
                    let result = self.fingerprinter.hash_path(path);
                    if result.is_err() && self.config.strict {
                        first_failure.fetch_min(i, Ordering::Relaxed);
                    }
                    let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(cb) = &self.config.progress_callback {
                        cb.on_progress(current, &path.to_string_lossy());
                    }
                    Some(result)
                })
                .collect()
        });

        self.phase_end(phase::HASH);

        if self.config.is_shutdown_requested() {
            log::info!("Hashing interrupted after {} image(s)", done.into_inner());
            return Err(SieveError::Interrupted);
        }

        let mut outcome = HashOutcome::default();
        for (path, result) in paths.iter().zip(results) {
            match result {
                Some(Ok(hash)) => outcome.hashed.push((path.clone(), hash)),
                Some(Err(e)) if self.config.strict => return Err(e.into()),
                Some(Err(e)) => {
                    log::warn!("Skipping {}", e);
                    outcome.skipped.push(SkippedFile {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
                // Past a strict-mode failure
                None => {}
            }
        }
        Ok(outcome)
    }

    fn resolve(
        &self,
        groups: Vec<DuplicateGroup>,
        skipped: &mut Vec<SkippedFile>,
    ) -> Result<(Vec<DuplicateGroup>, Vec<Resolution>, DeletionSet), SieveError> {
        self.phase_start(phase::RESOLVE, groups.len());

        let mut kept = Vec::with_capacity(groups.len());
        let mut resolutions = Vec::with_capacity(groups.len());
        let mut deletion_set = DeletionSet::new();

        for (i, group) in groups.into_iter().enumerate() {
            if self.config.is_shutdown_requested() {
                return Err(SieveError::Interrupted);
            }
            let label = group.hash().to_hex();
            match select(&group, &self.config.policy) {
                Ok(resolution) => {
                    for path in &resolution.discarded {
                        deletion_set.insert(path.clone());
                    }
                    resolutions.push(resolution);
                    kept.push(group);
                }
                Err(e) if self.config.strict => return Err(e.into()),
                Err(e) => {
                    log::warn!("Leaving group {} untouched: {}", group.hash(), e);
                    skipped.push(SkippedFile {
                        path: e.path().map(Path::to_path_buf).unwrap_or_default(),
                        reason: e.to_string(),
                    });
                }
            }
            if let Some(cb) = &self.config.progress_callback {
                cb.on_progress(i + 1, &label);
            }
        }

        self.phase_end(phase::RESOLVE);
        Ok((kept, resolutions, deletion_set))
    }

    fn phase_start(&self, name: &str, total: usize) {
        if let Some(cb) = &self.config.progress_callback {
            cb.on_phase_start(name, total);
        }
    }

    fn phase_end(&self, name: &str) {
        if let Some(cb) = &self.config.progress_callback {
            cb.on_phase_end(name);
        }
    }
}

fn scan_error_path(e: &ScanError) -> PathBuf {
    match e {
        ScanError::PermissionDenied(p) | ScanError::NotFound(p) | ScanError::NotADirectory(p) => {
            p.clone()
        }
        ScanError::Io { path, .. } => path.clone(),
    }
}
