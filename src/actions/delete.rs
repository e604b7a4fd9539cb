//! Removing discarded images.
//!
//! # Overview
//!
//! Files go to the system trash by default; permanent removal needs
//! [`DeleteMode::Permanent`]. A plan is validated against its resolutions
//! first so that no group ever loses its survivor. Failures are recorded per
//! file and the batch carries on.
//!
//! # Example
//!
//! ```no_run
//! use imgsieve::actions::delete::{delete_file, DeleteMode};
//! use std::path::Path;
//!
//! match delete_file(Path::new("photos/copy.jpg"), DeleteMode::Trash) {
//!     Ok(result) => println!("Deleted: {}", result.path.display()),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::duplicates::{DeletionSet, Resolution};
use crate::progress::{phase, ProgressCallback};

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// File being deleted
        path: PathBuf,
        /// Backend message
        message: String,
    },

    /// Permanent removal failed.
    #[error("permanent delete failed for {path}: {source}")]
    RemoveFailed {
        /// File being deleted
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A group's survivor is in the deletion set.
    #[error("refusing to delete {0}: it is the retained copy of its group")]
    SurvivorMarked(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// File being inspected
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Path the error is about.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::SurvivorMarked(p)
            | Self::TrashFailed { path: p, .. }
            | Self::RemoveFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// How files are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Move to the system trash.
    #[default]
    Trash,
    /// Remove from disk.
    Permanent,
}

impl DeleteMode {
    /// Mode matching a `permanent` flag.
    #[must_use]
    pub fn from_permanent(permanent: bool) -> Self {
        if permanent {
            Self::Permanent
        } else {
            Self::Trash
        }
    }
}

/// A file that was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size of the file in bytes.
    pub size: u64,
    /// Whether it bypassed the trash.
    pub permanent: bool,
}

/// Outcome of a batch deletion.
#[derive(Debug, Default)]
pub struct BatchDeleteResult {
    /// Removed files.
    pub successes: Vec<DeleteResult>,
    /// Files that could not be removed.
    pub failures: Vec<DeleteError>,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

impl BatchDeleteResult {
    /// Number of removed files.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Whether every file was removed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let freed = bytesize::ByteSize::b(self.bytes_freed);
        if self.all_succeeded() {
            format!("Deleted {} file(s), freed {}", self.success_count(), freed)
        } else {
            format!(
                "Deleted {} file(s), {} failed, freed {}",
                self.success_count(),
                self.failure_count(),
                freed
            )
        }
    }
}

fn file_size(path: &Path) -> Result<u64, DeleteError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DeleteError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => DeleteError::PermissionDenied(path.to_path_buf()),
            _ => DeleteError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })
}

/// Remove one file.
///
/// # Errors
///
/// `NotFound` or `PermissionDenied` if the file cannot be inspected, else
/// `TrashFailed` / `RemoveFailed` from the removal itself.
pub fn delete_file(path: &Path, mode: DeleteMode) -> Result<DeleteResult, DeleteError> {
    let size = file_size(path)?;

    match mode {
        DeleteMode::Trash => {
            trash::delete(path).map_err(|e| DeleteError::TrashFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
        }
        DeleteMode::Permanent => {
            fs::remove_file(path).map_err(|source| DeleteError::RemoveFailed {
                path: path.to_path_buf(),
                source,
            })?;
            log::info!("Permanently deleted: {} ({} bytes)", path.display(), size);
        }
    }

    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
        permanent: mode == DeleteMode::Permanent,
    })
}

/// Check that no retained file is marked for deletion.
///
/// # Errors
///
/// [`DeleteError::SurvivorMarked`] naming the first offending survivor.
pub fn validate_plan(resolutions: &[Resolution], set: &DeletionSet) -> Result<(), DeleteError> {
    match resolutions.iter().find(|r| set.contains(&r.retained)) {
        Some(r) => Err(DeleteError::SurvivorMarked(r.retained.clone())),
        None => Ok(()),
    }
}

/// Validate the plan, then remove every path in `set`.
///
/// # Errors
///
/// Only plan validation fails the call; per-file failures are collected in
/// the returned [`BatchDeleteResult`].
pub fn execute(
    resolutions: &[Resolution],
    set: &DeletionSet,
    mode: DeleteMode,
    progress: Option<&dyn ProgressCallback>,
) -> Result<BatchDeleteResult, DeleteError> {
    validate_plan(resolutions, set)?;

    if let Some(cb) = progress {
        cb.on_phase_start(phase::DELETE, set.len());
    }

    let mut result = BatchDeleteResult::default();
    for (i, path) in set.iter().enumerate() {
        match delete_file(path, mode) {
            Ok(done) => {
                result.bytes_freed += done.size;
                result.successes.push(done);
            }
            Err(e) => {
                log::warn!("{}", e);
                result.failures.push(e);
            }
        }
        if let Some(cb) = progress {
            cb.on_progress(i + 1, &path.to_string_lossy());
        }
    }

    if let Some(cb) = progress {
        cb.on_phase_end(phase::DELETE);
    }

    log::info!("{}", result.summary());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolution(retained: &Path, discarded: &[&Path]) -> Resolution {
        Resolution {
            retained: retained.to_path_buf(),
            discarded: discarded.iter().map(|p| p.to_path_buf()).collect(),
        }
    }

    #[test]
    fn test_permanent_delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dup.png");
        fs::write(&path, b"12345").unwrap();

        let result = delete_file(&path, DeleteMode::Permanent).unwrap();
        assert_eq!(result.size, 5);
        assert!(result.permanent);
        assert!(!path.exists());
    }

    #[test]
    fn test_delete_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.png");
        match delete_file(&path, DeleteMode::Permanent) {
            Err(DeleteError::NotFound(p)) => assert_eq!(p, path),
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_validate_plan_rejects_marked_survivor() {
        let keep = Path::new("keep.png");
        let drop = Path::new("drop.png");
        let resolutions = vec![resolution(keep, &[drop])];

        let mut set = DeletionSet::new();
        set.insert(drop.to_path_buf());
        assert!(validate_plan(&resolutions, &set).is_ok());

        set.insert(keep.to_path_buf());
        match validate_plan(&resolutions, &set) {
            Err(DeleteError::SurvivorMarked(p)) => assert_eq!(p, keep),
            other => panic!("Expected SurvivorMarked, got: {:?}", other),
        }
    }

    #[test]
    fn test_execute_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let keep = dir.path().join("keep.png");
        let a = dir.path().join("a.png");
        let missing = dir.path().join("missing.png");
        let b = dir.path().join("b.png");
        for p in [&keep, &a, &b] {
            fs::write(p, b"xx").unwrap();
        }

        let resolutions = vec![resolution(&keep, &[&a, &missing, &b])];
        let mut set = DeletionSet::new();
        for p in [&a, &missing, &b] {
            set.insert(p.clone());
        }

        let result = execute(&resolutions, &set, DeleteMode::Permanent, None).unwrap();
        assert_eq!(result.success_count(), 2);
        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.failures[0].path(), missing.as_path());
        assert_eq!(result.bytes_freed, 4);
        assert!(keep.exists());
        assert!(!a.exists() && !b.exists());
        assert!(result.summary().contains("1 failed"));
    }

    #[test]
    fn test_delete_mode_from_flag() {
        assert_eq!(DeleteMode::from_permanent(true), DeleteMode::Permanent);
        assert_eq!(DeleteMode::from_permanent(false), DeleteMode::Trash);
        assert_eq!(DeleteMode::default(), DeleteMode::Trash);
    }
}
