//! Choosing which member of a duplicate group survives.
//!
//! A [`RetentionPolicy`] names the index of the member to keep; every other
//! member is discarded. The built-in policies share one rule for ties: the
//! member seen first wins.
//!
//! | Policy       | Keeps the member with                         |
//! |--------------|-----------------------------------------------|
//! | `resolution` | the most pixels (width × height), the default |
//! | `newest`     | the latest modification time                  |
//! | `largest`    | the largest file size                         |
//! | `first`      | the earliest encounter                        |

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::ImageReader;
use serde::ser::{Serialize, Serializer};
use thiserror::Error;

use super::groups::DuplicateGroup;
use crate::config::{suggest, ConfigError};
use crate::hashing::DecodeError;

/// Failure while choosing a group's survivor.
#[derive(Debug, Error)]
pub enum SelectError {
    /// A member could not be re-read for its dimensions.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A member's filesystem metadata could not be read.
    #[error("cannot read metadata of {path}: {source}")]
    Metadata {
        /// The member
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A policy chose an index outside the group.
    #[error("policy '{policy}' chose member {index} of a group of {len}")]
    InvalidChoice {
        /// Policy name
        policy: String,
        /// Returned index
        index: usize,
        /// Group size
        len: usize,
    },
}

impl SelectError {
    /// Path of the member that failed, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Decode(e) => Some(e.path()),
            Self::Metadata { path, .. } => Some(path),
            Self::InvalidChoice { .. } => None,
        }
    }
}

/// Picks the member of a duplicate group to keep.
pub trait RetentionPolicy: Send + Sync {
    /// Name shown in logs and reports.
    fn name(&self) -> &str;

    /// Index into `group.paths()` of the member to retain.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError`] when a member cannot be inspected.
    fn retain(&self, group: &DuplicateGroup) -> Result<usize, SelectError>;
}

/// Index of the member with the strictly greatest key; earlier members win
/// ties.
fn first_max<K: Ord>(
    group: &DuplicateGroup,
    mut key: impl FnMut(&Path) -> Result<K, SelectError>,
) -> Result<usize, SelectError> {
    let mut best: Option<(usize, K)> = None;
    for (i, path) in group.paths().iter().enumerate() {
        let k = key(path)?;
        if best.as_ref().map_or(true, |(_, b)| k > *b) {
            best = Some((i, k));
        }
    }
    Ok(best.map_or(0, |(i, _)| i))
}

fn metadata(path: &Path) -> Result<std::fs::Metadata, SelectError> {
    std::fs::metadata(path).map_err(|source| SelectError::Metadata {
        path: path.to_path_buf(),
        source,
    })
}

/// Pixel count of the image at `path`, read from its header.
///
/// # Errors
///
/// Returns [`DecodeError`] if the file cannot be opened or its format is not
/// recognised.
pub fn pixel_count(path: &Path) -> Result<u64, DecodeError> {
    let (width, height) = ImageReader::open(path)
        .and_then(ImageReader::with_guessed_format)
        .map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .into_dimensions()
        .map_err(|source| DecodeError::Image {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(u64::from(width) * u64::from(height))
}

/// Keep the highest-resolution member.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionPolicy;

impl RetentionPolicy for ResolutionPolicy {
    fn name(&self) -> &str {
        "resolution"
    }

    fn retain(&self, group: &DuplicateGroup) -> Result<usize, SelectError> {
        first_max(group, |path| Ok(pixel_count(path)?))
    }
}

/// Keep the most recently modified member.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewestPolicy;

impl RetentionPolicy for NewestPolicy {
    fn name(&self) -> &str {
        "newest"
    }

    fn retain(&self, group: &DuplicateGroup) -> Result<usize, SelectError> {
        first_max(group, |path| {
            Ok(metadata(path)?.modified().unwrap_or(SystemTime::UNIX_EPOCH))
        })
    }
}

/// Keep the largest file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestFilePolicy;

impl RetentionPolicy for LargestFilePolicy {
    fn name(&self) -> &str {
        "largest"
    }

    fn retain(&self, group: &DuplicateGroup) -> Result<usize, SelectError> {
        first_max(group, |path| Ok(metadata(path)?.len()))
    }
}

/// Keep the first member encountered.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstSeenPolicy;

impl RetentionPolicy for FirstSeenPolicy {
    fn name(&self) -> &str {
        "first"
    }

    fn retain(&self, _group: &DuplicateGroup) -> Result<usize, SelectError> {
        Ok(0)
    }
}

/// The built-in retention policies, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyKind {
    /// Most pixels
    #[default]
    Resolution,
    /// Latest modification time
    Newest,
    /// Largest file on disk
    Largest,
    /// First encountered
    First,
}

impl PolicyKind {
    /// Every built-in policy.
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Resolution,
        PolicyKind::Newest,
        PolicyKind::Largest,
        PolicyKind::First,
    ];

    /// Canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Resolution => "resolution",
            Self::Newest => "newest",
            Self::Largest => "largest",
            Self::First => "first",
        }
    }

    /// Parse a policy name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPolicy`] carrying the offending value.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        let wanted = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownPolicy {
                name: name.to_string(),
                suggestion: suggest(&wanted, &Self::ALL.map(PolicyKind::name)),
            })
    }

    fn policy(self) -> &'static dyn RetentionPolicy {
        match self {
            Self::Resolution => &ResolutionPolicy,
            Self::Newest => &NewestPolicy,
            Self::Largest => &LargestFilePolicy,
            Self::First => &FirstSeenPolicy,
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl RetentionPolicy for PolicyKind {
    fn name(&self) -> &str {
        PolicyKind::name(*self)
    }

    fn retain(&self, group: &DuplicateGroup) -> Result<usize, SelectError> {
        self.policy().retain(group)
    }
}

/// Outcome of applying a policy to one group.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Resolution {
    /// The surviving member
    pub retained: PathBuf,
    /// Every other member, in encounter order
    pub discarded: Vec<PathBuf>,
}

/// Split `group` into its survivor and the rest.
///
/// # Errors
///
/// Propagates the policy's [`SelectError`], or
/// [`SelectError::InvalidChoice`] for an out-of-range index.
pub fn select(
    group: &DuplicateGroup,
    policy: &dyn RetentionPolicy,
) -> Result<Resolution, SelectError> {
    let index = policy.retain(group)?;
    let paths = group.paths();
    if index >= paths.len() {
        return Err(SelectError::InvalidChoice {
            policy: policy.name().to_string(),
            index,
            len: paths.len(),
        });
    }

    let discarded = paths
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != index)
        .map(|(_, p)| p.clone())
        .collect();

    Ok(Resolution {
        retained: paths[index].clone(),
        discarded,
    })
}

/// Paths marked for removal, deduplicated, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct DeletionSet {
    paths: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl DeletionSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path`; returns false if it was already present.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if self.seen.contains(&path) {
            return false;
        }
        self.seen.insert(path.clone());
        self.paths.push(path);
        true
    }

    /// Whether `path` is marked.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(path)
    }

    /// Marked paths in insertion order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Iterate marked paths.
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    /// Number of marked paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether nothing is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Serialize for DeletionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.paths)
    }
}

/// Resolve every group with `policy` and gather all discarded paths.
///
/// # Errors
///
/// Stops at the first group whose selection fails.
pub fn resolve_groups(
    groups: &[DuplicateGroup],
    policy: &dyn RetentionPolicy,
) -> Result<(Vec<Resolution>, DeletionSet), SelectError> {
    let mut resolutions = Vec::with_capacity(groups.len());
    let mut deletion_set = DeletionSet::new();

    for group in groups {
        let resolution = select(group, policy)?;
        log::debug!(
            "Keeping {} ({} policy), discarding {}",
            resolution.retained.display(),
            policy.name(),
            resolution.discarded.len()
        );
        for path in &resolution.discarded {
            deletion_set.insert(path.clone());
        }
        resolutions.push(resolution);
    }

    Ok((resolutions, deletion_set))
}
