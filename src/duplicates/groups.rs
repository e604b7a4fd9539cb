//! Exact-fingerprint grouping.
//!
//! # Overview
//!
//! [`HashIndex`] maps each distinct [`HashValue`] to the paths that produced
//! it, in encounter order. Once every image is indexed, buckets with two or
//! more paths become [`DuplicateGroup`]s; singletons are dropped.
//!
//! The grouper never decodes images and does not know which algorithm
//! produced a hash.
//!
//! # Example
//!
//! ```
//! use imgsieve::duplicates::group_by_hash;
//! use imgsieve::hashing::HashValue;
//! use std::path::PathBuf;
//!
//! let h1 = HashValue::from_bits([true, false, true, true]);
//! let h2 = HashValue::from_bits([false, false, true, true]);
//!
//! let (groups, stats) = group_by_hash(vec![
//!     (PathBuf::from("a.png"), h1.clone()),
//!     (PathBuf::from("b.png"), h2),
//!     (PathBuf::from("c.png"), h1),
//! ]);
//!
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].paths(), &[PathBuf::from("a.png"), PathBuf::from("c.png")]);
//! assert_eq!(stats.distinct_hashes, 2);
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::hashing::HashValue;

/// Paths sharing one fingerprint. Always holds at least two paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    hash: HashValue,
    paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Build a group, or `None` if fewer than two paths are given.
    #[must_use]
    pub fn new(hash: HashValue, paths: Vec<PathBuf>) -> Option<Self> {
        (paths.len() >= 2).then_some(Self { hash, paths })
    }

    /// The shared fingerprint (for near-match groups, that of the
    /// first-encountered member).
    #[must_use]
    pub fn hash(&self) -> &HashValue {
        &self.hash
    }

    /// Members in encounter order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of members (always >= 2).
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always false; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of members that will not be retained.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.paths.len() - 1
    }
}

/// Statistics from a grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Number of (path, hash) pairs consumed
    pub total_images: usize,
    /// Number of distinct fingerprints seen
    pub distinct_hashes: usize,
    /// Number of groups with 2+ members
    pub duplicate_groups: usize,
    /// Number of paths that landed in some group
    pub grouped_images: usize,
}

/// Fingerprint → paths, preserving first-encounter order of both keys and
/// paths.
#[derive(Debug, Default)]
pub struct HashIndex {
    slots: HashMap<HashValue, usize>,
    buckets: Vec<(HashValue, Vec<PathBuf>)>,
    total: usize,
}

impl HashIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` to the bucket for `hash`.
    pub fn insert(&mut self, path: PathBuf, hash: HashValue) {
        self.total += 1;
        match self.slots.get(&hash) {
            Some(&slot) => self.buckets[slot].1.push(path),
            None => {
                self.slots.insert(hash.clone(), self.buckets.len());
                self.buckets.push((hash, vec![path]));
            }
        }
    }

    /// Paths recorded for `hash`.
    #[must_use]
    pub fn get(&self, hash: &HashValue) -> Option<&[PathBuf]> {
        self.slots
            .get(hash)
            .map(|&slot| self.buckets[slot].1.as_slice())
    }

    /// Number of distinct fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of paths inserted.
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.total
    }

    /// Consume the index, keeping buckets with 2+ paths.
    #[must_use]
    pub fn into_groups(self) -> (Vec<DuplicateGroup>, GroupingStats) {
        let mut stats = GroupingStats {
            total_images: self.total,
            distinct_hashes: self.buckets.len(),
            ..GroupingStats::default()
        };

        let groups: Vec<DuplicateGroup> = self
            .buckets
            .into_iter()
            .filter_map(|(hash, paths)| {
                if paths.len() == 1 {
                    log::trace!("Unique fingerprint {}: {}", hash, paths[0].display());
                }
                DuplicateGroup::new(hash, paths)
            })
            .inspect(|group| {
                log::debug!("Fingerprint {}: {} images", group.hash(), group.len());
                stats.grouped_images += group.len();
            })
            .collect();
        stats.duplicate_groups = groups.len();

        log::info!(
            "Grouping complete: {} images -> {} duplicate group(s) covering {} images",
            stats.total_images,
            stats.duplicate_groups,
            stats.grouped_images
        );

        (groups, stats)
    }
}

/// Partition (path, hash) pairs into exact-match duplicate groups.
///
/// Single pass, groups ordered by the first encounter of their fingerprint.
#[must_use]
pub fn group_by_hash(
    items: impl IntoIterator<Item = (PathBuf, HashValue)>,
) -> (Vec<DuplicateGroup>, GroupingStats) {
    let mut index = HashIndex::new();
    for (path, hash) in items {
        index.insert(path, hash);
    }
    index.into_groups()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(byte: u8) -> HashValue {
        HashValue::from_bits((0..8).map(|i| byte & (0x80 >> i) != 0))
    }

    fn p(name: &str) -> PathBuf {
        PathBuf::from(name)
    }

    #[test]
    fn test_group_requires_two_members() {
        assert!(DuplicateGroup::new(h(1), vec![]).is_none());
        assert!(DuplicateGroup::new(h(1), vec![p("a")]).is_none());
        let group = DuplicateGroup::new(h(1), vec![p("a"), p("b")]).unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group.duplicate_count(), 1);
        assert!(!group.is_empty());
    }

    #[test]
    fn test_group_by_hash_empty_input() {
        let (groups, stats) = group_by_hash(Vec::new());
        assert!(groups.is_empty());
        assert_eq!(stats, GroupingStats::default());
    }

    #[test]
    fn test_group_by_hash_all_distinct() {
        let items = (0..5).map(|i| (p(&format!("{i}.png")), h(i)));
        let (groups, stats) = group_by_hash(items);
        assert!(groups.is_empty());
        assert_eq!(stats.total_images, 5);
        assert_eq!(stats.distinct_hashes, 5);
        assert_eq!(stats.grouped_images, 0);
    }

    #[test]
    fn test_group_by_hash_preserves_encounter_order() {
        let items = vec![
            (p("x1"), h(9)),
            (p("a1"), h(1)),
            (p("solo"), h(5)),
            (p("a2"), h(1)),
            (p("x2"), h(9)),
            (p("a3"), h(1)),
        ];
        let (groups, stats) = group_by_hash(items);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].hash(), &h(9));
        assert_eq!(groups[0].paths(), &[p("x1"), p("x2")]);
        assert_eq!(groups[1].paths(), &[p("a1"), p("a2"), p("a3")]);

        assert_eq!(stats.total_images, 6);
        assert_eq!(stats.distinct_hashes, 3);
        assert_eq!(stats.duplicate_groups, 2);
        assert_eq!(stats.grouped_images, 5);
    }

    #[test]
    fn test_hash_index_lookup() {
        let mut index = HashIndex::new();
        assert!(index.is_empty());
        index.insert(p("a"), h(3));
        index.insert(p("b"), h(3));
        index.insert(p("c"), h(4));

        assert_eq!(index.len(), 2);
        assert_eq!(index.path_count(), 3);
        assert_eq!(index.get(&h(3)), Some(&[p("a"), p("b")][..]));
        assert_eq!(index.get(&h(7)), None);
    }

    #[test]
    fn test_large_input_is_fast() {
        use std::time::Instant;

        let items: Vec<(PathBuf, HashValue)> = (0..100_000u32)
            .map(|i| {
                let key = if i % 2 == 0 { i } else { i / 100 };
                let hash = HashValue::from_bits((0..32).map(|b| key & (1 << b) != 0));
                (p(&format!("/img{i}.png")), hash)
            })
            .collect();

        let start = Instant::now();
        let (groups, stats) = group_by_hash(items);
        let elapsed = start.elapsed();

        assert_eq!(stats.total_images, 100_000);
        assert!(!groups.is_empty());
        assert!(elapsed.as_secs() < 2, "Grouping took too long: {:?}", elapsed);
    }
}
