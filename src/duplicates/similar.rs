//! Near-match grouping by Hamming distance.
//!
//! Opt-in alternative to exact grouping: two images belong together when a
//! chain of fingerprints, each within `max_distance` bits of the next,
//! connects them (single-linkage). With `max_distance == 0` the result equals
//! [`group_by_hash`](super::group_by_hash).
//!
//! Distinct fingerprints are stored in a BK-tree so each neighbourhood query
//! avoids a full pairwise scan.

use std::collections::HashMap;
use std::path::PathBuf;

use bk_tree::{BKTree, Metric};

use super::groups::{DuplicateGroup, GroupingStats};
use crate::hashing::HashValue;

/// Hamming distance between two fingerprints.
#[derive(Default, Clone, Copy, Debug)]
pub struct HammingMetric;

impl Metric<HashValue> for HammingMetric {
    fn distance(&self, a: &HashValue, b: &HashValue) -> u32 {
        a.hamming_distance(b)
    }

    fn threshold_distance(&self, a: &HashValue, b: &HashValue, threshold: u32) -> Option<u32> {
        let d = self.distance(a, b);
        (d <= threshold).then_some(d)
    }
}

/// BK-tree over fingerprints.
pub struct SimilarityIndex {
    tree: BKTree<HashValue, HammingMetric>,
    count: usize,
}

impl Default for SimilarityIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: BKTree::new(HammingMetric),
            count: 0,
        }
    }

    /// Add a fingerprint.
    pub fn insert(&mut self, hash: HashValue) {
        self.tree.add(hash);
        self.count += 1;
    }

    /// Fingerprints within `max_distance` of `hash`, with their distances.
    #[must_use]
    pub fn find(&self, hash: &HashValue, max_distance: u32) -> Vec<(u32, &HashValue)> {
        self.tree.find(hash, max_distance).collect()
    }

    /// Number of fingerprints inserted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    // The smaller root wins so a cluster is keyed by its earliest member.
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

/// Partition (path, hash) pairs into groups whose fingerprints are linked by
/// Hamming distance `<= max_distance`.
///
/// Members keep encounter order; groups are ordered by their earliest member
/// and carry that member's fingerprint.
#[must_use]
pub fn group_by_distance(
    items: impl IntoIterator<Item = (PathBuf, HashValue)>,
    max_distance: u32,
) -> (Vec<DuplicateGroup>, GroupingStats) {
    let mut slots: HashMap<HashValue, usize> = HashMap::new();
    let mut hashes: Vec<HashValue> = Vec::new();
    let mut members: Vec<Vec<(usize, PathBuf)>> = Vec::new();
    let mut total = 0;

    for (seq, (path, hash)) in items.into_iter().enumerate() {
        total += 1;
        let slot = match slots.get(&hash) {
            Some(&slot) => slot,
            None => {
                slots.insert(hash.clone(), hashes.len());
                hashes.push(hash);
                members.push(Vec::new());
                hashes.len() - 1
            }
        };
        members[slot].push((seq, path));
    }

    let mut index = SimilarityIndex::new();
    for hash in &hashes {
        index.insert(hash.clone());
    }

    let mut sets = DisjointSet::new(hashes.len());
    for (slot, hash) in hashes.iter().enumerate() {
        for (distance, neighbour) in index.find(hash, max_distance) {
            if let Some(&other) = slots.get(neighbour) {
                if other != slot {
                    log::trace!("{} ~ {} (distance {})", hash, neighbour, distance);
                    sets.union(slot, other);
                }
            }
        }
    }

    // Slots are numbered in first-encounter order, so iterating them in order
    // creates clusters in first-encounter order too.
    let mut cluster_of_root: HashMap<usize, usize> = HashMap::new();
    let mut clusters: Vec<(usize, Vec<(usize, PathBuf)>)> = Vec::new();
    for (slot, paths) in members.into_iter().enumerate() {
        let root = sets.find(slot);
        let cluster = *cluster_of_root.entry(root).or_insert_with(|| {
            clusters.push((slot, Vec::new()));
            clusters.len() - 1
        });
        clusters[cluster].1.extend(paths);
    }

    let mut stats = GroupingStats {
        total_images: total,
        distinct_hashes: hashes.len(),
        ..GroupingStats::default()
    };

    let groups: Vec<DuplicateGroup> = clusters
        .into_iter()
        .filter_map(|(first_slot, mut paths)| {
            paths.sort_by_key(|(seq, _)| *seq);
            let paths = paths.into_iter().map(|(_, path)| path).collect();
            DuplicateGroup::new(hashes[first_slot].clone(), paths)
        })
        .collect();

    stats.duplicate_groups = groups.len();
    stats.grouped_images = groups.iter().map(DuplicateGroup::len).sum();

    log::info!(
        "Near-match grouping (distance <= {}): {} images -> {} group(s)",
        max_distance,
        stats.total_images,
        stats.duplicate_groups
    );

    (groups, stats)
}
