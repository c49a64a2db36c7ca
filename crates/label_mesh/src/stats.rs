//! Whole-volume label scans.
//!
//! Each call scans the full volume once (parallel over z-slices); no
//! incremental index is kept.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use rayon::prelude::*;

use crate::types::Label;
use crate::volume::LabelVolume;

/// Every non-background label present in the volume, ascending.
pub fn distinct_labels<V: LabelVolume + ?Sized>(volume: &V) -> Vec<Label> {
  let depth = volume.dimensions()[2];
  let labels: BTreeSet<Label> = (0..depth)
    .into_par_iter()
    .fold(BTreeSet::new, |mut acc, z| {
      volume.for_each_in_slice(z, &mut |label| {
        if !label.is_background() {
          acc.insert(label);
        }
      });
      acc
    })
    .reduce(BTreeSet::new, |mut a, b| {
      a.extend(b);
      a
    });
  labels.into_iter().collect()
}

/// Voxel count per non-background label.
pub fn label_voxel_counts<V: LabelVolume + ?Sized>(volume: &V) -> HashMap<Label, u64> {
  let depth = volume.dimensions()[2];
  (0..depth)
    .into_par_iter()
    .fold(HashMap::new, |mut acc: HashMap<Label, u64>, z| {
      volume.for_each_in_slice(z, &mut |label| {
        if !label.is_background() {
          *acc.entry(label).or_default() += 1;
        }
      });
      acc
    })
    .reduce(HashMap::new, |mut a, b| {
      for (label, count) in b {
        *a.entry(label).or_default() += count;
      }
      a
    })
}

/// Heap entry ordered by count, then by *lower* label as greater.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Ranked {
  count: u64,
  label: Label,
}

impl Ord for Ranked {
  fn cmp(&self, other: &Self) -> Ordering {
    self.count
      .cmp(&other.count)
      .then_with(|| other.label.cmp(&self.label))
  }
}

impl PartialOrd for Ranked {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// The `k` labels with the most voxels, largest first.
///
/// Ties are broken by label id ascending. Background is never selected.
pub fn largest_labels(counts: &HashMap<Label, u64>, k: usize) -> Vec<Label> {
  if k == 0 {
    return Vec::new();
  }

  // Min-heap of the best k seen so far.
  let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k + 1);
  for (&label, &count) in counts {
    if label.is_background() {
      continue;
    }
    heap.push(Reverse(Ranked { count, label }));
    if heap.len() > k {
      heap.pop();
    }
  }

  let mut ranked: Vec<Ranked> = heap.into_iter().map(|Reverse(r)| r).collect();
  ranked.sort_unstable_by(|a, b| b.cmp(a));
  ranked.into_iter().map(|r| r.label).collect()
}
