//! Cross-channel reconciliation of detections.
//!
//! Inside every leaf, detections on different channels that satisfy the
//! configured overlap predicate are joined, and each connected component of
//! the resulting graph becomes one [`MergedDetection`]. Components are found
//! with a union-find over positions in the leaf's canonical detection order,
//! so the partition never depends on the order records arrived in.

mod union_find;

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use hashbrown::HashMap;

use crate::config::{ExtractionConfig, OverlapMetric, OverlapRule, Reducer};
use crate::detection::{Detection, DetectionSet, LeafDetections};
use crate::geometry::{BoundingBox, Point};
use crate::spatial::GridIndex;
use union_find::UnionFind;

/// Joins channel ids in the label of a multi-channel object.
pub const OVERLAP_DELIMITER: &str = "~";

// ============================================================================
// Channel order
// ============================================================================

/// Deterministic channel priority: configured channels first, then the
/// remaining ones by id.
#[derive(Debug, Clone, Default)]
pub struct ChannelOrder {
    ordered: Vec<String>,
    rank: HashMap<String, usize>,
}

impl ChannelOrder {
    pub fn new<'a>(priority: &[String], observed: impl IntoIterator<Item = &'a String>) -> Self {
        let mut ordered: Vec<String> = priority.to_vec();
        let mut rest: BTreeSet<&String> = observed.into_iter().collect();
        rest.retain(|channel| !priority.contains(*channel));
        ordered.extend(rest.into_iter().cloned());

        let rank = ordered
            .iter()
            .enumerate()
            .map(|(rank, channel)| (channel.clone(), rank))
            .collect();
        Self { ordered, rank }
    }

    /// Channels not known to the order rank after every known one.
    pub fn rank(&self, channel: &str) -> usize {
        self.rank.get(channel).copied().unwrap_or(usize::MAX)
    }

    pub fn channels(&self) -> &[String] {
        &self.ordered
    }

    /// Sort key placing a channel combination at its position in
    /// [`overlap_class_names`] without enumerating the other combinations.
    ///
    /// One digit per rank up to the lowest-priority member: `1` if the rank is
    /// absent, `2` if present, `0` for the last member. Channels unknown to the
    /// order are ignored.
    pub fn enumeration_key(&self, channels: &[String]) -> Vec<u8> {
        let mut ranks: Vec<usize> = channels
            .iter()
            .filter_map(|c| self.rank.get(c.as_str()).copied())
            .collect();
        ranks.sort_unstable();
        ranks.dedup();
        let Some(&last) = ranks.last() else {
            return Vec::new();
        };

        (0..=last)
            .map(|rank| {
                if rank == last {
                    0
                } else if ranks.binary_search(&rank).is_ok() {
                    2
                } else {
                    1
                }
            })
            .collect()
    }
}

/// Every label a merged object can carry, in the enumeration order of the
/// region tables: `[a, b, c]` gives `a, b, c, b~c, a~b, a~c, a~b~c`.
pub fn overlap_class_names(channels: &[String]) -> Vec<String> {
    let Some((first, others)) = channels.split_first() else {
        return Vec::new();
    };
    let tail = overlap_class_names(others);
    let mut names = Vec::with_capacity(tail.len() * 2 + 1);
    names.push(first.clone());
    names.extend(tail.iter().cloned());
    names.extend(
        tail.iter()
            .map(|postfix| format!("{first}{OVERLAP_DELIMITER}{postfix}")),
    );
    names
}

// ============================================================================
// Merged detections
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MergedDetection {
    /// Pre-order index of the owning leaf region.
    pub region: usize,
    /// Positions in [`DetectionSet::detections`], by channel priority.
    pub members: Vec<usize>,
    /// Distinct contributing channels, by channel priority.
    pub channels: Vec<String>,
    /// Mean of the member centroids.
    pub centroid: Point,
    pub measurements: BTreeMap<String, f64>,
}

impl MergedDetection {
    /// `cfos~arc` style label; a single channel id for singletons.
    pub fn label(&self) -> String {
        self.channels.join(OVERLAP_DELIMITER)
    }

    /// Whether the object was seen on more than one channel.
    pub fn is_overlap(&self) -> bool {
        self.channels.len() > 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergedSet {
    merged: Vec<MergedDetection>,
    by_region: BTreeMap<usize, Range<usize>>,
}

impl MergedSet {
    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    pub fn all(&self) -> &[MergedDetection] {
        &self.merged
    }

    pub fn in_region(&self, region: usize) -> &[MergedDetection] {
        match self.by_region.get(&region) {
            Some(range) => &self.merged[range.clone()],
            None => &[],
        }
    }

    /// Labels of the multi-channel objects present, in [`overlap_class_names`] order.
    pub fn overlap_classes(&self, order: &ChannelOrder) -> Vec<String> {
        let classes: BTreeMap<Vec<u8>, String> = self
            .merged
            .iter()
            .filter(|m| m.is_overlap())
            .map(|m| (order.enumeration_key(&m.channels), m.label()))
            .collect();
        classes.into_values().collect()
    }

    /// Leaves that own at least one merged object, in ontology order.
    pub fn regions(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_region.keys().copied()
    }

    /// Whether every detection position `0..detection_count` is a member of
    /// exactly one merged object.
    pub fn is_partition_of(&self, detection_count: usize) -> bool {
        let mut seen = vec![false; detection_count];
        for member in self.merged.iter().flat_map(|m| &m.members) {
            match seen.get_mut(*member) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        seen.into_iter().all(|s| s)
    }
}

// ============================================================================
// Merger
// ============================================================================

#[derive(Debug)]
pub struct ChannelMerger<'a> {
    config: &'a ExtractionConfig,
    order: ChannelOrder,
}

impl<'a> ChannelMerger<'a> {
    pub fn new(config: &'a ExtractionConfig, order: ChannelOrder) -> Self {
        Self { config, order }
    }

    pub fn order(&self) -> &ChannelOrder {
        &self.order
    }

    /// Merges every leaf of `set`, on the worker pool when configured.
    pub fn merge(&self, set: &DetectionSet) -> MergedSet {
        let leaves = set.leaf_groups();
        let per_leaf = common::parallel::map_bounded(
            &leaves,
            self.config.max_concurrent_leaves(),
            |leaf| self.merge_leaf(*leaf),
        );

        let mut merged = Vec::with_capacity(set.len());
        let mut by_region = BTreeMap::new();
        for (leaf, objects) in leaves.iter().zip(per_leaf) {
            let start = merged.len();
            merged.extend(objects);
            by_region.insert(leaf.region, start..merged.len());
        }

        let result = MergedSet { merged, by_region };
        debug_assert!(
            result.is_partition_of(set.len()),
            "merged objects must partition the detections"
        );

        tracing::debug!(
            detections = set.len(),
            merged = result.len(),
            leaves = leaves.len(),
            "Merged channel detections"
        );
        result
    }

    /// Connected components of one leaf's overlap graph.
    pub fn merge_leaf(&self, leaf: LeafDetections<'_>) -> Vec<MergedDetection> {
        let detections = leaf.detections;
        let rule = self.config.overlap();

        let (boxes, margin): (Vec<BoundingBox>, f64) = match rule.metric {
            OverlapMetric::CentroidDistance => (
                detections
                    .iter()
                    .map(|d| BoundingBox::around(d.centroid, 0.0))
                    .collect(),
                rule.threshold / 2.0,
            ),
            OverlapMetric::Iou | OverlapMetric::CentroidContainment => {
                (detections.iter().map(|d| d.bounds).collect(), 0.0)
            }
        };

        let mut uf = UnionFind::new(detections.len());
        for (i, j) in GridIndex::build(&boxes, margin).candidate_pairs() {
            let (a, b) = (&detections[i], &detections[j]);
            if a.channel_id != b.channel_id && overlaps(rule, a, b) {
                uf.union(i, j);
            }
        }

        uf.groups()
            .into_iter()
            .map(|mut positions| {
                positions.sort_by_key(|&p| (self.order.rank(&detections[p].channel_id), p));
                self.combine(leaf, &positions)
            })
            .collect()
    }

    fn combine(&self, leaf: LeafDetections<'_>, positions: &[usize]) -> MergedDetection {
        let members: Vec<&Detection> = positions.iter().map(|&p| &leaf.detections[p]).collect();

        let mut channels: Vec<String> = Vec::new();
        for member in &members {
            if !channels.contains(&member.channel_id) {
                channels.push(member.channel_id.clone());
            }
        }

        let n = members.len() as f64;
        let (sx, sy) = members
            .iter()
            .fold((0.0, 0.0), |(sx, sy), d| (sx + d.centroid.x, sy + d.centroid.y));

        let names: BTreeSet<&String> = members.iter().flat_map(|d| d.measurements.keys()).collect();
        let measurements = names
            .into_iter()
            .map(|name| {
                let values = members.iter().filter_map(|d| d.measurements.get(name).copied());
                (name.clone(), reduce(self.config.reducer(name), values))
            })
            .collect();

        MergedDetection {
            region: leaf.region,
            members: positions.iter().map(|&p| leaf.offset + p).collect(),
            channels,
            centroid: Point::new(sx / n, sy / n),
            measurements,
        }
    }
}

fn overlaps(rule: OverlapRule, a: &Detection, b: &Detection) -> bool {
    match rule.metric {
        OverlapMetric::Iou => a.bounds.iou(&b.bounds) >= rule.threshold,
        OverlapMetric::CentroidDistance => a.centroid.distance(b.centroid) <= rule.threshold,
        OverlapMetric::CentroidContainment => {
            a.geometry.contains(b.centroid) || b.geometry.contains(a.centroid)
        }
    }
}

/// Combines the values of the members that carry a measurement, in member order.
/// At least one value is always present.
fn reduce(reducer: Reducer, mut values: impl Iterator<Item = f64>) -> f64 {
    match reducer {
        Reducer::First => values.next().unwrap_or(0.0),
        Reducer::Sum => values.sum(),
        Reducer::Max => values.fold(f64::NEG_INFINITY, f64::max),
        Reducer::Mean => {
            let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                0.0
            } else {
                sum / count as f64
            }
        }
    }
}
