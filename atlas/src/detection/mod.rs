//! Normalization of raw per-object records into a validated, grouped set.
//!
//! Detections are sorted by leaf region (in ontology order) and then by a
//! canonical key, so every leaf owns a contiguous slice and the same input
//! multiset always yields the same layout regardless of record order.


use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{RecordError, RecordProblem, Result};
use crate::geometry::{BoundingBox, Geometry, Point};
use crate::ontology::OntologyTree;

/// One object as delivered by the upstream analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDetection {
    pub region_id: String,
    pub channel_id: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub measurements: BTreeMap<String, f64>,
}

impl RawDetection {
    pub fn new(
        region_id: impl Into<String>,
        channel_id: impl Into<String>,
        geometry: Geometry,
    ) -> Self {
        Self {
            region_id: region_id.into(),
            channel_id: channel_id.into(),
            geometry,
            measurements: BTreeMap::new(),
        }
    }

    pub fn with_measurement(mut self, name: impl Into<String>, value: f64) -> Self {
        self.measurements.insert(name.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Position of the record in the input sequence.
    pub source_index: usize,
    /// Pre-order index of the owning leaf region.
    pub region: usize,
    pub channel_id: String,
    pub centroid: Point,
    pub bounds: BoundingBox,
    pub geometry: Geometry,
    pub measurements: BTreeMap<String, f64>,
}

impl Detection {
    /// Order-independent key: channel, centroid, bounds, shape, measurements.
    fn canonical_cmp(&self, other: &Detection) -> Ordering {
        self.region
            .cmp(&other.region)
            .then_with(|| self.channel_id.cmp(&other.channel_id))
            .then_with(|| self.centroid.total_cmp(&other.centroid))
            .then_with(|| self.bounds.total_cmp(&other.bounds))
            .then_with(|| self.geometry.total_cmp(&other.geometry))
            .then_with(|| {
                self.measurements
                    .iter()
                    .zip(&other.measurements)
                    .map(|((k1, v1), (k2, v2))| k1.cmp(k2).then_with(|| v1.total_cmp(v2)))
                    .find(|ord| ord.is_ne())
                    .unwrap_or_else(|| self.measurements.len().cmp(&other.measurements.len()))
            })
    }
}

/// Detections of one leaf region.
#[derive(Debug, Clone, Copy)]
pub struct LeafDetections<'a> {
    pub region: usize,
    /// Offset of `detections[0]` in the owning [`DetectionSet`].
    pub offset: usize,
    pub detections: &'a [Detection],
}

#[derive(Debug, Clone, Default)]
pub struct DetectionSet {
    detections: Vec<Detection>,
    by_region: BTreeMap<usize, Range<usize>>,
    channels: BTreeSet<String>,
    skipped: Vec<RecordError>,
}

impl DetectionSet {
    /// Validates and groups `records` against `tree`.
    ///
    /// In strict mode the first invalid record (in input order) aborts with its
    /// error. Otherwise invalid records are dropped and listed in [`Self::skipped`].
    pub fn from_raw(records: &[RawDetection], tree: &OntologyTree, strict: bool) -> Result<Self> {
        let mut detections = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match normalize(index, record, tree) {
                Ok(detection) => detections.push(detection),
                Err(problem) => {
                    let error = RecordError {
                        index,
                        region_id: record.region_id.clone(),
                        channel_id: record.channel_id.clone(),
                        problem,
                    };
                    if strict {
                        return Err(error.into_error());
                    }
                    tracing::warn!("Skipping {error}");
                    skipped.push(error);
                }
            }
        }

        detections.sort_by(Detection::canonical_cmp);

        let mut by_region: BTreeMap<usize, Range<usize>> = BTreeMap::new();
        let mut channels = BTreeSet::new();
        for (position, detection) in detections.iter().enumerate() {
            by_region
                .entry(detection.region)
                .and_modify(|range| range.end = position + 1)
                .or_insert(position..position + 1);
            if !channels.contains(&detection.channel_id) {
                channels.insert(detection.channel_id.clone());
            }
        }

        tracing::debug!(
            accepted = detections.len(),
            skipped = skipped.len(),
            leaves = by_region.len(),
            "Normalized detection records"
        );

        Ok(Self {
            detections,
            by_region,
            channels,
            skipped,
        })
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// Every channel seen among accepted detections, sorted by id.
    pub fn channels(&self) -> &BTreeSet<String> {
        &self.channels
    }

    pub fn skipped(&self) -> &[RecordError] {
        &self.skipped
    }

    /// Leaf regions that own at least one detection, in ontology order.
    pub fn leaf_groups(&self) -> Vec<LeafDetections<'_>> {
        self.by_region
            .iter()
            .map(|(&region, range)| LeafDetections {
                region,
                offset: range.start,
                detections: &self.detections[range.clone()],
            })
            .collect()
    }

    pub fn in_region(&self, region: usize) -> &[Detection] {
        match self.by_region.get(&region) {
            Some(range) => &self.detections[range.clone()],
            None => &[],
        }
    }

    /// Detections of one channel inside one leaf.
    pub fn in_region_channel(&self, region: usize, channel_id: &str) -> &[Detection] {
        let detections = self.in_region(region);
        let start = detections.partition_point(|d| d.channel_id.as_str() < channel_id);
        let end = detections.partition_point(|d| d.channel_id.as_str() <= channel_id);
        &detections[start..end]
    }

    pub fn channel_counts(&self, region: usize) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        for detection in self.in_region(region) {
            *counts.entry(detection.channel_id.clone()).or_insert(0) += 1;
        }
        counts
    }
}

fn normalize(
    index: usize,
    record: &RawDetection,
    tree: &OntologyTree,
) -> std::result::Result<Detection, RecordProblem> {
    let region = tree
        .index_of(&record.region_id)
        .ok_or(RecordProblem::UnknownRegion)?;
    if !tree.region(region).is_leaf() {
        return Err(RecordProblem::NotALeaf);
    }

    if let Some((name, value)) = record.measurements.iter().find(|(_, v)| !v.is_finite()) {
        return Err(RecordProblem::InvalidMeasurement {
            measurement: name.clone(),
            value: *value,
        });
    }

    record
        .geometry
        .validate()
        .map_err(|reason| RecordProblem::InvalidGeometry { reason })?;

    Ok(Detection {
        source_index: index,
        region,
        channel_id: record.channel_id.clone(),
        centroid: record.geometry.centroid(),
        bounds: record.geometry.bounds(),
        geometry: record.geometry.clone(),
        measurements: record.measurements.clone(),
    })
}
