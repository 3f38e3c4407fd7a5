//! Extraction configuration.
//!
//! [`RawConfig`] mirrors the configuration file (camelCase keys, names as
//! strings, every field optional). [`RawConfig::validate`] turns it into an
//! immutable [`ExtractionConfig`], rejecting unknown names and out-of-range
//! values before any data is touched.


use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{Error, Result};

// ============================================================================
// Named options
// ============================================================================

/// How two detections on different channels are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum OverlapMetric {
    /// Intersection over union of bounding boxes, merged when `>= threshold`.
    #[default]
    Iou,
    /// Euclidean centroid distance, merged when `<= threshold`.
    CentroidDistance,
    /// Merged when either shape contains the other's centroid. Threshold unused.
    CentroidContainment,
}

/// Combines one measurement across the members of a merged detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum Reducer {
    Sum,
    Max,
    Mean,
    /// Value of the member on the highest-priority channel.
    #[default]
    First,
}

/// Combines one measurement across the merged detections of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
}

/// Weights used when averaging child densities into a parent density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum DensityWeighting {
    #[default]
    Area,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapRule {
    pub metric: OverlapMetric,
    pub threshold: f64,
}

// ============================================================================
// Raw configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawConfig {
    pub overlap_metric: String,
    pub overlap_threshold: f64,
    /// Measurement name -> reducer name (`sum`, `max`, `mean`, `first`).
    pub reducers: BTreeMap<String, String>,
    /// Measurement name -> region aggregation (`sum`, `mean`).
    pub aggregations: BTreeMap<String, String>,
    pub required_measurements: BTreeSet<String>,
    pub density_measurements: BTreeSet<String>,
    pub density_weighting: String,
    /// Channels in decreasing priority; unlisted channels follow in id order.
    pub channel_priority: Vec<String>,
    pub excluded_regions: BTreeSet<String>,
    /// Abort on the first invalid record instead of skipping it.
    pub strict: bool,
    /// Process leaves on the rayon pool, at most this many at once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_leaves: Option<usize>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            overlap_metric: OverlapMetric::default().to_string(),
            overlap_threshold: 0.5,
            reducers: BTreeMap::new(),
            aggregations: BTreeMap::new(),
            required_measurements: BTreeSet::new(),
            density_measurements: BTreeSet::new(),
            density_weighting: DensityWeighting::default().to_string(),
            channel_priority: Vec::new(),
            excluded_regions: BTreeSet::new(),
            strict: true,
            max_concurrent_leaves: None,
        }
    }
}

fn parse_option<T: FromStr>(what: &str, value: &str) -> Result<T> {
    T::from_str(value).map_err(|_| Error::InvalidConfig(format!("unknown {what} '{value}'")))
}

impl RawConfig {
    pub fn validate(&self) -> Result<ExtractionConfig> {
        let metric: OverlapMetric = parse_option("overlap metric", &self.overlap_metric)?;
        let threshold = self.overlap_threshold;
        if !threshold.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "overlap threshold {threshold} is not finite"
            )));
        }
        match metric {
            OverlapMetric::Iou if threshold <= 0.0 || threshold > 1.0 => {
                return Err(Error::InvalidConfig(format!(
                    "IoU threshold must be in (0, 1], got {threshold}"
                )));
            }
            OverlapMetric::CentroidDistance if threshold < 0.0 => {
                return Err(Error::InvalidConfig(format!(
                    "centroid distance threshold must be >= 0, got {threshold}"
                )));
            }
            _ => {}
        }

        let mut reducers = BTreeMap::new();
        for (measurement, name) in &self.reducers {
            let reducer = Reducer::from_str(name).map_err(|_| Error::UnknownReducer {
                measurement: measurement.clone(),
                name: name.clone(),
            })?;
            reducers.insert(measurement.clone(), reducer);
        }

        let mut aggregations = BTreeMap::new();
        for (measurement, name) in &self.aggregations {
            let aggregation: Aggregation = parse_option("aggregation mode", name)?;
            if aggregation == Aggregation::Mean && self.density_measurements.contains(measurement) {
                return Err(Error::InvalidConfig(format!(
                    "density measurement '{measurement}' must aggregate by sum"
                )));
            }
            aggregations.insert(measurement.clone(), aggregation);
        }

        let density_weighting: DensityWeighting =
            parse_option("density weighting", &self.density_weighting)?;

        let mut seen = BTreeSet::new();
        for channel in &self.channel_priority {
            if !seen.insert(channel) {
                return Err(Error::InvalidConfig(format!(
                    "channel '{channel}' listed twice in channel priority"
                )));
            }
        }

        if self.max_concurrent_leaves == Some(0) {
            return Err(Error::InvalidConfig("maxConcurrentLeaves must be > 0".to_string()));
        }

        Ok(ExtractionConfig {
            overlap: OverlapRule { metric, threshold },
            reducers,
            aggregations,
            required_measurements: self.required_measurements.clone(),
            density_measurements: self.density_measurements.clone(),
            density_weighting,
            channel_priority: self.channel_priority.clone(),
            excluded_regions: self.excluded_regions.clone(),
            strict: self.strict,
            max_concurrent_leaves: self.max_concurrent_leaves,
        })
    }
}

// ============================================================================
// Validated configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    overlap: OverlapRule,
    reducers: BTreeMap<String, Reducer>,
    aggregations: BTreeMap<String, Aggregation>,
    required_measurements: BTreeSet<String>,
    density_measurements: BTreeSet<String>,
    density_weighting: DensityWeighting,
    channel_priority: Vec<String>,
    excluded_regions: BTreeSet<String>,
    strict: bool,
    max_concurrent_leaves: Option<usize>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            overlap: OverlapRule {
                metric: OverlapMetric::Iou,
                threshold: 0.5,
            },
            reducers: BTreeMap::new(),
            aggregations: BTreeMap::new(),
            required_measurements: BTreeSet::new(),
            density_measurements: BTreeSet::new(),
            density_weighting: DensityWeighting::Area,
            channel_priority: Vec::new(),
            excluded_regions: BTreeSet::new(),
            strict: true,
            max_concurrent_leaves: None,
        }
    }
}

impl ExtractionConfig {
    pub fn overlap(&self) -> OverlapRule {
        self.overlap
    }

    /// Reducer for `measurement`; unspecified measurements use [`Reducer::First`].
    pub fn reducer(&self, measurement: &str) -> Reducer {
        self.reducers.get(measurement).copied().unwrap_or_default()
    }

    pub fn aggregation(&self, measurement: &str) -> Aggregation {
        self.aggregations
            .get(measurement)
            .copied()
            .unwrap_or_default()
    }

    pub fn is_density(&self, measurement: &str) -> bool {
        self.density_measurements.contains(measurement)
    }

    pub fn is_required(&self, measurement: &str) -> bool {
        self.required_measurements.contains(measurement)
    }

    pub fn required_measurements(&self) -> &BTreeSet<String> {
        &self.required_measurements
    }

    pub fn density_weighting(&self) -> DensityWeighting {
        self.density_weighting
    }

    pub fn channel_priority(&self) -> &[String] {
        &self.channel_priority
    }

    pub fn excluded_regions(&self) -> &BTreeSet<String> {
        &self.excluded_regions
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn max_concurrent_leaves(&self) -> Option<usize> {
        self.max_concurrent_leaves
    }

    /// Every measurement name the configuration refers to.
    pub fn named_measurements(&self) -> BTreeSet<String> {
        self.reducers
            .keys()
            .chain(self.aggregations.keys())
            .chain(&self.required_measurements)
            .chain(&self.density_measurements)
            .cloned()
            .collect()
    }
}
