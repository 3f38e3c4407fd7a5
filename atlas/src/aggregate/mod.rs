//! Post-order roll-up of merged objects into one row per region.
//!
//! Leaves are seeded from their own merged objects (independently, so the
//! seeding may fan out over the worker pool). Internal regions are then
//! filled children-first from their children's rows only; raw detections
//! are never rescanned above the leaves.


use std::collections::BTreeSet;

use crate::config::{Aggregation, DensityWeighting, ExtractionConfig};
use crate::detection::DetectionSet;
use crate::error::{Error, Result};
use crate::merge::{MergedDetection, MergedSet};
use crate::ontology::OntologyTree;
use crate::result::RegionResult;

#[derive(Debug)]
pub struct RegionAggregator<'a> {
    tree: &'a OntologyTree,
    config: &'a ExtractionConfig,
    excluded: Vec<bool>,
}

impl<'a> RegionAggregator<'a> {
    /// Fails with [`Error::InvalidConfig`] if an excluded region is not in `tree`.
    pub fn new(tree: &'a OntologyTree, config: &'a ExtractionConfig) -> Result<Self> {
        let mut excluded = vec![false; tree.len()];
        for id in config.excluded_regions() {
            let index = tree.index_of(id).ok_or_else(|| {
                Error::InvalidConfig(format!("excluded region '{id}' is not in the ontology"))
            })?;
            excluded[index] = true;
            for descendant in tree.descendants(index) {
                excluded[descendant] = true;
            }
        }

        Ok(Self {
            tree,
            config,
            excluded,
        })
    }

    /// Measurement names reported for every region: observed ones plus configured ones.
    pub fn measurement_names(&self, merged: &MergedSet) -> BTreeSet<String> {
        let mut names = self.config.named_measurements();
        for object in merged.all() {
            for name in object.measurements.keys() {
                if !names.contains(name) {
                    names.insert(name.clone());
                }
            }
        }
        names
    }

    /// One row per region in pre-order.
    ///
    /// `channels` lists every channel of the run; each row reports a count for all of them.
    pub fn aggregate(
        &self,
        detections: &DetectionSet,
        merged: &MergedSet,
        channels: &[String],
    ) -> Result<Vec<RegionResult>> {
        let names = self.measurement_names(merged);
        let leaves: Vec<usize> = self.tree.leaves().collect();

        let seeded = common::parallel::try_map_bounded(
            &leaves,
            self.config.max_concurrent_leaves(),
            |&leaf| self.seed_leaf(leaf, detections, merged.in_region(leaf), channels, &names),
        )?;

        // Barrier: every leaf row exists before any internal row is derived.
        let mut rows: Vec<RegionResult> = vec![RegionResult::default(); self.tree.len()];
        for (leaf, row) in leaves.into_iter().zip(seeded) {
            rows[leaf] = row;
        }

        for index in self.tree.bottom_up() {
            let region = self.tree.region(index);
            if region.is_leaf() {
                continue;
            }
            let children: Vec<&RegionResult> = region.children.iter().map(|&c| &rows[c]).collect();
            let row = self.combine(index, &children, &names);
            rows[index] = row;
        }

        tracing::debug!(
            regions = rows.len(),
            leaves = self.tree.leaves().count(),
            measurements = names.len(),
            "Aggregated regions"
        );
        Ok(rows)
    }

    fn empty_row(&self, index: usize) -> RegionResult {
        let region = self.tree.region(index);
        RegionResult {
            region_id: region.id.clone(),
            region_name: region.name.clone(),
            depth: region.depth,
            excluded: self.excluded[index],
            ..RegionResult::default()
        }
    }

    fn seed_leaf(
        &self,
        index: usize,
        detections: &DetectionSet,
        objects: &[MergedDetection],
        channels: &[String],
        names: &BTreeSet<String>,
    ) -> Result<RegionResult> {
        let region = self.tree.region(index);

        for name in self.config.required_measurements() {
            if objects.iter().any(|o| !o.measurements.contains_key(name)) {
                return Err(Error::MissingMeasurement {
                    region_id: region.id.clone(),
                    measurement: name.clone(),
                });
            }
        }

        let mut row = self.empty_row(index);
        row.area = region.area;
        row.count_merged = objects.len() as u64;

        let raw_counts = detections.channel_counts(index);
        row.count_per_channel = channels
            .iter()
            .map(|c| (c.clone(), raw_counts.get(c).copied().unwrap_or(0)))
            .collect();
        for object in objects.iter().filter(|o| o.is_overlap()) {
            *row.count_per_overlap.entry(object.label()).or_insert(0) += 1;
        }

        for name in names {
            let mut sum = 0.0;
            let mut support = 0u64;
            for value in objects.iter().filter_map(|o| o.measurements.get(name)) {
                sum += value;
                support += 1;
            }
            row.measurement_support.insert(name.clone(), support);

            let value = if self.config.is_density(name) {
                (row.area > 0.0).then(|| sum / row.area)
            } else {
                match self.config.aggregation(name) {
                    Aggregation::Sum => Some(sum),
                    Aggregation::Mean => (support > 0).then(|| sum / support as f64),
                }
            };
            if let Some(value) = value {
                row.measurements.insert(name.clone(), value);
            }
        }

        Ok(row)
    }

    fn combine(
        &self,
        index: usize,
        children: &[&RegionResult],
        names: &BTreeSet<String>,
    ) -> RegionResult {
        let mut row = self.empty_row(index);
        row.area = children.iter().map(|c| c.area).sum();
        row.count_merged = children.iter().map(|c| c.count_merged).sum();

        for child in children {
            for (channel, count) in &child.count_per_channel {
                *row.count_per_channel.entry(channel.clone()).or_insert(0) += count;
            }
            for (label, count) in &child.count_per_overlap {
                *row.count_per_overlap.entry(label.clone()).or_insert(0) += count;
            }
        }

        for name in names {
            let support: u64 = children
                .iter()
                .map(|c| c.measurement_support.get(name).copied().unwrap_or(0))
                .sum();
            row.measurement_support.insert(name.clone(), support);

            let value = if self.config.is_density(name) {
                self.weighted_density(children, name)
            } else {
                match self.config.aggregation(name) {
                    Aggregation::Sum => Some(
                        children
                            .iter()
                            .map(|c| c.measurements.get(name).copied().unwrap_or(0.0))
                            .sum::<f64>(),
                    ),
                    Aggregation::Mean => support_weighted_mean(children, name),
                }
            };
            if let Some(value) = value {
                row.measurements.insert(name.clone(), value);
            }
        }

        row
    }

    /// Mean of the children's densities weighted by area or object count.
    /// Falls back to an unweighted mean when every weight is zero.
    fn weighted_density(&self, children: &[&RegionResult], name: &str) -> Option<f64> {
        let present: Vec<(f64, f64)> = children
            .iter()
            .filter_map(|c| {
                let weight = match self.config.density_weighting() {
                    DensityWeighting::Area => c.area,
                    DensityWeighting::Count => c.count_merged as f64,
                };
                c.measurements.get(name).map(|&v| (v, weight))
            })
            .collect();
        if present.is_empty() {
            return None;
        }

        let total_weight: f64 = present.iter().map(|&(_, w)| w).sum();
        if total_weight > 0.0 {
            Some(present.iter().map(|&(v, w)| v * w).sum::<f64>() / total_weight)
        } else {
            Some(present.iter().map(|&(v, _)| v).sum::<f64>() / present.len() as f64)
        }
    }
}

fn support_weighted_mean(children: &[&RegionResult], name: &str) -> Option<f64> {
    let mut weighted = 0.0;
    let mut support = 0u64;
    for child in children {
        let n = child.measurement_support.get(name).copied().unwrap_or(0);
        if n == 0 {
            continue;
        }
        if let Some(mean) = child.measurements.get(name) {
            weighted += mean * n as f64;
            support += n;
        }
    }
    (support > 0).then(|| weighted / support as f64)
}
