//! Fixed-order composition of the extraction stages.

use std::time::Instant;

use crate::aggregate::RegionAggregator;
use crate::config::{ExtractionConfig, RawConfig};
use crate::detection::{DetectionSet, RawDetection};
use crate::error::Result;
use crate::merge::{ChannelMerger, ChannelOrder};
use crate::ontology::{OntologySource, OntologyTree};
use crate::result::ExtractionResult;

/// Runs detections through normalization, channel merging and region roll-up
/// against one ontology and one validated configuration.
///
/// The pipeline holds no state between runs.
#[derive(Debug)]
pub struct ExtractionPipeline<'a> {
    tree: &'a OntologyTree,
    config: &'a ExtractionConfig,
    aggregator: RegionAggregator<'a>,
}

impl<'a> ExtractionPipeline<'a> {
    /// Checks the configuration against the ontology (excluded region ids).
    pub fn new(tree: &'a OntologyTree, config: &'a ExtractionConfig) -> Result<Self> {
        Ok(Self {
            tree,
            config,
            aggregator: RegionAggregator::new(tree, config)?,
        })
    }

    pub fn run(&self, records: &[RawDetection]) -> Result<ExtractionResult> {
        let start = Instant::now();

        let detections = DetectionSet::from_raw(records, self.tree, self.config.strict())?;
        tracing::info!(
            records = records.len(),
            accepted = detections.len(),
            skipped = detections.skipped().len(),
            channels = detections.channels().len(),
            "Detections normalized"
        );

        let order = ChannelOrder::new(self.config.channel_priority(), detections.channels());
        let merger = ChannelMerger::new(self.config, order);
        let merged = merger.merge(&detections);
        tracing::info!(
            detections = detections.len(),
            merged = merged.len(),
            overlaps = merged.all().iter().filter(|m| m.is_overlap()).count(),
            "Channels merged"
        );

        let channels = merger.order().channels();
        let rows = self.aggregator.aggregate(&detections, &merged, channels)?;

        let overlap_classes = merged.overlap_classes(merger.order());

        tracing::info!(
            regions = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Regions aggregated"
        );

        Ok(ExtractionResult {
            rows,
            channels: channels.to_vec(),
            overlap_classes,
            skipped: detections.skipped().to_vec(),
        })
    }
}

/// Validates `config`, builds the ontology and runs one extraction.
///
/// Configuration errors are reported before the ontology or any record is examined.
pub fn run(
    ontology: &OntologySource,
    records: &[RawDetection],
    config: &RawConfig,
) -> Result<ExtractionResult> {
    let config = config.validate()?;
    let tree = OntologyTree::from_source(ontology)?;
    tracing::info!(regions = tree.len(), root = %tree.root().id, "Ontology loaded");
    ExtractionPipeline::new(&tree, &config)?.run(records)
}
