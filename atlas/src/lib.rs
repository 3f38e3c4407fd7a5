//! Atlas - region aggregation over anatomical ontologies.
//!
//! Per-object detections from several imaging channels are assigned to the
//! leaf regions of a region hierarchy, reconciled across channels, and rolled
//! up into one row per region:
//! - Ontology loading (nested or flat) with structural validation
//! - Detection normalization with strict or lenient handling of bad records
//! - Cross-channel merging as connected components of an overlap graph
//! - Post-order aggregation of counts, measurements and densities
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use atlas::{OntologyTree, ExtractionPipeline, RawConfig};
//!
//! let tree = OntologyTree::from_source(&atlas::io::load_ontology(path)?)?;
//! let config = RawConfig::default().validate()?;
//! let result = ExtractionPipeline::new(&tree, &config)?.run(&records)?;
//!
//! println!("{} objects in the whole brain", result.root().unwrap().count_merged);
//! ```

pub mod aggregate;
pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod io;
pub mod merge;
pub mod ontology;
pub mod pipeline;
pub mod result;
pub(crate) mod spatial;

#[cfg(test)]
mod tests;

// ============================================================================
// Errors
// ============================================================================

pub use error::{Error, OntologyDefect, RecordError, RecordProblem, Result};

// ============================================================================
// Inputs
// ============================================================================

pub use config::{
    Aggregation, DensityWeighting, ExtractionConfig, OverlapMetric, OverlapRule, RawConfig,
    Reducer,
};
pub use detection::{Detection, DetectionSet, RawDetection};
pub use geometry::{BoundingBox, Geometry, Point};
pub use ontology::{FlatRegion, OntologySource, OntologyTree, Region, RegionSource};

// ============================================================================
// Stages
// ============================================================================

pub use aggregate::RegionAggregator;
pub use merge::{
    overlap_class_names, ChannelMerger, ChannelOrder, MergedDetection, MergedSet,
    OVERLAP_DELIMITER,
};
pub use pipeline::{run, ExtractionPipeline};
pub use result::{ExtractionResult, RegionResult};
