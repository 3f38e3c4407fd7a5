//! Error types for ontology loading, detection normalization and aggregation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Structural defects found while building an ontology.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OntologyDefect {
    #[error("region id is empty")]
    EmptyId,

    #[error("duplicate region id '{0}'")]
    DuplicateId(String),

    #[error("region '{id}' declares missing parent '{parent}'")]
    MissingParent { id: String, parent: String },

    #[error("no root region declared")]
    NoRoot,

    #[error("several root regions declared: {}", .0.join(", "))]
    MultipleRoots(Vec<String>),

    #[error("regions unreachable from the root (cycle): {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("region '{id}' has invalid area {area}")]
    InvalidArea { id: String, area: f64 },
}

/// What is wrong with a single detection record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RecordProblem {
    /// The region id is not part of the ontology.
    UnknownRegion,
    /// The region exists but has children; detections belong to leaves only.
    NotALeaf,
    InvalidMeasurement { measurement: String, value: f64 },
    InvalidGeometry { reason: String },
}

/// A detection record rejected during normalization, identified by its input position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordError {
    pub index: usize,
    pub region_id: String,
    pub channel_id: String,
    pub problem: RecordProblem,
}

impl RecordError {
    /// Promotes the record failure to a run-level error (strict mode).
    pub fn into_error(self) -> Error {
        match self.problem {
            RecordProblem::UnknownRegion | RecordProblem::NotALeaf => Error::UnknownRegion(self),
            RecordProblem::InvalidMeasurement { .. } => Error::InvalidMeasurement(self),
            RecordProblem::InvalidGeometry { .. } => Error::InvalidGeometry(self),
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record #{} (region '{}', channel '{}'): ",
            self.index, self.region_id, self.channel_id
        )?;
        match &self.problem {
            RecordProblem::UnknownRegion => write!(f, "unknown region"),
            RecordProblem::NotALeaf => write!(f, "region is not a leaf"),
            RecordProblem::InvalidMeasurement { measurement, value } => {
                write!(f, "measurement '{measurement}' is not finite ({value})")
            }
            RecordProblem::InvalidGeometry { reason } => write!(f, "invalid geometry: {reason}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed ontology: {0}")]
    MalformedOntology(#[from] OntologyDefect),

    #[error("Unknown region in {0}")]
    UnknownRegion(RecordError),

    #[error("Invalid measurement in {0}")]
    InvalidMeasurement(RecordError),

    #[error("Invalid geometry in {0}")]
    InvalidGeometry(RecordError),

    #[error("Unknown reducer '{name}' configured for measurement '{measurement}'")]
    UnknownReducer { measurement: String, name: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Required measurement '{measurement}' missing from a detection in region '{region_id}'")]
    MissingMeasurement {
        region_id: String,
        measurement: String,
    },
}
