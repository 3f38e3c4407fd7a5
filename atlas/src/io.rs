//! File loading and result writing for the binary and for fixtures.

use std::path::Path;

use anyhow::Context;
use common::file_format::TableFormat;
use common::normalize_string::NormalizeString;
use common::FileFormat;

use crate::config::RawConfig;
use crate::detection::RawDetection;
use crate::ontology::OntologySource;
use crate::result::ExtractionResult;

/// Nested or flat ontology, YAML or JSON.
pub fn load_ontology(path: &Path) -> anyhow::Result<OntologySource> {
    common::serde::load_file(path).context("Failed to load ontology")
}

/// A YAML or JSON list of detection records.
pub fn load_detections(path: &Path) -> anyhow::Result<Vec<RawDetection>> {
    common::serde::load_file(path).context("Failed to load detections")
}

pub fn load_config(path: &Path) -> anyhow::Result<RawConfig> {
    common::serde::load_file(path).context("Failed to load configuration")
}

/// Writes `result` as YAML/JSON for `.yaml`/`.yml`/`.json` paths and as a
/// delimited table otherwise (`.csv` comma-separated, anything else tab-separated).
pub fn write_result(result: &ExtractionResult, path: &Path) -> anyhow::Result<()> {
    if FileFormat::from_path(path).is_ok() {
        return common::serde::save_file(result, path);
    }
    let table = result.to_table(TableFormat::from_path(path));
    std::fs::write(path, table.normalize())
        .with_context(|| format!("Failed to write '{}'", path.display()))
}
