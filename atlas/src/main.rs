use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

const USAGE: &str = "usage: atlas <ontology> <detections> <config> <output>";

fn main() -> Result<()> {
    common::log_setup::setup_logging("info", Path::new("logs"), "atlas")?;

    let args: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    let [ontology, detections, config, output] = args.as_slice() else {
        bail!("{USAGE}");
    };

    let ontology = atlas::io::load_ontology(ontology)?;
    let records = atlas::io::load_detections(detections)?;
    let config = atlas::io::load_config(config)?;

    let result = atlas::run(&ontology, &records, &config).context("Extraction failed")?;

    if !result.skipped.is_empty() {
        tracing::warn!(count = result.skipped.len(), "Records skipped");
    }
    tracing::info!(
        rows = result.rows.len(),
        merged = result.root().map_or(0, |root| root.count_merged),
        skipped = result.skipped.len(),
        debug = common::is_debug(),
        "Extraction finished"
    );

    atlas::io::write_result(&result, output)?;
    tracing::info!(output = %output.display(), "Result written");
    Ok(())
}
