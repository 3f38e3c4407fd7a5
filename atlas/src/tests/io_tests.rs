use std::path::{Path, PathBuf};

use super::fixtures;
use crate::io::{load_config, load_ontology, write_result};
use crate::ontology::OntologySource;
use crate::pipeline::run;
use crate::result::ExtractionResult;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("atlas_{}_{name}", std::process::id()))
}

#[test]
fn loads_fixtures() -> anyhow::Result<()> {
    let (ontology, records, config) = fixtures()?;
    assert!(matches!(ontology, OntologySource::Nested(_)));
    assert_eq!(records.len(), 7);
    assert_eq!(records[0].measurements["Area"], 100.0);
    assert_eq!(config.channel_priority, vec!["cfos", "arc"]);
    assert!(config.validate().is_ok());
    Ok(())
}

#[test]
fn missing_or_unsupported_files_fail_with_context() {
    let missing = load_ontology(Path::new("../test_resources/missing.yml"));
    let message = format!("{:#}", missing.unwrap_err());
    assert!(message.contains("Failed to load ontology"), "{message}");
    assert!(message.contains("missing.yml"), "{message}");

    assert!(load_config(Path::new("../test_resources/config.toml")).is_err());
}

#[test]
fn writes_table_and_structured_output() -> anyhow::Result<()> {
    let (ontology, records, config) = fixtures()?;
    let result = run(&ontology, &records, &config)?;

    let tsv = temp_path("result.tsv");
    write_result(&result, &tsv)?;
    let table = std::fs::read_to_string(&tsv)?;
    std::fs::remove_file(&tsv)?;
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), result.rows.len() + 1);
    assert!(lines[0].starts_with("regionId\tregionName\tdepth\texcluded\tarea\tcountMerged\tcount cfos\tcount arc\tcount cfos~arc"));
    assert!(lines[1].starts_with("root\tWhole brain\t0\tfalse\t15\t5\t"));

    let csv = temp_path("result.csv");
    write_result(&result, &csv)?;
    let table = std::fs::read_to_string(&csv)?;
    std::fs::remove_file(&csv)?;
    assert!(table.lines().nth(1).unwrap_or_default().starts_with("root,Whole brain,0,false,15,5,"));

    let json = temp_path("result.json");
    write_result(&result, &json)?;
    let back: ExtractionResult = common::serde::load_file(&json)?;
    std::fs::remove_file(&json)?;
    assert_eq!(back, result);
    Ok(())
}
