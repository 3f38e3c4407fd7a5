//! Per-region output rows and their table rendering.

use std::collections::{BTreeMap, BTreeSet};

use common::file_format::TableFormat;
use common::normalize_string::NormalizeString;
use common::FileFormat;
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionResult {
    pub region_id: String,
    pub region_name: String,
    pub depth: usize,
    /// Region or one of its ancestors was listed in `excludedRegions`.
    pub excluded: bool,
    pub area: f64,
    /// Accepted raw detections per channel, before merging.
    pub count_per_channel: BTreeMap<String, u64>,
    /// Merged objects per multi-channel label (`a~b`).
    pub count_per_overlap: BTreeMap<String, u64>,
    pub count_merged: u64,
    pub measurements: BTreeMap<String, f64>,
    /// Merged objects carrying each measurement.
    pub measurement_support: BTreeMap<String, u64>,
}

/// One row per ontology region, in pre-order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub rows: Vec<RegionResult>,
    /// Channels by priority.
    pub channels: Vec<String>,
    /// Multi-channel labels observed in the run, in enumeration order.
    pub overlap_classes: Vec<String>,
    pub skipped: Vec<RecordError>,
}

impl ExtractionResult {
    pub fn row(&self, region_id: &str) -> Option<&RegionResult> {
        self.rows.iter().find(|row| row.region_id == region_id)
    }

    pub fn root(&self) -> Option<&RegionResult> {
        self.rows.first()
    }

    /// Every measurement name appearing in any row.
    pub fn measurement_names(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .flat_map(|row| row.measurements.keys().map(String::as_str))
            .collect()
    }

    pub fn serialize(&self, format: FileFormat) -> anyhow::Result<String> {
        common::serde::serialize(self, format)
    }

    /// Renders the rows as a delimited table with a header line.
    ///
    /// Count columns default to 0; measurements a row does not carry are left empty.
    pub fn to_table(&self, format: TableFormat) -> String {
        let delimiter = format.delimiter();
        let measurements = self.measurement_names();

        let mut header: Vec<String> = [
            "regionId",
            "regionName",
            "depth",
            "excluded",
            "area",
            "countMerged",
        ]
        .iter()
        .map(|name| name.to_string())
        .collect();
        header.extend(self.channels.iter().map(|c| format!("count {c}")));
        header.extend(self.overlap_classes.iter().map(|c| format!("count {c}")));
        header.extend(measurements.iter().map(|m| m.to_string()));

        let mut out = String::new();
        push_line(&mut out, &header, delimiter);

        for row in &self.rows {
            let mut fields = vec![
                row.region_id.clone(),
                row.region_name.clone(),
                row.depth.to_string(),
                row.excluded.to_string(),
                row.area.to_string(),
                row.count_merged.to_string(),
            ];
            fields.extend(
                self.channels
                    .iter()
                    .map(|c| row.count_per_channel.get(c).copied().unwrap_or(0).to_string()),
            );
            fields.extend(
                self.overlap_classes
                    .iter()
                    .map(|c| row.count_per_overlap.get(c).copied().unwrap_or(0).to_string()),
            );
            fields.extend(measurements.iter().map(|&m| {
                row.measurements
                    .get(m)
                    .map(f64::to_string)
                    .unwrap_or_default()
            }));
            push_line(&mut out, &fields, delimiter);
        }

        out.normalize()
    }
}

fn push_line(out: &mut String, fields: &[String], delimiter: char) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        out.push_str(&escape_field(field, delimiter));
    }
    out.push('\n');
}

/// Quotes fields holding the delimiter, a quote or a line break.
fn escape_field(field: &str, delimiter: char) -> String {
    if field.contains([delimiter, '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> ExtractionResult {
        ExtractionResult {
            rows: vec![
                RegionResult {
                    region_id: "root".to_string(),
                    region_name: "Whole, brain".to_string(),
                    depth: 0,
                    area: 10.5,
                    count_per_channel: BTreeMap::from([("cfos".to_string(), 3)]),
                    count_per_overlap: BTreeMap::from([("cfos~arc".to_string(), 1)]),
                    count_merged: 3,
                    measurements: BTreeMap::from([("Intensity".to_string(), 1.5)]),
                    ..RegionResult::default()
                },
                RegionResult {
                    region_id: "A".to_string(),
                    region_name: "Area \"A\"".to_string(),
                    depth: 1,
                    excluded: true,
                    ..RegionResult::default()
                },
            ],
            channels: vec!["cfos".to_string(), "arc".to_string()],
            overlap_classes: vec!["cfos~arc".to_string()],
            skipped: Vec::new(),
        }
    }

    #[test]
    fn tsv_table_layout() {
        let table = result().to_table(TableFormat::Tsv);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(
            lines[0],
            "regionId\tregionName\tdepth\texcluded\tarea\tcountMerged\tcount cfos\tcount arc\tcount cfos~arc\tIntensity"
        );
        assert_eq!(lines[1], "root\tWhole, brain\t0\tfalse\t10.5\t3\t3\t0\t1\t1.5");
        assert_eq!(lines[2], "A\t\"Area \"\"A\"\"\"\t1\ttrue\t0\t0\t0\t0\t0\t");
        assert!(table.ends_with('\n'));
    }

    #[test]
    fn csv_quotes_commas() {
        let table = result().to_table(TableFormat::Csv);
        let root = table.lines().nth(1).unwrap();
        assert!(root.starts_with("root,\"Whole, brain\",0,false,10.5,3,"));
    }

    #[test]
    fn row_lookup() {
        let result = result();
        assert_eq!(result.row("A").unwrap().depth, 1);
        assert!(result.row("Z").is_none());
        assert_eq!(result.root().unwrap().region_id, "root");
    }

    #[test]
    fn serializes_camel_case() {
        let json = result().serialize(FileFormat::Json).unwrap();
        assert!(json.contains("\"regionId\""));
        assert!(json.contains("\"countPerOverlap\""));
        let back: ExtractionResult = common::serde::deserialize(&json, FileFormat::Json).unwrap();
        assert_eq!(back, result());
    }
}
