use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::file_format::FileFormat;
use crate::normalize_string::NormalizeString;

pub type Result<T> = anyhow::Result<T>;

pub fn serialize<T: Serialize>(value: &T, format: FileFormat) -> Result<String> {
    let text = match format {
        FileFormat::Yaml => serde_yml::to_string(value)?,
        FileFormat::Json => serde_json::to_string_pretty(value)?,
    };
    Ok(text.normalize())
}

pub fn deserialize<T: DeserializeOwned>(serialized: &str, format: FileFormat) -> Result<T> {
    match format {
        FileFormat::Yaml => Ok(serde_yml::from_str(serialized)?),
        FileFormat::Json => Ok(serde_json::from_str(serialized)?),
    }
}

/// Reads `path` and deserializes it in the format implied by its extension.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = FileFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    deserialize(&text, format).with_context(|| format!("Failed to parse '{}'", path.display()))
}

/// Serializes `value` in the format implied by the extension of `path` and writes it.
pub fn save_file<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let format = FileFormat::from_path(path)?;
    let text = serialize(value, format)?;
    std::fs::write(path, text).with_context(|| format!("Failed to write '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: String,
        values: BTreeMap<String, f64>,
    }

    fn sample() -> Sample {
        Sample {
            id: "CA1".to_string(),
            values: BTreeMap::from([("area".to_string(), 12.5), ("intensity".to_string(), 3.0)]),
        }
    }

    #[test]
    fn yaml_and_json_roundtrip() -> anyhow::Result<()> {
        for format in [FileFormat::Yaml, FileFormat::Json] {
            let text = serialize(&sample(), format)?;
            assert!(text.ends_with('\n'));
            let back: Sample = deserialize(&text, format)?;
            assert_eq!(back, sample());
        }
        Ok(())
    }

    #[test]
    fn serialization_is_stable() -> anyhow::Result<()> {
        let first = serialize(&sample(), FileFormat::Json)?;
        let second = serialize(&sample(), FileFormat::Json)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn load_file_rejects_unknown_extension() {
        let err = load_file::<Sample>(Path::new("sample.toml")).unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension"));
    }
}
