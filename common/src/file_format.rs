use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum FileExtensionError {
    #[error("Failed to get file extension of '{0}'")]
    MissingFileExtension(String),
    #[error("Unsupported file extension for file: {0}")]
    UnsupportedFileExtension(String),
}

pub type FileFormatResult<T> = Result<T, FileExtensionError>;

pub fn get_file_extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|os_str| os_str.to_str())
}

/// Structured text formats accepted for ontology, detection and configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> FileFormatResult<Self> {
        let display = path.display().to_string();
        let ext = get_file_extension(path)
            .ok_or_else(|| FileExtensionError::MissingFileExtension(display.clone()))?;

        if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") {
            Ok(Self::Yaml)
        } else if ext.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(FileExtensionError::UnsupportedFileExtension(display))
        }
    }
}

/// Delimited table formats the result writer can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    Tsv,
    Csv,
}

impl TableFormat {
    /// `.csv` selects comma separation, everything else falls back to tabs.
    pub fn from_path(path: &Path) -> Self {
        match get_file_extension(path) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Tsv,
        }
    }

    pub fn delimiter(self) -> char {
        match self {
            Self::Tsv => '\t',
            Self::Csv => ',',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_structured_formats() {
        assert_eq!(
            FileFormat::from_path(Path::new("ontology.yml")).unwrap(),
            FileFormat::Yaml
        );
        assert_eq!(
            FileFormat::from_path(Path::new("dir/config.YAML")).unwrap(),
            FileFormat::Yaml
        );
        assert_eq!(
            FileFormat::from_path(Path::new("detections.json")).unwrap(),
            FileFormat::Json
        );
    }

    #[test]
    fn rejects_unknown_extensions() {
        assert!(matches!(
            FileFormat::from_path(Path::new("ontology")),
            Err(FileExtensionError::MissingFileExtension(_))
        ));
        assert!(matches!(
            FileFormat::from_path(Path::new("ontology.xml")),
            Err(FileExtensionError::UnsupportedFileExtension(_))
        ));
    }

    #[test]
    fn table_format_defaults_to_tsv() {
        assert_eq!(TableFormat::from_path(Path::new("out.csv")), TableFormat::Csv);
        assert_eq!(TableFormat::from_path(Path::new("out.tsv")), TableFormat::Tsv);
        assert_eq!(TableFormat::from_path(Path::new("out")), TableFormat::Tsv);
        assert_eq!(TableFormat::Csv.delimiter(), ',');
    }
}
