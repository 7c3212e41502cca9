//! FileCollector - reads JSON / JSON-lines exports from disk

use std::path::{Path, PathBuf};

use contracts::{CandidateRecord, Collector, ContractError, SourceConfig};
use tracing::{debug, instrument};

use crate::error::IngestionError;

/// Export format of a file source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// One JSON array of records
    Json,
    /// One JSON record per line
    JsonLines,
}

impl FileFormat {
    /// Parse the `format` source parameter
    pub fn from_param(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    /// Guess from the file extension, defaulting to a JSON array
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl") | Some("ndjson") => Self::JsonLines,
            _ => Self::Json,
        }
    }
}

/// Reads `params.path`, honouring `params.format` when present
#[derive(Debug, Clone)]
pub struct FileCollector {
    name: String,
}

impl FileCollector {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn resolve(&self, config: &SourceConfig) -> Result<(PathBuf, FileFormat), IngestionError> {
        let path = config
            .params
            .get("path")
            .map(PathBuf::from)
            .ok_or_else(|| IngestionError::SourceParam {
                source_name: self.name.clone(),
                param: "path".to_string(),
                message: "file sources require a path".to_string(),
            })?;

        let format = match config.params.get("format") {
            Some(value) => {
                FileFormat::from_param(value).ok_or_else(|| IngestionError::SourceParam {
                    source_name: self.name.clone(),
                    param: "format".to_string(),
                    message: format!("unsupported format '{value}', expected json or jsonl"),
                })?
            }
            None => FileFormat::from_path(&path),
        };

        Ok((path, format))
    }

    async fn read(&self, config: &SourceConfig) -> Result<Vec<CandidateRecord>, IngestionError> {
        let (path, format) = self.resolve(config)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|error| IngestionError::SourceRead {
                source_name: self.name.clone(),
                path: path.clone(),
                error,
            })?;

        let records = match format {
            FileFormat::Json => self.parse_array(&content)?,
            FileFormat::JsonLines => self.parse_lines(&content)?,
        };
        debug!(
            source = %self.name,
            path = %path.display(),
            records = records.len(),
            "file source read"
        );
        Ok(records)
    }

    fn parse_array(&self, content: &str) -> Result<Vec<CandidateRecord>, IngestionError> {
        serde_json::from_str(content).map_err(|e| IngestionError::SourceParse {
            source_name: self.name.clone(),
            line: Some(e.line()),
            message: e.to_string(),
        })
    }

    fn parse_lines(&self, content: &str) -> Result<Vec<CandidateRecord>, IngestionError> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|e| IngestionError::SourceParse {
                    source_name: self.name.clone(),
                    line: Some(idx + 1),
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

impl Collector for FileCollector {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_collector_produce",
        skip(self, config),
        fields(source = %self.name)
    )]
    async fn produce(&self, config: &SourceConfig) -> Result<Vec<CandidateRecord>, ContractError> {
        Ok(self.read(config).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SourceType;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn file_source(path: &Path, format: Option<&str>) -> SourceConfig {
        let mut params = HashMap::new();
        params.insert("path".to_string(), path.display().to_string());
        if let Some(format) = format {
            params.insert("format".to_string(), format.to_string());
        }
        SourceConfig {
            name: "directory".into(),
            source_type: SourceType::File,
            enabled: true,
            params,
            records: vec![],
        }
    }

    #[tokio::test]
    async fn test_reads_json_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(
            &path,
            r#"[{"name":"Cafe","phone":"+351 912 000 111","city":"Porto"},{"name":"Bar"}]"#,
        )
        .unwrap();

        let collector = FileCollector::new("directory");
        let records = collector.produce(&file_source(&path, None)).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].locality.as_deref(), Some("Porto"));
        assert!(records[1].contact.is_none());
    }

    #[tokio::test]
    async fn test_reads_json_lines_and_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.txt");
        std::fs::write(
            &path,
            "{\"name\":\"A\",\"email\":\"a@x.pt\"}\n\n{\"name\":\"B\",\"email\":\"b@x.pt\"}\n",
        )
        .unwrap();

        let collector = FileCollector::new("directory");
        let records = collector
            .produce(&file_source(&path, Some("jsonl")))
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].contact.as_deref(), Some("b@x.pt"));
    }

    #[tokio::test]
    async fn test_json_lines_error_reports_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.jsonl");
        std::fs::write(&path, "{\"name\":\"A\"}\n{not json}\n").unwrap();

        let err = FileCollector::new("directory")
            .read(&file_source(&path, None))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::SourceParse { line: Some(2), .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_collector_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = FileCollector::new("directory")
            .produce(&file_source(&path, None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::Collector { ref source_name, .. } if source_name == "directory"
        ));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let config = file_source(Path::new("x.csv"), Some("csv"));
        let err = FileCollector::new("directory").resolve(&config).unwrap_err();
        assert!(matches!(
            err,
            IngestionError::SourceParam { ref param, .. } if param == "format"
        ));
    }
}
