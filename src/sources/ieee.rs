//! IEEE Xplore export-file source.
//!
//! The IEEE query is run by hand on the Xplore website and the results are
//! exported; this source imports those exports. A path may point at a single
//! CSV or JSON export or at a directory of them.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::models::DatabaseId;
use crate::normalize::{IeeeRaw, RawRecord};
use crate::sources::{Source, SourceError};

/// Export file formats offered by IEEE Xplore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// IEEE Xplore file-import source
#[derive(Debug, Clone)]
pub struct IeeeFileSource {
    path: PathBuf,
}

impl IeeeFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Export files in name order, with their format
    async fn export_files(&self) -> Result<Vec<(PathBuf, ExportFormat)>, SourceError> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        if metadata.is_file() {
            let format = ExportFormat::from_path(&self.path).unwrap_or_else(|| {
                tracing::warn!(
                    "Unrecognized IEEE export extension on {}, reading it as JSON",
                    self.path.display()
                );
                ExportFormat::Json
            });
            return Ok(vec![(self.path.clone(), format)]);
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match ExportFormat::from_path(&path) {
                Some(format) => files.push((path, format)),
                None => tracing::warn!("Skipping {}: not a CSV or JSON export", path.display()),
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    fn parse_export(
        content: &str,
        path: &Path,
        format: ExportFormat,
    ) -> Result<Vec<IeeeRaw>, SourceError> {
        let content = content.trim_start_matches('\u{feff}');
        match format {
            ExportFormat::Json => serde_json::from_str(content).map_err(|e| {
                SourceError::Parse(format!("Invalid IEEE export {}: {}", path.display(), e))
            }),
            ExportFormat::Csv => csv::ReaderBuilder::new()
                .flexible(true)
                .trim(csv::Trim::All)
                .from_reader(content.as_bytes())
                .deserialize()
                .collect::<Result<Vec<IeeeRaw>, _>>()
                .map_err(|e| {
                    SourceError::Parse(format!("Invalid IEEE export {}: {}", path.display(), e))
                }),
        }
    }
}

#[async_trait]
impl Source for IeeeFileSource {
    fn id(&self) -> &str {
        "ieee"
    }

    fn database(&self) -> DatabaseId {
        DatabaseId::Ieee
    }

    async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<RawRecord>, SourceError> {
        tracing::debug!(
            "IEEE records are imported from {}; run this query on IEEE Xplore: {}",
            self.path.display(),
            query
        );

        let mut records = Vec::new();
        for (file, format) in self.export_files().await? {
            let content = tokio::fs::read_to_string(&file).await?;
            let rows = Self::parse_export(&content, &file, format)?;
            tracing::debug!("IEEE: {} rows in {}", rows.len(), file.display());
            records.extend(rows.into_iter().map(RawRecord::Ieee));
        }

        if let Some(max) = max_results {
            records.truncate(max);
        }

        tracing::info!("IEEE: imported {} records", records.len());
        Ok(records)
    }
}
