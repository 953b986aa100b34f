//! Reading and writing record files.
//!
//! A run writes one pretty-printed JSON array per reconciliation, named
//! `<YYYY-mm-dd_HHMMSS>_complete_articles.json`, where every record carries a
//! 0-based `article_id`.

use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::models::Record;

const RECORDS_FILE_SUFFIX: &str = "complete_articles.json";

/// Errors from reading or writing record files
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct NumberedRecord<'a> {
    article_id: usize,
    #[serde(flatten)]
    record: &'a Record,
}

/// File name for a record set written now
pub fn records_file_name() -> String {
    format!(
        "{}_{}",
        Local::now().format("%Y-%m-%d_%H%M%S"),
        RECORDS_FILE_SUFFIX
    )
}

/// Write records into a new timestamped file in `dir` and return its path
pub fn write_records(dir: &Path, records: &[Record]) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(records_file_name());

    let numbered: Vec<NumberedRecord<'_>> = records
        .iter()
        .enumerate()
        .map(|(article_id, record)| NumberedRecord { article_id, record })
        .collect();
    write_json(&path, &numbered)?;

    tracing::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(path)
}

/// Read a record file; `article_id` fields are ignored
pub fn read_records(path: &Path) -> Result<Vec<Record>, ExportError> {
    let content = std::fs::read_to_string(path)?;
    let records: Vec<Record> = serde_json::from_str(&content)?;
    tracing::debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Write any serializable value as pretty JSON
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}
