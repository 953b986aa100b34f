//! Result normalization: maps each source's native record shape onto [`Record`].
//!
//! One raw type per source ([`PubMedRaw`], [`AcmRaw`], [`IeeeRaw`]) implements
//! [`Normalize`]. [`RawRecord`] carries any of them through the scraper
//! boundary and [`normalize_batch`] turns a mixed batch into records,
//! skipping the ones that cannot be normalized.

mod acm;
mod ieee;
mod pubmed;

pub use acm::{AcmAuthors, AcmRaw};
pub use ieee::IeeeRaw;
pub use pubmed::{AbstractSection, PubMedAuthor, PubMedRaw};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::MalformedRecordError;
use crate::models::{DatabaseId, Record};

/// A source-native record shape that maps onto the canonical [`Record`]
pub trait Normalize {
    /// Database the raw shape comes from
    fn database(&self) -> DatabaseId;

    /// Map onto a canonical record; fails only when a mandatory field is missing
    fn normalize(self) -> Result<Record, MalformedRecordError>;
}

/// A raw record from any supported source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum RawRecord {
    PubMed(PubMedRaw),
    Acm(AcmRaw),
    Ieee(IeeeRaw),
}

impl Normalize for RawRecord {
    fn database(&self) -> DatabaseId {
        match self {
            RawRecord::PubMed(raw) => raw.database(),
            RawRecord::Acm(raw) => raw.database(),
            RawRecord::Ieee(raw) => raw.database(),
        }
    }

    fn normalize(self) -> Result<Record, MalformedRecordError> {
        match self {
            RawRecord::PubMed(raw) => raw.normalize(),
            RawRecord::Acm(raw) => raw.normalize(),
            RawRecord::Ieee(raw) => raw.normalize(),
        }
    }
}

impl From<PubMedRaw> for RawRecord {
    fn from(raw: PubMedRaw) -> Self {
        RawRecord::PubMed(raw)
    }
}

impl From<AcmRaw> for RawRecord {
    fn from(raw: AcmRaw) -> Self {
        RawRecord::Acm(raw)
    }
}

impl From<IeeeRaw> for RawRecord {
    fn from(raw: IeeeRaw) -> Self {
        RawRecord::Ieee(raw)
    }
}

/// Normalize a single raw record
pub fn normalize_record(raw: impl Normalize) -> Result<Record, MalformedRecordError> {
    raw.normalize()
}

/// Records produced from one raw batch, plus the number that were skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<Record>,
    pub skipped: usize,
}

/// Normalize a batch in order.
///
/// Malformed records are logged and skipped; the batch itself never fails.
pub fn normalize_batch<I, R>(raw_records: I) -> NormalizedBatch
where
    I: IntoIterator<Item = R>,
    R: Normalize,
{
    let mut batch = NormalizedBatch::default();

    for (index, raw) in raw_records.into_iter().enumerate() {
        match raw.normalize() {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                tracing::warn!("Skipping record {}: {}", index, e);
                batch.skipped += 1;
            }
        }
    }

    if batch.skipped > 0 {
        tracing::info!(
            "Normalized {} records, skipped {} malformed",
            batch.records.len(),
            batch.skipped
        );
    }

    batch
}

fn doi_pattern() -> Option<&'static Regex> {
    static DOI: OnceLock<Option<Regex>> = OnceLock::new();
    DOI.get_or_init(|| Regex::new(r"10\.\d{4,9}/\S+").ok()).as_ref()
}

fn year_pattern() -> Option<&'static Regex> {
    static YEAR: OnceLock<Option<Regex>> = OnceLock::new();
    YEAR.get_or_init(|| Regex::new(r"\b\d{4}\b").ok()).as_ref()
}

/// Extract a bare DOI from text such as `https://doi.org/10.1145/1`, `doi:10.1/x`
pub fn extract_doi(text: &str) -> Option<String> {
    let found = doi_pattern()?.find(text)?;
    let doi = found.as_str().trim_end_matches(&['.', ',', ';'][..]);
    Some(doi.to_string())
}

/// First four-digit number in a date text such as `Mar 2021`
pub fn extract_year(text: &str) -> Option<i32> {
    year_pattern()?.find(text)?.as_str().parse().ok()
}

/// Trimmed text, or `None` if nothing is left
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Split a delimited list, dropping blank entries
pub(crate) fn split_list(value: Option<&str>, delimiter: char) -> Vec<String> {
    value
        .map(|v| {
            v.split(delimiter)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
