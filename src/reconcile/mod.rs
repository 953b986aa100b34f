//! Record reconciliation: merges normalized batches into one record set,
//! applies the year and count filters, flags duplicates and draws the
//! pilot screening sample.

mod compare;

pub use compare::{compare_searches, ComparedRecord, ComparisonNote};

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConfigError;
use crate::models::{QuerySpec, Record};

/// Year and count limits applied after merging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub max_results: Option<usize>,
}

impl Filters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.start_year, self.end_year) {
            (Some(start), Some(end)) if start > end => {
                Err(ConfigError::InvalidYearRange { start, end })
            }
            _ => Ok(()),
        }
    }

    /// Records without a year are never dropped by the year filter
    fn keeps_year(&self, year: Option<i32>) -> bool {
        let Some(year) = year else {
            return true;
        };
        self.start_year.map_or(true, |start| year >= start)
            && self.end_year.map_or(true, |end| year <= end)
    }
}

impl From<&QuerySpec> for Filters {
    fn from(spec: &QuerySpec) -> Self {
        Self {
            start_year: spec.start_year,
            end_year: spec.end_year,
            max_results: spec.max_results,
        }
    }
}

/// Whether a screening sample is drawn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreeningMode {
    #[default]
    None,
    Pilot,
}

/// Screening sample settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningConfig {
    pub mode: ScreeningMode,
    pub nr_randomizations: usize,
}

impl ScreeningConfig {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn pilot(nr_randomizations: usize) -> Self {
        Self {
            mode: ScreeningMode::Pilot,
            nr_randomizations,
        }
    }
}

/// Merge record batches into the final record set.
///
/// Batches are concatenated in order, filtered by year, truncated to
/// `max_results`, then flagged for duplicates and screening. Fails without
/// returning records when the filters are invalid or the screening sample is
/// larger than the filtered population.
pub fn reconcile<R>(
    batches: Vec<Vec<Record>>,
    filters: &Filters,
    screening: &ScreeningConfig,
    rng: &mut R,
) -> Result<Vec<Record>, ConfigError>
where
    R: Rng + ?Sized,
{
    filters.validate()?;

    let input: usize = batches.iter().map(Vec::len).sum();
    let mut records: Vec<Record> = batches
        .into_iter()
        .flatten()
        .filter(|r| filters.keeps_year(r.year))
        .collect();
    let after_years = records.len();

    if let Some(max) = filters.max_results {
        records.truncate(max);
    }

    let duplicates = mark_duplicates(&mut records);

    let sampled = match screening.mode {
        ScreeningMode::None => {
            records.iter_mut().for_each(|r| r.screening_sample = false);
            0
        }
        ScreeningMode::Pilot => {
            draw_screening_sample(&mut records, screening.nr_randomizations, rng)?
        }
    };

    tracing::info!(
        "Reconciled {} records into {} (year filter kept {}, {} flagged duplicate, {} sampled for screening)",
        input,
        records.len(),
        after_years,
        duplicates,
        sampled
    );

    Ok(records)
}

/// Flag every record that shares its DOI with another record, and every record
/// without a DOI. DOIs are compared case-insensitively. Returns the number flagged.
pub fn mark_duplicates(records: &mut [Record]) -> usize {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for key in records.iter().filter_map(Record::doi_key) {
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut flagged = 0;
    for record in records.iter_mut() {
        record.is_duplicate = match record.doi_key() {
            Some(key) => counts.get(&key).copied().unwrap_or(0) > 1,
            None => true,
        };
        if record.is_duplicate {
            flagged += 1;
        }
    }

    tracing::debug!("{} of {} records flagged as duplicate", flagged, records.len());
    flagged
}

/// Flag exactly `size` records, drawn uniformly without replacement
pub fn draw_screening_sample<R>(
    records: &mut [Record],
    size: usize,
    rng: &mut R,
) -> Result<usize, ConfigError>
where
    R: Rng + ?Sized,
{
    if size > records.len() {
        return Err(ConfigError::ScreeningSampleTooLarge {
            requested: size,
            population: records.len(),
        });
    }

    records.iter_mut().for_each(|r| r.screening_sample = false);
    for index in rand::seq::index::sample(rng, records.len(), size) {
        records[index].screening_sample = true;
    }

    Ok(size)
}
