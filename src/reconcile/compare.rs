//! Comparison of two search runs by title.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::Record;

/// How a record changed between the old and the new search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonNote {
    Add,
    Remove,
    Unchanged,
}

/// A record annotated with its comparison note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparedRecord {
    #[serde(flatten)]
    pub record: Record,
    pub note: ComparisonNote,
}

fn title_key(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Compare a new search result against an older one.
///
/// Old records come first in their original order, noted `Remove` when the new
/// search no longer contains their title. New records whose title was not in
/// the old search follow, noted `Add`.
pub fn compare_searches(new: &[Record], old: &[Record]) -> Vec<ComparedRecord> {
    let new_titles: HashSet<String> = new.iter().map(|r| title_key(&r.title)).collect();
    let old_titles: HashSet<String> = old.iter().map(|r| title_key(&r.title)).collect();

    let mut compared: Vec<ComparedRecord> = old
        .iter()
        .map(|record| ComparedRecord {
            note: if new_titles.contains(&title_key(&record.title)) {
                ComparisonNote::Unchanged
            } else {
                ComparisonNote::Remove
            },
            record: record.clone(),
        })
        .collect();

    compared.extend(
        new.iter()
            .filter(|r| !old_titles.contains(&title_key(&r.title)))
            .map(|record| ComparedRecord {
                record: record.clone(),
                note: ComparisonNote::Add,
            }),
    );

    let added = compared.iter().filter(|c| c.note == ComparisonNote::Add).count();
    let removed = compared.iter().filter(|c| c.note == ComparisonNote::Remove).count();
    tracing::info!("Search comparison: {} added, {} removed", added, removed);

    compared
}
