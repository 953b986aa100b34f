//! Error types shared by the query composer and the reconciliation engine.

use crate::models::DatabaseId;

/// Configuration errors.
///
/// These are never retried: the operation that depends on the configuration
/// (composing a query, reconciling a result set) stops immediately and no
/// partial result is returned.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The database has no syntax definitions at all
    #[error("Database '{0}' not found in the syntax registry")]
    UnknownDatabase(String),

    /// The requested (database, search type) pair has no syntax rule
    #[error("Search type '{search_type}' is not defined for database '{database}'")]
    MissingSyntax {
        database: DatabaseId,
        search_type: String,
    },

    /// A category has no search type binding
    #[error("No search type configured for category '{category}'")]
    MissingSearchType { category: String },

    /// A wrap list that does not match any supported layout
    #[error(
        "Ambiguous wrap list for '{search_type}' in database '{database}': \
         {prefixes} prefix(es) and {suffixes} suffix(es)"
    )]
    AmbiguousWraps {
        database: DatabaseId,
        search_type: String,
        prefixes: usize,
        suffixes: usize,
    },

    /// Two categories share a name (compared case-insensitively)
    #[error("Category '{0}' is declared more than once")]
    DuplicateCategory(String),

    /// More than one category is marked as exclusion
    #[error("Only one exclusion category is allowed, found {0}")]
    MultipleExclusions(usize),

    /// The screening sample is larger than the reconciled population
    #[error("Screening sample of {requested} exceeds the population of {population} records")]
    ScreeningSampleTooLarge { requested: usize, population: usize },

    /// start_year is after end_year
    #[error("Invalid year range: start year {start} is after end year {end}")]
    InvalidYearRange { start: i32, end: i32 },

    /// A configuration document could not be parsed
    #[error("Invalid configuration document: {0}")]
    Document(String),

    /// A configuration document could not be read or written
    #[error("IO error: {0}")]
    Io(String),
}

/// A single raw record that could not be normalized.
///
/// Recovered locally: the record is skipped and the batch continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed {database} record: {reason}")]
pub struct MalformedRecordError {
    pub database: DatabaseId,
    pub reason: String,
}

impl MalformedRecordError {
    pub fn new(database: DatabaseId, reason: impl Into<String>) -> Self {
        Self {
            database,
            reason: reason.into(),
        }
    }

    /// The record has no usable title
    pub fn missing_title(database: DatabaseId) -> Self {
        Self::new(database, "missing title")
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<quick_xml::DeError> for ConfigError {
    fn from(err: quick_xml::DeError) -> Self {
        ConfigError::Document(format!("XML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigError::MissingSyntax {
            database: DatabaseId::Acm,
            search_type: "FullText".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Search type 'FullText' is not defined for database 'ACM'"
        );

        let err = MalformedRecordError::missing_title(DatabaseId::PubMed);
        assert_eq!(err.to_string(), "Malformed PubMed record: missing title");
    }
}
