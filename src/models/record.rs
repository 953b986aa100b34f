//! Canonical publication record shared by every source.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The bibliographic database a query targets or a record came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatabaseId {
    PubMed,
    Acm,
    Ieee,
    Other(String),
}

impl DatabaseId {
    /// Parse a database name case-insensitively
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "pubmed" => DatabaseId::PubMed,
            "acm" | "acm digital library" => DatabaseId::Acm,
            "ieee" | "ieee xplore" | "ieee_xplore" => DatabaseId::Ieee,
            _ => DatabaseId::Other(name.trim().to_string()),
        }
    }

    /// Returns the display name of the database
    pub fn name(&self) -> &str {
        match self {
            DatabaseId::PubMed => "PubMed",
            DatabaseId::Acm => "ACM",
            DatabaseId::Ieee => "IEEE",
            DatabaseId::Other(s) => s,
        }
    }

    /// Returns the lowercase identifier used for lookups and file names
    pub fn id(&self) -> String {
        self.name().to_lowercase()
    }
}

impl std::fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<String> for DatabaseId {
    fn from(name: String) -> Self {
        DatabaseId::parse(&name)
    }
}

impl From<&str> for DatabaseId {
    fn from(name: &str) -> Self {
        DatabaseId::parse(name)
    }
}

impl From<DatabaseId> for String {
    fn from(id: DatabaseId) -> Self {
        id.name().to_string()
    }
}

/// A publication after normalization.
///
/// Optional fields are `None` when the source did not provide them, never an
/// empty string. `is_duplicate` and `screening_sample` are only set by the
/// reconciliation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Publication title
    pub title: String,

    /// Authors in publication order
    #[serde(default)]
    pub authors: Vec<String>,

    /// Abstract text
    #[serde(default)]
    pub r#abstract: Option<String>,

    /// Author / indexing keywords
    #[serde(default)]
    pub keywords: BTreeSet<String>,

    /// Publication year
    #[serde(default)]
    pub year: Option<i32>,

    /// Digital Object Identifier (bare form, e.g. `10.1145/123`)
    #[serde(default)]
    pub doi: Option<String>,

    /// Database the record was retrieved from
    pub source: DatabaseId,

    /// Journal, proceedings or book title
    #[serde(default)]
    pub journal: Option<String>,

    /// Publication date as reported by the source (e.g. "Mar 2021")
    #[serde(default)]
    pub published_date: Option<String>,

    /// Landing page URL
    #[serde(default)]
    pub url: Option<String>,

    /// Citation count
    #[serde(default)]
    pub citations: Option<u32>,

    /// Source-specific identifier (PMID, ACM id, IEEE article number)
    #[serde(default)]
    pub source_id: Option<String>,

    /// Shares its DOI with another record, or has no DOI at all
    #[serde(default)]
    pub is_duplicate: bool,

    /// Drawn into the pilot screening sample
    #[serde(default)]
    pub screening_sample: bool,
}

impl Record {
    /// Create a new record with the mandatory fields
    pub fn new(title: impl Into<String>, source: DatabaseId) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            r#abstract: None,
            keywords: BTreeSet::new(),
            year: None,
            doi: None,
            source,
            journal: None,
            published_date: None,
            url: None,
            citations: None,
            source_id: None,
            is_duplicate: false,
            screening_sample: false,
        }
    }

    /// DOI key used for duplicate grouping (trimmed, lowercase)
    pub fn doi_key(&self) -> Option<String> {
        self.doi
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_lowercase)
    }

    /// Authors joined for display
    pub fn author_line(&self) -> String {
        self.authors.join(", ")
    }
}

/// Builder for constructing Record objects
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: Record,
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl RecordBuilder {
    /// Create a new builder with the mandatory fields
    pub fn new(title: impl Into<String>, source: DatabaseId) -> Self {
        Self {
            record: Record::new(title, source),
        }
    }

    /// Set authors; blank names are dropped
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.authors = authors.into_iter().filter_map(non_empty).collect();
        self
    }

    /// Set abstract
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.record.r#abstract = non_empty(abstract_text);
        self
    }

    /// Set keywords; blank keywords are dropped
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.keywords = keywords.into_iter().filter_map(non_empty).collect();
        self
    }

    /// Set publication year
    pub fn year(mut self, year: impl Into<Option<i32>>) -> Self {
        self.record.year = year.into();
        self
    }

    /// Set DOI
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.record.doi = non_empty(doi);
        self
    }

    /// Set journal / book title
    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.record.journal = non_empty(journal);
        self
    }

    /// Set publication date
    pub fn published_date(mut self, date: impl Into<String>) -> Self {
        self.record.published_date = non_empty(date);
        self
    }

    /// Set URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.record.url = non_empty(url);
        self
    }

    /// Set citation count
    pub fn citations(mut self, count: impl Into<Option<u32>>) -> Self {
        self.record.citations = count.into();
        self
    }

    /// Set the source-specific identifier
    pub fn source_id(mut self, id: impl Into<String>) -> Self {
        self.record.source_id = non_empty(id);
        self
    }

    /// Build the Record
    pub fn build(self) -> Record {
        self.record
    }
}
