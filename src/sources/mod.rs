//! Source collaborators: fetch raw records for a composed query.
//!
//! Each bibliographic database is reached through a [`Source`]. Sources only
//! fetch; they return source-native [`RawRecord`]s and leave normalization to
//! [`crate::normalize`]. The [`SourceRegistry`] maps databases to sources and
//! runs the per-database searches concurrently.
//!
//! | Database | Source | Transport |
//! |---|---|---|
//! | PubMed | [`PubMedSource`] | NCBI E-utilities (`esearch` + `efetch`, XML) |
//! | ACM | [`AcmSource`] | scraped `dl.acm.org` search result pages |
//! | IEEE | [`IeeeFileSource`] | IEEE Xplore export files (CSV or JSON) |

mod acm;
mod ieee;
pub mod mock;
mod pubmed;
mod registry;

pub use acm::AcmSource;
pub use ieee::IeeeFileSource;
pub use mock::MockSource;
pub use pubmed::PubMedSource;
pub use registry::SourceRegistry;

use async_trait::async_trait;

use crate::models::DatabaseId;
use crate::normalize::RawRecord;

/// The Source trait defines the interface for all bibliographic sources.
///
/// # Implementing a New Source
///
/// 1. Create a struct that implements `Source`
/// 2. Return raw records of a shape that implements [`crate::normalize::Normalize`]
/// 3. Register it with [`SourceRegistry::register`]
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "pubmed")
    fn id(&self) -> &str;

    /// Database this source searches
    fn database(&self) -> DatabaseId;

    /// Run a composed query and return at most `max_results` raw records
    async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<RawRecord>, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML, JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Server-side failure (5xx)
    #[error("Server error: status {0}")]
    Server(u16),

    /// No source registered for a database
    #[error("No source registered for database '{0}'")]
    NotFound(String),

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::DeError> for SourceError {
    fn from(err: quick_xml::DeError) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}
