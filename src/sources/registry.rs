//! Registry mapping databases to their sources.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;

use super::{AcmSource, IeeeFileSource, PubMedSource, Source, SourceError};
use crate::models::DatabaseId;
use crate::normalize::RawRecord;

/// Registry for the available bibliographic sources
///
/// Holds one source per database; registering a second source for the same
/// database replaces the first.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<DatabaseId, Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the PubMed and ACM API sources, plus the IEEE file import
    /// when an export path is given
    pub fn with_defaults(ieee_export: Option<PathBuf>) -> Result<Self, SourceError> {
        let mut registry = Self::new();

        registry.register(Arc::new(PubMedSource::new()?));
        registry.register(Arc::new(AcmSource::new()?));
        if let Some(path) = ieee_export {
            registry.register(Arc::new(IeeeFileSource::new(path)));
        }

        Ok(registry)
    }

    /// Register a new source
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.database(), source);
    }

    /// Get the source for a database
    pub fn get(&self, database: &DatabaseId) -> Option<&Arc<dyn Source>> {
        self.sources.get(database)
    }

    /// Get the source for a database, returning an error if none is registered
    pub fn get_required(&self, database: &DatabaseId) -> Result<&Arc<dyn Source>, SourceError> {
        self.get(database)
            .ok_or_else(|| SourceError::NotFound(database.to_string()))
    }

    /// Registered databases
    pub fn databases(&self) -> impl Iterator<Item = &DatabaseId> {
        self.sources.keys()
    }

    pub fn has(&self, database: &DatabaseId) -> bool {
        self.sources.contains_key(database)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Run every `(database, query)` pair concurrently.
    ///
    /// Results come back in the order of `queries`. The first failing database
    /// fails the whole call.
    pub async fn search_all(
        &self,
        queries: &[(DatabaseId, String)],
        max_results: Option<usize>,
    ) -> Result<Vec<(DatabaseId, Vec<RawRecord>)>, SourceError> {
        let mut tasks = JoinSet::new();

        for (index, (database, query)) in queries.iter().enumerate() {
            let source = Arc::clone(self.get_required(database)?);
            let query = query.clone();
            tasks.spawn(async move { (index, source.search(&query, max_results).await) });
        }

        let mut results: Vec<Option<Vec<RawRecord>>> = vec![None; queries.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, result) =
                joined.map_err(|e| SourceError::Other(format!("Search task failed: {}", e)))?;
            results[index] = Some(result?);
        }

        Ok(queries
            .iter()
            .zip(results)
            .map(|((database, _), records)| (database.clone(), records.unwrap_or_default()))
            .collect())
    }
}
