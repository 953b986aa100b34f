//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::DatabaseId;
use crate::normalize::RawRecord;
use crate::sources::{Source, SourceError};

/// A source that returns predefined raw records and remembers the queries it saw.
#[derive(Debug)]
pub struct MockSource {
    database: DatabaseId,
    records: Mutex<Vec<RawRecord>>,
    queries: Mutex<Vec<String>>,
}

impl MockSource {
    /// Create a new mock source for a database.
    pub fn new(database: DatabaseId) -> Self {
        Self {
            database,
            records: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock source that returns the given records.
    pub fn with_records(database: DatabaseId, records: Vec<RawRecord>) -> Self {
        let source = Self::new(database);
        source.set_records(records);
        source
    }

    /// Set the records to return.
    pub fn set_records(&self, records: Vec<RawRecord>) {
        let mut guard = self.records.lock().unwrap_or_else(|p| p.into_inner());
        *guard = records;
    }

    /// Queries received so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn database(&self) -> DatabaseId {
        self.database.clone()
    }

    async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<RawRecord>, SourceError> {
        self.queries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(query.to_string());

        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        if let Some(max) = max_results {
            records.truncate(max);
        }
        Ok(records)
    }
}
