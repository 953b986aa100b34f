//! ACM Digital Library search results.

use serde::{Deserialize, Serialize};

use super::{extract_doi, extract_year, present, split_list, Normalize};
use crate::error::MalformedRecordError;
use crate::models::{DatabaseId, Record, RecordBuilder};

/// Author field as delivered by ACM: a comma-separated line or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AcmAuthors {
    Line(String),
    List(Vec<String>),
}

impl Default for AcmAuthors {
    fn default() -> Self {
        AcmAuthors::List(Vec::new())
    }
}

impl AcmAuthors {
    fn names(&self) -> Vec<String> {
        match self {
            AcmAuthors::Line(line) => split_list(Some(line.as_str()), ','),
            AcmAuthors::List(names) => names.clone(),
        }
    }
}

/// One ACM search result item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcmRaw {
    pub id: Option<String>,
    pub title: Option<String>,
    pub authors: AcmAuthors,
    /// Publication date text, e.g. `Mar 2021`
    #[serde(alias = "date")]
    pub published: Option<String>,
    #[serde(alias = "journal_book")]
    pub journal: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    /// Citation count text, e.g. `1,204`
    #[serde(alias = "citation")]
    pub citations: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

fn parse_count(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

impl Normalize for AcmRaw {
    fn database(&self) -> DatabaseId {
        DatabaseId::Acm
    }

    fn normalize(self) -> Result<Record, MalformedRecordError> {
        let title = present(self.title.as_deref())
            .ok_or_else(|| MalformedRecordError::missing_title(DatabaseId::Acm))?;

        let doi = self.doi.as_deref().and_then(extract_doi);
        let url = present(self.url.as_deref())
            .map(str::to_string)
            .or_else(|| doi.as_ref().map(|d| format!("https://dl.acm.org/doi/{}", d)));

        Ok(RecordBuilder::new(title, DatabaseId::Acm)
            .authors(self.authors.names())
            .abstract_text(self.abstract_text.clone().unwrap_or_default())
            .year(self.published.as_deref().and_then(extract_year))
            .published_date(self.published.clone().unwrap_or_default())
            .journal(self.journal.clone().unwrap_or_default())
            .doi(doi.unwrap_or_default())
            .url(url.unwrap_or_default())
            .citations(self.citations.as_deref().and_then(parse_count))
            .source_id(self.id.clone().unwrap_or_default())
            .build())
    }
}
