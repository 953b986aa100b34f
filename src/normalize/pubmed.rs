//! PubMed E-utilities records.

use serde::{Deserialize, Serialize};

use super::{extract_doi, extract_year, present, Normalize};
use crate::error::MalformedRecordError;
use crate::models::{DatabaseId, Record, RecordBuilder};

const PUBMED_ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// Author entry of an `efetch` article
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubMedAuthor {
    pub fore_name: Option<String>,
    pub last_name: Option<String>,
    pub collective_name: Option<String>,
}

impl PubMedAuthor {
    /// `Fore Last`, or the collective name for group authors
    pub fn display_name(&self) -> Option<String> {
        if let Some(collective) = present(self.collective_name.as_deref()) {
            return Some(collective.to_string());
        }

        let name = [self.fore_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .filter_map(present)
            .collect::<Vec<_>>()
            .join(" ");

        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

/// One `AbstractText` element; structured abstracts carry a label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbstractSection {
    pub label: Option<String>,
    pub text: String,
}

/// A PubMed article as extracted from an `efetch` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubMedRaw {
    pub pmid: Option<String>,
    pub title: Option<String>,
    pub authors: Vec<PubMedAuthor>,
    pub abstract_sections: Vec<AbstractSection>,
    pub journal: Option<String>,
    pub pub_year: Option<String>,
    pub pub_month: Option<String>,
    pub medline_date: Option<String>,
    pub doi: Option<String>,
    pub keywords: Vec<String>,
}

impl PubMedRaw {
    fn abstract_text(&self) -> String {
        self.abstract_sections
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .map(|s| match present(s.label.as_deref()) {
                Some(label) => format!("{}: {}", label, s.text.trim()),
                None => s.text.trim().to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn published_date(&self) -> Option<String> {
        match (present(self.pub_month.as_deref()), present(self.pub_year.as_deref())) {
            (Some(month), Some(year)) => Some(format!("{} {}", month, year)),
            (None, Some(year)) => Some(year.to_string()),
            _ => present(self.medline_date.as_deref()).map(str::to_string),
        }
    }

    fn year(&self) -> Option<i32> {
        present(self.pub_year.as_deref())
            .and_then(|y| y.parse().ok())
            .or_else(|| self.medline_date.as_deref().and_then(extract_year))
    }
}

impl Normalize for PubMedRaw {
    fn database(&self) -> DatabaseId {
        DatabaseId::PubMed
    }

    fn normalize(self) -> Result<Record, MalformedRecordError> {
        let title = present(self.title.as_deref())
            .ok_or_else(|| MalformedRecordError::missing_title(DatabaseId::PubMed))?;

        let mut builder = RecordBuilder::new(title, DatabaseId::PubMed)
            .authors(self.authors.iter().filter_map(PubMedAuthor::display_name))
            .abstract_text(self.abstract_text())
            .keywords(self.keywords.iter().cloned())
            .year(self.year())
            .published_date(self.published_date().unwrap_or_default())
            .journal(self.journal.clone().unwrap_or_default())
            .doi(self.doi.as_deref().and_then(extract_doi).unwrap_or_default());

        if let Some(pmid) = present(self.pmid.as_deref()) {
            builder = builder
                .source_id(pmid)
                .url(format!("{}/{}/", PUBMED_ARTICLE_URL, pmid));
        }

        Ok(builder.build())
    }
}
