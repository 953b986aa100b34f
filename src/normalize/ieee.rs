//! IEEE Xplore export rows.

use serde::{Deserialize, Serialize};

use super::{extract_doi, present, split_list, Normalize};
use crate::error::MalformedRecordError;
use crate::models::{DatabaseId, Record, RecordBuilder};

/// One row of an IEEE Xplore export, keyed by the export's column names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IeeeRaw {
    #[serde(rename = "Document Title", alias = "title")]
    pub title: Option<String>,
    /// `;`-delimited author names
    #[serde(rename = "Authors", alias = "authors")]
    pub authors: Option<String>,
    #[serde(rename = "Publication Title", alias = "journal")]
    pub publication_title: Option<String>,
    #[serde(rename = "Publication Year", alias = "year")]
    pub publication_year: Option<serde_json::Value>,
    #[serde(rename = "Abstract", alias = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(rename = "DOI", alias = "doi")]
    pub doi: Option<String>,
    #[serde(rename = "Article Citation Count", alias = "citations")]
    pub citation_count: Option<serde_json::Value>,
    #[serde(rename = "PDF Link", alias = "url")]
    pub pdf_link: Option<String>,
    /// `;`-delimited keywords
    #[serde(rename = "Author Keywords", alias = "keywords")]
    pub author_keywords: Option<String>,
}

/// Export cells hold numbers either as JSON numbers or as text
fn number_cell(value: Option<&serde_json::Value>) -> Option<i64> {
    match value? {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Normalize for IeeeRaw {
    fn database(&self) -> DatabaseId {
        DatabaseId::Ieee
    }

    fn normalize(self) -> Result<Record, MalformedRecordError> {
        let title = present(self.title.as_deref())
            .ok_or_else(|| MalformedRecordError::missing_title(DatabaseId::Ieee))?;

        let year = number_cell(self.publication_year.as_ref()).and_then(|y| i32::try_from(y).ok());
        let citations =
            number_cell(self.citation_count.as_ref()).and_then(|c| u32::try_from(c).ok());

        Ok(RecordBuilder::new(title, DatabaseId::Ieee)
            .authors(split_list(self.authors.as_deref(), ';'))
            .abstract_text(self.abstract_text.clone().unwrap_or_default())
            .keywords(split_list(self.author_keywords.as_deref(), ';'))
            .year(year)
            .journal(self.publication_title.clone().unwrap_or_default())
            .doi(self.doi.as_deref().and_then(extract_doi).unwrap_or_default())
            .url(self.pdf_link.clone().unwrap_or_default())
            .citations(citations)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_export_row() {
        let json = r#"{
            "Document Title": "IMU-based gait phase detection",
            "Authors": "A. Kim; B. Park",
            "Publication Title": "IEEE Sensors Journal",
            "Publication Year": "2020",
            "Abstract": "",
            "DOI": "10.1109/JSEN.2020.2990000",
            "Article Citation Count": 12,
            "PDF Link": "https://ieeexplore.ieee.org/stamp/stamp.jsp?arnumber=1",
            "Author Keywords": "gait; IMU;;"
        }"#;
        let raw: IeeeRaw = serde_json::from_str(json).unwrap();
        let record = raw.normalize().unwrap();

        assert_eq!(record.authors, vec!["A. Kim", "B. Park"]);
        assert_eq!(record.year, Some(2020));
        assert_eq!(record.citations, Some(12));
        assert_eq!(record.r#abstract, None);
        assert_eq!(record.doi.as_deref(), Some("10.1109/JSEN.2020.2990000"));
        assert_eq!(record.keywords.len(), 2);
        assert_eq!(record.journal.as_deref(), Some("IEEE Sensors Journal"));
    }

    #[test]
    fn test_missing_title_is_malformed() {
        let raw = IeeeRaw {
            doi: Some("10.1109/x".to_string()),
            ..Default::default()
        };
        assert!(raw.normalize().is_err());
    }
}
