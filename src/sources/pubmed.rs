//! PubMed source implementation using the E-utilities API.

use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::DatabaseId;
use crate::normalize::{AbstractSection, PubMedAuthor, PubMedRaw, RawRecord};
use crate::sources::{Source, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient, RetryConfig};

/// PubMed E-utilities API base URLs
const PUBMED_ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const PUBMED_EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

/// Ids per `esearch` page and per `efetch` request
const BATCH_SIZE: usize = 200;

/// `esearch` cannot page beyond this many records
const MAX_RECORDS: usize = 9_999;

/// PubMed source
///
/// Uses NCBI E-utilities: `esearch` collects the matching PMIDs page by page,
/// `efetch` retrieves the article records in batches.
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: Arc<HttpClient>,
    retry: RetryConfig,
}

/// One `esearch` page
#[derive(Debug, Default, PartialEq)]
struct SearchPage {
    count: usize,
    ids: Vec<String>,
}

impl PubMedSource {
    /// Create a new PubMed source
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: Arc::new(HttpClient::new()?),
            retry: api_retry_config(),
        })
    }

    /// Create with a custom HTTP client and retry policy
    pub fn with_client(client: Arc<HttpClient>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Build E-utilities search URL
    fn build_search_url(query: &str, retstart: usize, retmax: usize) -> String {
        let params = [
            ("db", "pubmed".to_string()),
            ("term", query.to_string()),
            ("retstart", retstart.to_string()),
            ("retmax", retmax.to_string()),
            ("retmode", "xml".to_string()),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", PUBMED_ESEARCH_URL, query)
    }

    /// Build E-utilities fetch URL for specific PubMed IDs
    fn build_fetch_url(ids: &[String]) -> String {
        format!(
            "{}?db=pubmed&id={}&retmode=xml",
            PUBMED_EFETCH_URL,
            ids.join(",")
        )
    }

    /// Parse E-utilities search response XML
    fn parse_search_response(xml: &str) -> Result<SearchPage, SourceError> {
        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct ESearchResult {
            Count: Option<usize>,
            IdList: Option<IdList>,
            ERROR: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        struct IdList {
            #[serde(rename = "Id", default)]
            ids: Vec<String>,
        }

        let result: ESearchResult = from_str(xml)
            .map_err(|e| SourceError::Parse(format!("Failed to parse PubMed search XML: {}", e)))?;

        if let Some(error) = result.ERROR {
            return Err(SourceError::Api(format!("PubMed: {}", error)));
        }

        Ok(SearchPage {
            count: result.Count.unwrap_or(0),
            ids: result.IdList.map(|l| l.ids).unwrap_or_default(),
        })
    }

    /// Parse E-utilities fetch response XML
    fn parse_fetch_response(xml: &str) -> Result<Vec<PubMedRaw>, SourceError> {
        #[derive(Debug, Deserialize)]
        struct PubmedArticleSet {
            #[serde(rename = "PubmedArticle", default)]
            articles: Vec<PubmedArticle>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubmedArticle {
            MedlineCitation: Option<MedlineCitation>,
            PubmedData: Option<PubmedData>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct MedlineCitation {
            PMID: Option<Text>,
            Article: Option<Article>,
            #[serde(rename = "KeywordList", default)]
            keyword_lists: Vec<KeywordList>,
        }

        #[derive(Debug, Deserialize)]
        struct Text {
            #[serde(rename = "$text", default)]
            text: String,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Article {
            Journal: Option<Journal>,
            ArticleTitle: Option<Text>,
            Abstract: Option<Abstract>,
            AuthorList: Option<AuthorList>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Journal {
            Title: Option<Text>,
            JournalIssue: Option<JournalIssue>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct JournalIssue {
            PubDate: Option<PubDate>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubDate {
            Year: Option<String>,
            Month: Option<String>,
            MedlineDate: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        struct Abstract {
            #[serde(rename = "AbstractText", default)]
            texts: Vec<AbstractText>,
        }

        #[derive(Debug, Deserialize)]
        struct AbstractText {
            #[serde(rename = "@Label")]
            label: Option<String>,
            #[serde(rename = "$text", default)]
            text: String,
        }

        #[derive(Debug, Deserialize)]
        struct AuthorList {
            #[serde(rename = "Author", default)]
            authors: Vec<Author>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct Author {
            LastName: Option<String>,
            ForeName: Option<String>,
            CollectiveName: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        struct KeywordList {
            #[serde(rename = "Keyword", default)]
            keywords: Vec<Text>,
        }

        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct PubmedData {
            ArticleIdList: Option<ArticleIdList>,
        }

        #[derive(Debug, Deserialize)]
        struct ArticleIdList {
            #[serde(rename = "ArticleId", default)]
            ids: Vec<ArticleId>,
        }

        #[derive(Debug, Deserialize)]
        struct ArticleId {
            #[serde(rename = "@IdType")]
            id_type: String,
            #[serde(rename = "$text", default)]
            value: String,
        }

        let result: PubmedArticleSet = from_str(xml)
            .map_err(|e| SourceError::Parse(format!("Failed to parse PubMed fetch XML: {}", e)))?;

        let records = result
            .articles
            .into_iter()
            .map(|article| {
                let citation = article.MedlineCitation;
                let details = citation.as_ref().and_then(|m| m.Article.as_ref());
                let pub_date = details
                    .and_then(|a| a.Journal.as_ref())
                    .and_then(|j| j.JournalIssue.as_ref())
                    .and_then(|ji| ji.PubDate.as_ref());

                PubMedRaw {
                    pmid: citation.as_ref().and_then(|m| m.PMID.as_ref()).map(|p| p.text.clone()),
                    title: details.and_then(|a| a.ArticleTitle.as_ref()).map(|t| t.text.clone()),
                    authors: details
                        .and_then(|a| a.AuthorList.as_ref())
                        .map(|al| {
                            al.authors
                                .iter()
                                .map(|author| PubMedAuthor {
                                    fore_name: author.ForeName.clone(),
                                    last_name: author.LastName.clone(),
                                    collective_name: author.CollectiveName.clone(),
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                    abstract_sections: details
                        .and_then(|a| a.Abstract.as_ref())
                        .map(|ab| {
                            ab.texts
                                .iter()
                                .map(|at| AbstractSection {
                                    label: at.label.clone(),
                                    text: at.text.clone(),
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                    journal: details
                        .and_then(|a| a.Journal.as_ref())
                        .and_then(|j| j.Title.as_ref())
                        .map(|t| t.text.clone()),
                    pub_year: pub_date.and_then(|pd| pd.Year.clone()),
                    pub_month: pub_date.and_then(|pd| pd.Month.clone()),
                    medline_date: pub_date.and_then(|pd| pd.MedlineDate.clone()),
                    doi: article
                        .PubmedData
                        .as_ref()
                        .and_then(|pd| pd.ArticleIdList.as_ref())
                        .and_then(|ail| ail.ids.iter().find(|id| id.id_type == "doi"))
                        .map(|id| id.value.clone()),
                    keywords: citation
                        .as_ref()
                        .map(|m| {
                            m.keyword_lists
                                .iter()
                                .flat_map(|kl| kl.keywords.iter().map(|k| k.text.clone()))
                                .collect()
                        })
                        .unwrap_or_default(),
                }
            })
            .collect();

        Ok(records)
    }

    async fn fetch_text(&self, url: String, what: &'static str) -> Result<String, SourceError> {
        let client = Arc::clone(&self.client);
        with_retry(self.retry, || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move { client.send_text(client.get(&url), what).await }
        })
        .await
    }

    /// Collect up to `limit` PMIDs, page by page
    async fn search_ids(&self, query: &str, limit: usize) -> Result<Vec<String>, SourceError> {
        let mut ids: Vec<String> = Vec::new();

        loop {
            let retmax = (limit - ids.len()).min(BATCH_SIZE);
            let url = Self::build_search_url(query, ids.len(), retmax);
            let page = Self::parse_search_response(&self.fetch_text(url, "search PubMed").await?)?;

            let received = page.ids.len();
            ids.extend(page.ids);
            tracing::debug!("PubMed: {} of {} ids collected", ids.len(), page.count);

            if received == 0 || ids.len() >= limit.min(page.count) {
                break;
            }
        }

        ids.truncate(limit);
        Ok(ids)
    }
}

#[async_trait]
impl Source for PubMedSource {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn database(&self) -> DatabaseId {
        DatabaseId::PubMed
    }

    async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<RawRecord>, SourceError> {
        let limit = max_results.unwrap_or(MAX_RECORDS).min(MAX_RECORDS);
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let ids = self.search_ids(query, limit).await?;
        let mut records = Vec::with_capacity(ids.len());

        for batch in ids.chunks(BATCH_SIZE) {
            let xml = self
                .fetch_text(Self::build_fetch_url(batch), "fetch PubMed records")
                .await?;
            records.extend(
                Self::parse_fetch_response(&xml)?
                    .into_iter()
                    .map(RawRecord::PubMed),
            );
        }

        tracing::info!("PubMed: retrieved {} records", records.len());
        Ok(records)
    }
}
