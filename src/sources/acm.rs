//! ACM Digital Library source implementation.
//!
//! The Digital Library has no open search API, so result pages of
//! `dl.acm.org/action/doSearch` are scraped. Abstracts are only shown on the
//! article pages and are fetched one by one unless disabled.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;

use crate::models::DatabaseId;
use crate::normalize::{AcmAuthors, AcmRaw, RawRecord};
use crate::sources::{Source, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient, RetryConfig};

const ACM_BASE_URL: &str = "https://dl.acm.org";
const ACM_SEARCH_URL: &str = "https://dl.acm.org/action/doSearch";

/// Results per page, the largest page the search UI serves reliably
const PAGE_SIZE: usize = 20;

/// Upper bound when no `max_results` is configured
const MAX_RECORDS: usize = 2_000;

/// Pause between two page requests
const REQUEST_DELAY: Duration = Duration::from_secs(2);

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css)
        .map_err(|e| SourceError::Parse(format!("Invalid selector '{}': {:?}", css, e)))
}

/// Whitespace-normalized text of the first element matching `css`
fn first_text(elem: &ElementRef, css: &Selector) -> Option<String> {
    let text = elem
        .select(css)
        .next()?
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// `March 2021` or `March 12, 2021` → `Mar 2021`
fn short_date(text: &str) -> Option<String> {
    let mut words = text.split_whitespace();
    let month: String = words.next()?.chars().take(3).collect();
    let year = words.find(|w| w.chars().filter(char::is_ascii_digit).count() == 4)?;
    let year: String = year.chars().filter(char::is_ascii_digit).collect();
    Some(format!("{} {}", month, year))
}

/// One page of search results
#[derive(Debug, Default)]
struct AcmPage {
    total_hits: Option<usize>,
    records: Vec<AcmRaw>,
}

/// Compiled selectors for a result page
struct ResultSelectors {
    hits: Selector,
    item: Selector,
    title: Selector,
    title_link: Selector,
    author: Selector,
    date: Selector,
    journal: Selector,
    doi: Selector,
    citation: Selector,
}

impl ResultSelectors {
    fn new() -> Result<Self, SourceError> {
        Ok(Self {
            hits: selector("span.hitsLength")?,
            item: selector("li.search__item")?,
            title: selector("span.hlFld-Title")?,
            title_link: selector("span.hlFld-Title a")?,
            author: selector("ul.loa li span")?,
            date: selector("div.bookPubDate")?,
            journal: selector("span.epub-section__title")?,
            doi: selector("a.issue-item__doi")?,
            citation: selector("span.citation")?,
        })
    }

    fn parse_item(&self, item: &ElementRef) -> AcmRaw {
        let href = item
            .select(&self.title_link)
            .next()
            .and_then(|a| a.value().attr("href"));

        let authors = item
            .select(&self.author)
            .map(|a| a.text().collect::<String>().trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        AcmRaw {
            id: href.and_then(|h| h.strip_prefix("/doi/")).map(str::to_string),
            title: first_text(item, &self.title),
            authors: AcmAuthors::List(authors),
            published: first_text(item, &self.date).and_then(|d| short_date(&d)),
            journal: first_text(item, &self.journal),
            doi: first_text(item, &self.doi),
            url: href.map(|h| format!("{}{}", ACM_BASE_URL, h)),
            citations: first_text(item, &self.citation),
            abstract_text: None,
        }
    }
}

/// ACM source
#[derive(Debug, Clone)]
pub struct AcmSource {
    client: Arc<HttpClient>,
    retry: RetryConfig,
    fetch_abstracts: bool,
    delay: Duration,
}

impl AcmSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: Arc::new(HttpClient::new()?),
            retry: api_retry_config(),
            fetch_abstracts: true,
            delay: REQUEST_DELAY,
        })
    }

    /// Skip the per-article abstract requests
    pub fn without_abstracts(mut self) -> Self {
        self.fetch_abstracts = false;
        self
    }

    fn build_search_url(query: &str, page: usize) -> String {
        format!(
            "{}?AllField={}&startPage={}&pageSize={}",
            ACM_SEARCH_URL,
            urlencoding::encode(query),
            page,
            PAGE_SIZE
        )
    }

    fn parse_results_page(html: &str) -> Result<AcmPage, SourceError> {
        let selectors = ResultSelectors::new()?;
        let document = Html::parse_document(html);

        let total_hits = document
            .select(&selectors.hits)
            .next()
            .map(|h| h.text().collect::<String>())
            .and_then(|h| {
                h.chars()
                    .filter(char::is_ascii_digit)
                    .collect::<String>()
                    .parse()
                    .ok()
            });

        let records = document
            .select(&selectors.item)
            .map(|item| selectors.parse_item(&item))
            .collect();

        Ok(AcmPage {
            total_hits,
            records,
        })
    }

    fn parse_abstract(html: &str) -> Result<Option<String>, SourceError> {
        let paragraph = selector("section[role=\"doc-abstract\"] div[role=\"paragraph\"]")?;
        let document = Html::parse_document(html);
        let text = document.root_element();
        Ok(first_text(&text, &paragraph))
    }

    async fn fetch_html(&self, url: String, what: &'static str) -> Result<String, SourceError> {
        let client = Arc::clone(&self.client);

        with_retry(self.retry, || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move {
                let request = client.get(&url).header("Accept", "text/html");
                client.send_text(request, what).await
            }
        })
        .await
    }

    /// Fill in abstracts from the article pages; a failed page only loses its abstract
    async fn fill_abstracts(&self, records: &mut [AcmRaw]) {
        for record in records.iter_mut() {
            let Some(url) = record.url.clone() else {
                continue;
            };

            tokio::time::sleep(self.delay).await;
            match self.fetch_html(url.clone(), "fetch ACM article page").await {
                Ok(html) => match Self::parse_abstract(&html) {
                    Ok(text) => record.abstract_text = text,
                    Err(e) => tracing::warn!("ACM: no abstract for {}: {}", url, e),
                },
                Err(e) => tracing::warn!("ACM: no abstract for {}: {}", url, e),
            }
        }
    }
}

#[async_trait]
impl Source for AcmSource {
    fn id(&self) -> &str {
        "acm"
    }

    fn database(&self) -> DatabaseId {
        DatabaseId::Acm
    }

    async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<RawRecord>, SourceError> {
        let limit = max_results.unwrap_or(MAX_RECORDS);
        let mut collected: Vec<AcmRaw> = Vec::new();
        let mut page_number = 0;

        while collected.len() < limit {
            if page_number > 0 {
                tokio::time::sleep(self.delay).await;
            }

            let url = Self::build_search_url(query, page_number);
            let html = self.fetch_html(url, "search ACM").await?;
            let page = Self::parse_results_page(&html)?;

            let received = page.records.len();
            collected.extend(page.records);
            tracing::debug!(
                "ACM: {} of {} records collected",
                collected.len(),
                page.total_hits.unwrap_or(0)
            );

            let exhausted = page.total_hits.is_some_and(|total| collected.len() >= total);
            if received < PAGE_SIZE || exhausted {
                break;
            }
            page_number += 1;
        }

        collected.truncate(limit);
        if self.fetch_abstracts {
            self.fill_abstracts(&mut collected).await;
        }

        tracing::info!("ACM: retrieved {} records", collected.len());
        Ok(collected.into_iter().map(RawRecord::Acm).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalize;

    const RESULTS_PAGE: &str = r#"<html><body>
        <span class="hitsLength">1,204</span>
        <ul class="search-result__xsl-body items-results rlist--inline">
          <li class="search__item issue-item-container">
            <div class="issue-item">
              <div class="bookPubDate simple-tooltip__block--b">March 2021</div>
              <h5 class="issue-item__title">
                <span class="hlFld-Title"><a href="/doi/10.1145/3411764.3445000">Movement <span>sonification</span></a></span>
              </h5>
              <ul class="rlist--inline loa truncate-list">
                <li><a href="/profile/1"><span>A. Smith</span></a></li>
                <li><a href="/profile/2"><span>B. Jones</span></a></li>
              </ul>
              <span class="epub-section__title">CHI '21: Proceedings of the 2021 CHI Conference</span>
              <a class="issue-item__doi dot-separator" href="https://doi.org/10.1145/3411764.3445000">https://doi.org/10.1145/3411764.3445000</a>
              <span class="citation"><span>1,204</span></span>
            </div>
          </li>
          <li class="search__item issue-item-container">
            <div class="issue-item">
              <span class="hlFld-Title"><a href="/doi/10.1145/1">Untitled draft</a></span>
            </div>
          </li>
        </ul>
    </body></html>"#;

    #[test]
    fn test_source_creation() {
        let source = AcmSource::new().unwrap();
        assert_eq!(source.id(), "acm");
        assert_eq!(source.database(), DatabaseId::Acm);
        assert!(source.fetch_abstracts);
        assert!(!source.without_abstracts().fetch_abstracts);
    }

    #[test]
    fn test_build_search_url() {
        let url = AcmSource::build_search_url("Title:(Gait OR IMU)", 3);
        assert!(url.starts_with("https://dl.acm.org/action/doSearch?"));
        assert!(url.contains("AllField=Title%3A%28Gait%20OR%20IMU%29"));
        assert!(url.contains("startPage=3"));
        assert!(url.contains("pageSize=20"));
    }

    #[test]
    fn test_parse_results_page() {
        let page = AcmSource::parse_results_page(RESULTS_PAGE).unwrap();
        assert_eq!(page.total_hits, Some(1204));
        assert_eq!(page.records.len(), 2);

        let raw = page.records[0].clone();
        assert_eq!(raw.id.as_deref(), Some("10.1145/3411764.3445000"));
        assert_eq!(raw.published.as_deref(), Some("Mar 2021"));
        assert_eq!(
            raw.url.as_deref(),
            Some("https://dl.acm.org/doi/10.1145/3411764.3445000")
        );

        let record = raw.normalize().unwrap();
        assert_eq!(record.title, "Movement sonification");
        assert_eq!(record.authors, vec!["A. Smith", "B. Jones"]);
        assert_eq!(record.year, Some(2021));
        assert_eq!(record.doi.as_deref(), Some("10.1145/3411764.3445000"));
        assert_eq!(record.citations, Some(1204));
        assert_eq!(
            record.journal.as_deref(),
            Some("CHI '21: Proceedings of the 2021 CHI Conference")
        );

        let sparse = &page.records[1];
        assert_eq!(sparse.published, None);
        assert_eq!(sparse.doi, None);
        assert_eq!(sparse.citations, None);
    }

    #[test]
    fn test_parse_page_without_results() {
        let page = AcmSource::parse_results_page("<html><body>No results</body></html>").unwrap();
        assert_eq!(page.total_hits, None);
        assert!(page.records.is_empty());
    }

    #[test]
    fn test_parse_abstract() {
        let html = r#"<html><body><section role="doc-abstract">
            <h2>Abstract</h2>
            <div role="paragraph">We sonify   movement
            in real time.</div>
        </section></body></html>"#;
        assert_eq!(
            AcmSource::parse_abstract(html).unwrap().as_deref(),
            Some("We sonify movement in real time.")
        );
        assert_eq!(AcmSource::parse_abstract("<html></html>").unwrap(), None);
    }

    #[test]
    fn test_short_date() {
        assert_eq!(short_date("March 2021").as_deref(), Some("Mar 2021"));
        assert_eq!(short_date("October 12, 2019").as_deref(), Some("Oct 2019"));
        assert_eq!(short_date("soon"), None);
    }
}
