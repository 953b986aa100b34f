//! HTTP transport shared by the PubMed and ACM sources.

use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;

use crate::sources::SourceError;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Thin wrapper over a pooled [`reqwest::Client`]
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .gzip(true)
            .build()
            .map_err(|e| SourceError::Network(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Send `request` and return the body text.
    ///
    /// `what` names the request in error messages, e.g. "fetch PubMed records".
    pub async fn send_text(&self, request: RequestBuilder, what: &str) -> Result<String, SourceError> {
        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Cannot {}: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, what, &body));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Cannot read body of {}: {}", what, e)))
    }
}

/// Map a non-success status onto the retry-relevant error variants
fn status_error(status: StatusCode, what: &str, body: &str) -> SourceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        SourceError::RateLimit
    } else if status.is_server_error() {
        SourceError::Server(status.as_u16())
    } else {
        let body: String = body.chars().take(200).collect();
        SourceError::Api(format!("{} failed with {}: {}", what, status, body.trim()))
    }
}
