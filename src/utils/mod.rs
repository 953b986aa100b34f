//! Utility modules supporting the source collaborators and the CLI.
//!
//! - [`HttpClient`]: shared HTTP client that maps HTTP failures onto `SourceError`
//! - [`RetryConfig`], [`with_retry`]: retry transient source failures with exponential backoff
//! - [`write_records`], [`read_records`]: the JSON record files a run produces
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use litsearch::sources::SourceError;
//! use litsearch::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let data = with_retry(RetryConfig::default(), || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod export;
mod http;
mod retry;

pub use export::{read_records, records_file_name, write_json, write_records, ExportError};
pub use http::HttpClient;
pub use retry::{api_retry_config, with_retry, RetryConfig, TransientError};
