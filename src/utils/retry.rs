//! Retrying source requests that fail for transient reasons.
//!
//! E-utilities and the ACM API answer 429 and 5xx under load. Those, dropped
//! connections and timed-out attempts are retried with exponential backoff;
//! any other failure is returned as is.

use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::sources::SourceError;

/// Backoff schedule for one request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Attempts in total, the first request included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub delay_cap: Duration,
    /// Growth factor between consecutive delays
    pub factor: f64,
    /// Time allowed for one attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            delay_cap: Duration::from_secs(30),
            factor: 2.0,
            attempt_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Delay after the given failed attempt (1-based), before the transient minimum
    fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.base_delay.as_secs_f64() * self.factor.powi(exponent);
        Duration::from_secs_f64(secs.min(self.delay_cap.as_secs_f64()))
    }
}

/// Failure kinds worth another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    Network,
    RateLimit,
    ServerError,
}

impl TransientError {
    /// `None` for failures that will not go away on their own
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        Some(match err {
            SourceError::Network(_) => Self::Network,
            SourceError::RateLimit => Self::RateLimit,
            SourceError::Server(_) => Self::ServerError,
            _ => return None,
        })
    }

    /// Lower bound for the delay; NCBI asks clients to back off after a 429
    pub fn recommended_delay(&self) -> Duration {
        match self {
            Self::Network => Duration::from_millis(500),
            Self::RateLimit => Duration::from_secs(2),
            Self::ServerError => Duration::from_secs(1),
        }
    }
}

/// Run `operation` until it succeeds, fails permanently or runs out of attempts
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match timeout(config.attempt_timeout, operation()).await {
            Ok(Ok(value)) => {
                if attempt > 1 {
                    tracing::debug!("Request succeeded on attempt {}", attempt);
                }
                return Ok(value);
            }
            Ok(Err(error)) => error,
            Err(_) => SourceError::Network(format!(
                "Request timed out after {:?}",
                config.attempt_timeout
            )),
        };

        let transient = match TransientError::from_source_error(&error) {
            Some(transient) if attempt < config.max_attempts => transient,
            Some(_) => {
                tracing::warn!("Giving up after {} attempts: {}", attempt, error);
                return Err(error);
            }
            None => return Err(error),
        };

        let delay = config
            .delay_after(attempt)
            .max(transient.recommended_delay());
        tracing::debug!(
            "Attempt {} failed ({:?}), retrying in {:?}",
            attempt,
            transient,
            delay
        );
        sleep(delay).await;
    }
}

/// Schedule used by the PubMed and ACM sources
pub fn api_retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 5,
        base_delay: Duration::from_secs(2),
        delay_cap: Duration::from_secs(60),
        factor: 2.0,
        attempt_timeout: Duration::from_secs(90),
    }
}
