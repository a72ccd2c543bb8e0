//! Resilience layer for the Petstore client.
//!
//! Provides retry with exponential backoff around a single logical request.

mod backoff;

pub use backoff::ExponentialBackoff;

use std::future::Future;
use std::time::Duration;

use super::error::{from_transport, is_retryable_transport};
use crate::Result;

/// Statuses that are re-attempted before being classified.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Raw outcome of one transmission.
pub type Attempt = std::result::Result<reqwest::Response, reqwest::Error>;

/// Bounded retry with exponential backoff.
///
/// Every HTTP method is retried, including POST and PUT.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: ExponentialBackoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: ExponentialBackoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Send each request exactly once.
    pub fn disabled() -> Self {
        Self::new(0, ExponentialBackoff::default())
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff(&self) -> &ExponentialBackoff {
        &self.backoff
    }

    pub fn is_retryable_status(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    pub fn should_retry(outcome: &Attempt) -> bool {
        match outcome {
            Ok(response) => Self::is_retryable_status(response.status().as_u16()),
            Err(err) => is_retryable_transport(err),
        }
    }

    /// Run `attempt` until it yields a final outcome or retries are exhausted.
    ///
    /// Errors returned by `attempt` itself abort immediately and are passed
    /// through unchanged. A response with a retryable status that survives
    /// every retry is returned as-is for classification; a transport failure
    /// becomes [`crate::Error::Connection`].
    pub async fn execute<F, Fut>(&self, mut attempt: F) -> Result<reqwest::Response>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Attempt>>,
    {
        let mut retries = 0;
        loop {
            let outcome = attempt().await?;

            if retries >= self.max_retries || !Self::should_retry(&outcome) {
                return outcome.map_err(from_transport);
            }

            retries += 1;
            let delay = self.backoff.delay_for(retries);
            match &outcome {
                Ok(response) => tracing::warn!(
                    status = response.status().as_u16(),
                    retry = retries,
                    max_retries = self.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Retryable status, retrying request"
                ),
                Err(e) => tracing::warn!(
                    error = %e,
                    retry = retries,
                    max_retries = self.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Transport failure, retrying request"
                ),
            }
            drop(outcome);
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_RETRIES,
            ExponentialBackoff::new(DEFAULT_RETRY_INTERVAL, Duration::from_secs(30), 2.0),
        )
    }
}
