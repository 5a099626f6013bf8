//! Fixed-attempt, fixed-delay retry wrapper for Drive API calls.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::error::{DriveError, RequestError, Result};

/// Service status codes treated as transient.
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Whether a service status code is worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status)
}

/// Attempt bound and delay applied to every request action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// A bound below one is raised to one: every call is attempted at least once.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `action` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// Every retryable failure is followed by `delay`, including the last one,
    /// after which [`DriveError::RetriesExhausted`] is returned.
    ///
    /// Only [`RequestError::Api`] failures with a status in
    /// [`RETRYABLE_STATUS_CODES`] are retried. Any other service status fails
    /// with [`DriveError::RemoteService`]; every non-service failure fails with
    /// [`DriveError::Unexpected`]. `context` only labels errors and logs.
    pub async fn execute<F, Fut, T>(&self, context: &str, mut action: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut attempt = 0;

        loop {
            let err = match action().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            match err.status() {
                Some(status) if is_retryable_status(status) => {
                    warn!(
                        context,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        status,
                        "Retryable Drive API error"
                    );
                }
                Some(_) => {
                    return Err(DriveError::RemoteService {
                        context: context.to_string(),
                        source: err,
                    })
                }
                None => {
                    return Err(DriveError::Unexpected {
                        context: context.to_string(),
                        source: err,
                    })
                }
            }

            tokio::time::sleep(self.delay).await;
            attempt += 1;

            if attempt >= self.max_retries {
                error!(context, attempts = self.max_retries, "Drive API retries exhausted");
                return Err(DriveError::RetriesExhausted {
                    context: context.to_string(),
                    attempts: self.max_retries,
                    source: err,
                });
            }
        }
    }
}
