//! Bounded retry execution

use super::hooks::{AsyncRequestHooks, RequestHooks};
use crate::components::RequestDescriptor;
use crate::{ConfigError, CrawlError, Result};
use std::future::Future;

/// Attempt budget used when a caller does not pick one
pub const DEFAULT_RETRY_BUDGET: u32 = 1;

/// Retry policy for a single request
///
/// `max_attempts` counts total attempts: a policy of 3 calls the
/// operation at most three times. There is no delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_BUDGET,
        }
    }
}

/// Runs `request_final` when an attempt goes out of scope
struct FinalGuard<'a, R> {
    hooks: &'a dyn RequestHooks<R>,
}

impl<R> Drop for FinalGuard<'_, R> {
    fn drop(&mut self) {
        self.hooks.request_final();
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` total attempts
    ///
    /// # Errors
    ///
    /// Returns a validation error when `max_attempts` is 0.
    pub fn new(max_attempts: u32) -> Result<Self> {
        if max_attempts == 0 {
            return Err(ConfigError::Validation(
                "retry budget must allow at least 1 attempt, got 0".to_string(),
            )
            .into());
        }
        Ok(Self { max_attempts })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `operation` until it succeeds or the budget is spent
    ///
    /// # Lifecycle
    ///
    /// For each attempt: `before_request`, then the operation, then either
    /// `request_done` (success, stops retrying) or `request_error`
    /// (failure, retries while budget remains), then `request_final`.
    ///
    /// # Returns
    ///
    /// * `Ok(response)` - the `request_done` value of the successful attempt,
    ///   or the value `request_error` produced for the last failed attempt
    /// * `Err(CrawlError)` - the last error, if `request_error` re-raised it
    pub fn execute<R, F>(
        &self,
        hooks: &dyn RequestHooks<R>,
        request: &RequestDescriptor,
        mut operation: F,
    ) -> Result<R>
    where
        F: FnMut() -> Result<R>,
    {
        let mut outcome = None;

        for attempt in 1..=self.max_attempts {
            let _final = FinalGuard { hooks };
            hooks.before_request(request, attempt);

            match operation() {
                Ok(response) => {
                    tracing::debug!(
                        "{} {} succeeded on attempt {}",
                        request.method,
                        request.url,
                        attempt
                    );
                    return Ok(hooks.request_done(response));
                }
                Err(error) => {
                    tracing::warn!(
                        "{} {} failed (attempt {}/{}): {}",
                        request.method,
                        request.url,
                        attempt,
                        self.max_attempts,
                        error
                    );
                    outcome = Some(hooks.request_error(error));
                }
            }
        }

        outcome.unwrap_or_else(|| Err(exhausted(request)))
    }

    /// Async flavor of [`execute`](Self::execute) with the same semantics
    pub async fn execute_async<R, F, Fut>(
        &self,
        hooks: &dyn AsyncRequestHooks<R>,
        request: &RequestDescriptor,
        mut operation: F,
    ) -> Result<R>
    where
        R: Send + 'static,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<R>> + Send,
    {
        let mut outcome = None;

        for attempt in 1..=self.max_attempts {
            hooks.before_request(request, attempt).await;

            match operation().await {
                Ok(response) => {
                    tracing::debug!(
                        "{} {} succeeded on attempt {}",
                        request.method,
                        request.url,
                        attempt
                    );
                    let response = hooks.request_done(response).await;
                    hooks.request_final().await;
                    return Ok(response);
                }
                Err(error) => {
                    tracing::warn!(
                        "{} {} failed (attempt {}/{}): {}",
                        request.method,
                        request.url,
                        attempt,
                        self.max_attempts,
                        error
                    );
                    let handled = hooks.request_error(error).await;
                    hooks.request_final().await;
                    outcome = Some(handled);
                }
            }
        }

        outcome.unwrap_or_else(|| Err(exhausted(request)))
    }
}

fn exhausted(request: &RequestDescriptor) -> CrawlError {
    ConfigError::Validation(format!(
        "no attempt was made for {} {}",
        request.method, request.url
    ))
    .into()
}
