//! Lifecycle hook traits and the stock hook sets

use crate::components::RequestDescriptor;
use crate::{CrawlError, Result};
use async_trait::async_trait;

/// Lifecycle callbacks invoked by [`RetryPolicy::execute`](super::RetryPolicy::execute)
///
/// Every method has a default: `before_request` and `request_final` do
/// nothing, `request_done` returns the response unchanged and
/// `request_error` re-raises the error.
pub trait RequestHooks<R>: Send + Sync {
    /// Called before each attempt. `attempt` starts at 1.
    fn before_request(&self, _request: &RequestDescriptor, _attempt: u32) {}

    /// Called with the response of a successful attempt
    fn request_done(&self, response: R) -> R {
        response
    }

    /// Called after every attempt, successful or not
    fn request_final(&self) {}

    /// Called with the error of a failed attempt
    ///
    /// Returning `Ok` turns the failure into a handled value. Returning
    /// `Err` keeps the attempt failed.
    fn request_error(&self, error: CrawlError) -> Result<R> {
        Err(error)
    }
}

/// Async counterpart of [`RequestHooks`], used by async transports
#[async_trait]
pub trait AsyncRequestHooks<R: Send + 'static>: Send + Sync {
    async fn before_request(&self, _request: &RequestDescriptor, _attempt: u32) {}

    async fn request_done(&self, response: R) -> R {
        response
    }

    async fn request_final(&self) {}

    async fn request_error(&self, error: CrawlError) -> Result<R> {
        Err(error)
    }
}

/// Hooks with every default behavior: errors are re-raised
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl<R> RequestHooks<R> for DefaultHooks {}

#[async_trait]
impl<R: Send + 'static> AsyncRequestHooks<R> for DefaultHooks {}

/// Hooks that trace every lifecycle event and re-raise errors
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHooks;

impl<R> RequestHooks<R> for LoggingHooks {
    fn before_request(&self, request: &RequestDescriptor, attempt: u32) {
        tracing::debug!(
            "Sending {} {} (attempt {}/{})",
            request.method,
            request.url,
            attempt,
            request.retry_budget
        );
    }

    fn request_final(&self) {
        tracing::trace!("Request attempt finished");
    }

    fn request_error(&self, error: CrawlError) -> Result<R> {
        tracing::warn!("Request attempt failed: {}", error);
        Err(error)
    }
}

#[async_trait]
impl<R: Send + 'static> AsyncRequestHooks<R> for LoggingHooks {
    async fn before_request(&self, request: &RequestDescriptor, attempt: u32) {
        <Self as RequestHooks<R>>::before_request(self, request, attempt);
    }

    async fn request_final(&self) {
        <Self as RequestHooks<R>>::request_final(self);
    }

    async fn request_error(&self, error: CrawlError) -> Result<R> {
        <Self as RequestHooks<R>>::request_error(self, error)
    }
}

type BeforeFn = dyn Fn(&RequestDescriptor, u32) + Send + Sync;
type DoneFn<R> = dyn Fn(R) -> R + Send + Sync;
type FinalFn = dyn Fn() + Send + Sync;
type ErrorFn<R> = dyn Fn(CrawlError) -> Result<R> + Send + Sync;

/// Hooks assembled from closures
///
/// Any callback left unset falls back to the default behavior.
///
/// # Example
///
/// ```
/// use sumi_crawler::retry::CallbackHooks;
///
/// let hooks = CallbackHooks::<Option<String>>::new()
///     .on_before(|request, attempt| println!("{} attempt {}", request.url, attempt))
///     .on_error(|_error| Ok(None));
/// # let _ = hooks;
/// ```
pub struct CallbackHooks<R> {
    before: Option<Box<BeforeFn>>,
    done: Option<Box<DoneFn<R>>>,
    finally: Option<Box<FinalFn>>,
    error: Option<Box<ErrorFn<R>>>,
}

impl<R> Default for CallbackHooks<R> {
    fn default() -> Self {
        Self {
            before: None,
            done: None,
            finally: None,
            error: None,
        }
    }
}

impl<R> CallbackHooks<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestDescriptor, u32) + Send + Sync + 'static,
    {
        self.before = Some(Box::new(f));
        self
    }

    pub fn on_done<F>(mut self, f: F) -> Self
    where
        F: Fn(R) -> R + Send + Sync + 'static,
    {
        self.done = Some(Box::new(f));
        self
    }

    pub fn on_final<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.finally = Some(Box::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(CrawlError) -> Result<R> + Send + Sync + 'static,
    {
        self.error = Some(Box::new(f));
        self
    }
}

impl<R> RequestHooks<R> for CallbackHooks<R> {
    fn before_request(&self, request: &RequestDescriptor, attempt: u32) {
        if let Some(before) = &self.before {
            before(request, attempt);
        }
    }

    fn request_done(&self, response: R) -> R {
        match &self.done {
            Some(done) => done(response),
            None => response,
        }
    }

    fn request_final(&self) {
        if let Some(finally) = &self.finally {
            finally();
        }
    }

    fn request_error(&self, error: CrawlError) -> Result<R> {
        match &self.error {
            Some(handle) => handle(error),
            None => Err(error),
        }
    }
}

#[async_trait]
impl<R: Send + 'static> AsyncRequestHooks<R> for CallbackHooks<R> {
    async fn before_request(&self, request: &RequestDescriptor, attempt: u32) {
        <Self as RequestHooks<R>>::before_request(self, request, attempt);
    }

    async fn request_done(&self, response: R) -> R {
        <Self as RequestHooks<R>>::request_done(self, response)
    }

    async fn request_final(&self) {
        <Self as RequestHooks<R>>::request_final(self);
    }

    async fn request_error(&self, error: CrawlError) -> Result<R> {
        <Self as RequestHooks<R>>::request_error(self, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::HttpMethod;

    fn request() -> RequestDescriptor {
        RequestDescriptor::new(HttpMethod::Get, "https://example.com/", 1)
    }

    #[test]
    fn test_default_hooks_pass_through() {
        let hooks = DefaultHooks;
        assert_eq!(RequestHooks::<u32>::request_done(&hooks, 7), 7);
        let err = RequestHooks::<u32>::request_error(&hooks, CrawlError::InvalidMethod("X".into()));
        assert!(matches!(err, Err(CrawlError::InvalidMethod(_))));
    }

    #[test]
    fn test_callback_hooks_use_closures() {
        let hooks = CallbackHooks::<u32>::new()
            .on_done(|value| value * 2)
            .on_error(|_| Ok(0));

        RequestHooks::before_request(&hooks, &request(), 1);
        assert_eq!(RequestHooks::request_done(&hooks, 21), 42);
        let handled = RequestHooks::request_error(&hooks, CrawlError::InvalidMethod("X".into()));
        assert_eq!(handled.unwrap(), 0);
    }

    #[test]
    fn test_callback_hooks_fall_back_to_defaults() {
        let hooks = CallbackHooks::<u32>::new();
        assert_eq!(RequestHooks::request_done(&hooks, 5), 5);
        assert!(RequestHooks::request_error(&hooks, CrawlError::InvalidMethod("X".into())).is_err());
    }
}
