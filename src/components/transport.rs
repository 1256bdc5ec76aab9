//! Transport traits and HTTP method dispatch

use crate::retry::{AsyncRequestHooks, DefaultHooks, RequestHooks, RetryPolicy};
use crate::{CrawlError, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// The six operation slots a transport can implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// All methods in dispatch order
    pub const ALL: [HttpMethod; 6] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    /// The token matched during dispatch
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTION",
        }
    }

    /// Selects a method from free-form text
    ///
    /// Matching is case-insensitive and by substring, checked in the order
    /// GET, POST, PUT, DELETE, HEAD, OPTION. The first token found anywhere
    /// in the input wins, so `"xGETx"` selects GET and `"OPTIONS"` selects
    /// OPTION.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidMethod`] carrying the uppercased input
    /// when no token matches.
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_crawler::components::HttpMethod;
    ///
    /// assert_eq!(HttpMethod::dispatch("get").unwrap(), HttpMethod::Get);
    /// assert!(HttpMethod::dispatch("xyz").unwrap_err().to_string().contains("XYZ"));
    /// ```
    pub fn dispatch(method: &str) -> Result<Self> {
        let upper = method.to_uppercase();
        Self::ALL
            .into_iter()
            .find(|candidate| upper.contains(candidate.as_str()))
            .ok_or(CrawlError::InvalidMethod(upper))
    }
}

impl FromStr for HttpMethod {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::dispatch(s)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to send: where, how, and how many attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: HttpMethod,
    /// Total attempts allowed
    pub retry_budget: u32,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, url: impl Into<String>, retry_budget: u32) -> Self {
        Self {
            url: url.into(),
            method,
            retry_budget,
        }
    }
}

/// A blocking HTTP transport
///
/// Implementors override the verbs they support; the others answer with
/// no response. `request` dispatches to the right verb inside the retry
/// policy, calling the transport's lifecycle hooks.
pub trait Transport: Send + Sync {
    type Response: Send + 'static;

    fn get(&self, _url: &str) -> Result<Option<Self::Response>> {
        Ok(None)
    }

    fn post(&self, _url: &str) -> Result<Option<Self::Response>> {
        Ok(None)
    }

    fn put(&self, _url: &str) -> Result<Option<Self::Response>> {
        Ok(None)
    }

    fn delete(&self, _url: &str) -> Result<Option<Self::Response>> {
        Ok(None)
    }

    fn head(&self, _url: &str) -> Result<Option<Self::Response>> {
        Ok(None)
    }

    fn option(&self, _url: &str) -> Result<Option<Self::Response>> {
        Ok(None)
    }

    /// Lifecycle hooks applied around every attempt
    fn hooks(&self) -> &dyn RequestHooks<Option<Self::Response>> {
        &DefaultHooks
    }

    /// Invokes the verb operation for `method`
    fn dispatch(&self, method: HttpMethod, url: &str) -> Result<Option<Self::Response>> {
        match method {
            HttpMethod::Get => self.get(url),
            HttpMethod::Post => self.post(url),
            HttpMethod::Put => self.put(url),
            HttpMethod::Delete => self.delete(url),
            HttpMethod::Head => self.head(url),
            HttpMethod::Options => self.option(url),
        }
    }

    /// Sends a request under its retry budget
    fn request(&self, request: &RequestDescriptor) -> Result<Option<Self::Response>> {
        let policy = RetryPolicy::new(request.retry_budget)?;
        policy.execute(self.hooks(), request, || {
            self.dispatch(request.method, &request.url)
        })
    }
}

/// An async HTTP transport, the cooperative counterpart of [`Transport`]
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    type Response: Send + 'static;

    async fn get(&self, _url: &str) -> Result<Option<Self::Response>> {
        Ok(None)
    }

    async fn post(&self, _url: &str) -> Result<Option<Self::Response>> {
        Ok(None)
    }

    async fn put(&self, _url: &str) -> Result<Option<Self::Response>> {
        Ok(None)
    }

    async fn delete(&self, _url: &str) -> Result<Option<Self::Response>> {
        Ok(None)
    }

    async fn head(&self, _url: &str) -> Result<Option<Self::Response>> {
        Ok(None)
    }

    async fn option(&self, _url: &str) -> Result<Option<Self::Response>> {
        Ok(None)
    }

    fn hooks(&self) -> &dyn AsyncRequestHooks<Option<Self::Response>> {
        &DefaultHooks
    }

    async fn dispatch(&self, method: HttpMethod, url: &str) -> Result<Option<Self::Response>> {
        match method {
            HttpMethod::Get => self.get(url).await,
            HttpMethod::Post => self.post(url).await,
            HttpMethod::Put => self.put(url).await,
            HttpMethod::Delete => self.delete(url).await,
            HttpMethod::Head => self.head(url).await,
            HttpMethod::Options => self.option(url).await,
        }
    }

    async fn request(&self, request: &RequestDescriptor) -> Result<Option<Self::Response>> {
        let policy = RetryPolicy::new(request.retry_budget)?;
        policy
            .execute_async(self.hooks(), request, move || {
                self.dispatch(request.method, &request.url)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records which verb was invoked
    #[derive(Default)]
    struct VerbRecorder {
        calls: Mutex<Vec<&'static str>>,
    }

    impl Transport for VerbRecorder {
        type Response = &'static str;

        fn get(&self, _url: &str) -> Result<Option<Self::Response>> {
            self.calls.lock().unwrap().push("get");
            Ok(Some("got"))
        }

        fn delete(&self, _url: &str) -> Result<Option<Self::Response>> {
            self.calls.lock().unwrap().push("delete");
            Ok(Some("deleted"))
        }
    }

    #[test]
    fn test_dispatch_is_case_insensitive() {
        for input in ["get", "GET", "Get", "gEt"] {
            assert_eq!(HttpMethod::dispatch(input).unwrap(), HttpMethod::Get);
        }
    }

    #[test]
    fn test_dispatch_matches_substrings() {
        assert_eq!(HttpMethod::dispatch("xGETx").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::dispatch("options").unwrap(), HttpMethod::Options);
        assert_eq!(HttpMethod::dispatch("http-delete").unwrap(), HttpMethod::Delete);
    }

    #[test]
    fn test_dispatch_order_first_match_wins() {
        // Both GET and POST appear; GET is checked first
        assert_eq!(HttpMethod::dispatch("POSTGET").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::dispatch("headput").unwrap(), HttpMethod::Put);
    }

    #[test]
    fn test_dispatch_rejects_unknown_method_with_uppercased_message() {
        let err = HttpMethod::dispatch("xyz").unwrap_err();
        assert!(matches!(err, CrawlError::InvalidMethod(ref m) if m == "XYZ"));
        assert!(err.to_string().contains("XYZ"));
    }

    #[test]
    fn test_from_str_uses_dispatch() {
        let method: HttpMethod = "Post".parse().unwrap();
        assert_eq!(method, HttpMethod::Post);
        assert_eq!(method.to_string(), "POST");
    }

    #[test]
    fn test_request_invokes_selected_verb() {
        let transport = VerbRecorder::default();
        let request = RequestDescriptor::new(HttpMethod::dispatch("xGETx").unwrap(), "u", 1);

        assert_eq!(transport.request(&request).unwrap(), Some("got"));
        assert_eq!(*transport.calls.lock().unwrap(), vec!["get"]);
    }

    #[test]
    fn test_unimplemented_verb_returns_no_response() {
        let transport = VerbRecorder::default();
        let request = RequestDescriptor::new(HttpMethod::Head, "u", 1);

        assert_eq!(transport.request(&request).unwrap(), None);
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_request_rejects_zero_budget() {
        let transport = VerbRecorder::default();
        let request = RequestDescriptor::new(HttpMethod::Get, "u", 0);

        assert!(transport.request(&request).is_err());
        assert!(transport.calls.lock().unwrap().is_empty());
    }
}
