//! Normalized API responses.

use crate::errors::{GitHubError, GitHubResult, RateLimitInfo};
use crate::pagination::PaginationLinks;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A successful API response with its JSON body left untyped.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    links: PaginationLinks,
    rate_limit: Option<RateLimitInfo>,
    body: Value,
}

impl ApiResponse {
    /// Creates a response.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        rate_limit: Option<RateLimitInfo>,
        body: Value,
    ) -> Self {
        let links = PaginationLinks::from_headers(&headers);
        Self {
            status,
            headers,
            links,
            rate_limit,
            body,
        }
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Pagination links from the `Link` header.
    pub fn links(&self) -> &PaginationLinks {
        &self.links
    }

    /// Rate limit snapshot from this response.
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        self.rate_limit.as_ref()
    }

    /// The body exactly as returned. Empty bodies are `null`.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Consumes the response and returns the body.
    pub fn into_body(self) -> Value {
        self.body
    }

    /// Returns true if the body is a JSON array.
    pub fn is_list(&self) -> bool {
        self.body.is_array()
    }

    /// Elements of the result list.
    ///
    /// An array body yields its elements, a `null` body yields nothing and
    /// any other body is treated as a single element.
    pub fn items(&self) -> std::slice::Iter<'_, Value> {
        match &self.body {
            Value::Array(items) => items.iter(),
            Value::Null => (&[] as &[Value]).iter(),
            other => std::slice::from_ref(other).iter(),
        }
    }

    /// Number of elements [`items`](Self::items) yields.
    pub fn len(&self) -> usize {
        self.items().len()
    }

    /// Returns true if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls `f` once per element, in order.
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&Value),
    {
        self.items().for_each(f);
    }

    /// Consumes the response and returns its elements.
    pub fn into_items(self) -> Vec<Value> {
        match self.body {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }

    /// Deserializes the body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> GitHubResult<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            GitHubError::deserialization(format!("Failed to deserialize response: {}", e))
                .with_cause(e)
        })
    }
}

impl IntoIterator for ApiResponse {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_items().into_iter()
    }
}
