//! Link-header pagination.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::request::{Params, Request};
use crate::response::ApiResponse;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::HeaderMap;
use serde_json::Value;

/// GitHub caps `per_page` at this value.
pub const MAX_PER_PAGE: u32 = 100;

/// `rel` targets of a `Link` response header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationLinks {
    /// `rel="next"`.
    pub next: Option<String>,
    /// `rel="prev"`.
    pub prev: Option<String>,
    /// `rel="first"`.
    pub first: Option<String>,
    /// `rel="last"`.
    pub last: Option<String>,
}

impl PaginationLinks {
    /// Parses an RFC 8288 `Link` value. Unknown relations are ignored.
    pub fn from_header(header_value: &str) -> Self {
        let mut links = Self::default();

        for part in header_value.split(',') {
            let mut url = None;
            let mut rel = None;

            for segment in part.split(';').map(str::trim) {
                if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                    url = Some(inner.to_string());
                } else if let Some(value) = segment.strip_prefix("rel=") {
                    rel = Some(value.trim_matches('"').to_string());
                }
            }

            if let (Some(url), Some(rel)) = (url, rel) {
                match rel.as_str() {
                    "next" => links.next = Some(url),
                    "prev" => links.prev = Some(url),
                    "first" => links.first = Some(url),
                    "last" => links.last = Some(url),
                    _ => {}
                }
            }
        }

        links
    }

    /// Reads the `Link` header, if any.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(Self::from_header)
            .unwrap_or_default()
    }

    /// Whether another page follows.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Page count implied by the `last` link.
    pub fn total_pages(&self) -> Option<u32> {
        self.last.as_deref().and_then(page_number)
    }
}

/// Extracts the `page` query parameter from a URL.
pub fn page_number(url: &str) -> Option<u32> {
    url::Url::parse(url).ok().and_then(|u| {
        u.query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
    })
}

/// `page` and `per_page` query arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationParams {
    /// 1-based page to start from.
    pub page: Option<u32>,
    /// Page size, at most [`MAX_PER_PAGE`].
    pub per_page: Option<u32>,
}

impl PaginationParams {
    /// Creates empty pagination parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start page; 0 is treated as 1.
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page.max(1));
        self
    }

    /// Sets items per page, capped at [`MAX_PER_PAGE`].
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page.clamp(1, MAX_PER_PAGE));
        self
    }

    /// Merges into request parameters, overriding existing `page`/`per_page`.
    pub fn apply(&self, mut params: Params) -> Params {
        if let Some(page) = self.page {
            params.insert("page", page);
        }
        if let Some(per_page) = self.per_page {
            params.insert("per_page", per_page);
        }
        params
    }
}

#[derive(Debug, Clone)]
enum PageState {
    Start,
    Next(String),
    Done,
}

/// Lazy walk over every page of a list endpoint.
///
/// Nothing is fetched until [`next_page`](Self::next_page) is called or the
/// stream is polled. A failed fetch leaves the position unchanged, and
/// [`reset`](Self::reset) starts over from the first page.
pub struct Paginator<'a> {
    client: &'a GitHubClient,
    request: Request,
    state: PageState,
    pages_fetched: usize,
    max_pages: Option<usize>,
}

impl<'a> Paginator<'a> {
    /// Creates a paginator whose first page is `request`.
    pub fn new(client: &'a GitHubClient, request: Request) -> Self {
        Self {
            client,
            request,
            state: PageState::Start,
            pages_fetched: 0,
            max_pages: None,
        }
    }

    /// Stops after `max` pages.
    pub fn max_pages(mut self, max: usize) -> Self {
        self.max_pages = Some(max);
        self
    }

    /// Number of pages fetched since creation or the last reset.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Returns true if another page may be fetched.
    pub fn has_more(&self) -> bool {
        !matches!(self.state, PageState::Done) && !self.limit_reached()
    }

    /// Rewinds to the first page.
    pub fn reset(&mut self) {
        self.state = PageState::Start;
        self.pages_fetched = 0;
    }

    fn limit_reached(&self) -> bool {
        self.max_pages.map_or(false, |max| self.pages_fetched >= max)
    }

    /// Fetches the next page, or `None` once the last page has been returned.
    pub async fn next_page(&mut self) -> GitHubResult<Option<ApiResponse>> {
        if self.limit_reached() {
            return Ok(None);
        }

        let response = match &self.state {
            PageState::Done => return Ok(None),
            PageState::Start => self.client.send(self.request.clone()).await?,
            PageState::Next(url) => {
                self.client
                    .get_url(url, self.request.get_options())
                    .await?
            }
        };

        self.pages_fetched += 1;
        self.state = match response.links().next.clone() {
            Some(next) => PageState::Next(next),
            None => PageState::Done,
        };

        tracing::debug!(
            path = %self.request.path(),
            page = self.pages_fetched,
            items = response.len(),
            has_next = matches!(self.state, PageState::Next(_)),
            "Fetched page"
        );

        Ok(Some(response))
    }

    /// Collects the elements of every remaining page.
    pub async fn collect_all(mut self) -> GitHubResult<Vec<Value>> {
        let mut all_items = Vec::new();
        while let Some(page) = self.next_page().await? {
            all_items.extend(page.into_items());
        }
        Ok(all_items)
    }

    /// Turns the paginator into a stream of elements across pages.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = GitHubResult<Value>> + 'a {
        stream::unfold(Some(self), |state| async move {
            let mut pager = state?;
            match pager.next_page().await {
                Ok(Some(page)) => {
                    let items: Vec<GitHubResult<Value>> =
                        page.into_items().into_iter().map(Ok).collect();
                    Some((items, Some(pager)))
                }
                Ok(None) => None,
                Err(e) => Some((vec![Err(e)], None)),
            }
        })
        .flat_map(stream::iter)
    }
}
