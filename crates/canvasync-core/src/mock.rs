//! Canned-response [`HttpClient`] for tests.
//!
//! Routes are matched on the exact URL string. HEAD requests use a
//! HEAD-specific status when one is set and fall back to the regular route.
//! Redirect routes answer HEAD with `302`; every other method follows them.
//! Unknown URLs answer `404` with an empty body. Every call is recorded so tests can assert on the
//! requests that were (or were not) issued.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use futures_util::stream;

use crate::client::{Connect, CookieJar};
use crate::error::{ClientSettingError, HttpError};
use crate::http::{Download, HttpClient, Page};

/// Size of the pieces a mocked body is streamed in.
const MOCK_CHUNK: usize = 7 * 1024;

const MAX_REDIRECTS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub form: Vec<(String, String)>,
}

#[derive(Clone, Debug)]
pub struct MockRoute {
    pub status: u16,
    pub body: Bytes,
    /// Overrides the declared `Content-Length`; defaults to the body length.
    pub content_length: Option<u64>,
    /// Streamed bodies fail with a transport error after this many chunks.
    pub fail_after: Option<usize>,
    /// `Location` of a `302`.
    pub redirect: Option<String>,
}

impl MockRoute {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
            content_length: None,
            fail_after: None,
            redirect: None,
        }
    }

    pub fn fail_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }
}

#[derive(Default)]
struct Inner {
    routes: HashMap<String, MockRoute>,
    head_routes: HashMap<String, u16>,
    requests: Vec<RecordedRequest>,
}

#[derive(Clone, Default)]
pub struct MockClient {
    inner: Arc<Mutex<Inner>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `status` and `body`.
    pub fn route(&self, url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> &Self {
        self.route_with(url, MockRoute::new(status, body))
    }

    pub fn route_with(&self, url: impl Into<String>, route: MockRoute) -> &Self {
        self.lock().routes.insert(url.into(), route);
        self
    }

    /// Answer `from` with a `302` pointing at `to`.
    pub fn redirect(&self, from: impl Into<String>, to: impl Into<String>) -> &Self {
        let mut route = MockRoute::new(302, Bytes::new());
        route.redirect = Some(to.into());
        self.route_with(from, route)
    }

    /// Answer HEAD requests for `url` with `status`, leaving other methods alone.
    pub fn route_head(&self, url: impl Into<String>, status: u16) -> &Self {
        self.lock().head_routes.insert(url.into(), status);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, method: Method, url: &str, form: &[(&str, &str)]) -> MockRoute {
        let mut inner = self.lock();
        inner.requests.push(RecordedRequest {
            method,
            url: url.to_string(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        drop(inner);
        self.lookup(url)
    }

    /// Chase redirects the way a browser-like client would.
    fn follow(&self, url: &str, mut route: MockRoute) -> (String, MockRoute) {
        let mut url = url.to_string();
        let mut hops = 0;
        while let Some(location) = route.redirect.take() {
            hops += 1;
            if hops > MAX_REDIRECTS {
                return (url, MockRoute::new(310, Bytes::new()));
            }
            route = self.lookup(&location);
            url = location;
        }
        (url, route)
    }

    fn lookup(&self, url: &str) -> MockRoute {
        self.lock()
            .routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| MockRoute::new(404, Bytes::new()))
    }

    fn page(&self, url: &str, route: MockRoute) -> Page {
        let (url, route) = self.follow(url, route);
        Page {
            status: route.status,
            url,
            body: String::from_utf8_lossy(&route.body).into_owned(),
        }
    }
}

impl HttpClient for MockClient {
    async fn get(&self, url: &str) -> Result<Page, HttpError> {
        let route = self.record(Method::Get, url, &[]);
        Ok(self.page(url, route))
    }

    async fn head(&self, url: &str) -> Result<u16, HttpError> {
        let route = self.record(Method::Head, url, &[]);
        let head = self.lock().head_routes.get(url).copied();
        Ok(head.unwrap_or(route.status))
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Page, HttpError> {
        let route = self.record(Method::Post, url, form);
        Ok(self.page(url, route))
    }

    async fn stream(&self, url: &str) -> Result<Download, HttpError> {
        let route = self.record(Method::Get, url, &[]);
        let (_, route) = self.follow(url, route);
        let content_length = route.content_length.or(Some(route.body.len() as u64));

        let mut chunks: Vec<Result<Bytes, HttpError>> = Vec::new();
        let mut offset = 0;
        while offset < route.body.len() {
            if route.fail_after.is_some_and(|n| chunks.len() >= n) {
                chunks.push(Err(HttpError::Transport("connection reset".into())));
                break;
            }
            let end = (offset + MOCK_CHUNK).min(route.body.len());
            chunks.push(Ok(route.body.slice(offset..end)));
            offset = end;
        }

        Ok(Download {
            status: route.status,
            content_length,
            body: Box::pin(stream::iter(chunks)),
        })
    }
}

/// Hands out the same mock for every jar; cookies are not simulated.
impl Connect for MockClient {
    type Client = MockClient;

    fn connect(&self, _jar: &CookieJar) -> Result<MockClient, ClientSettingError> {
        Ok(self.clone())
    }
}
