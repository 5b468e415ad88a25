use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use crate::error::HttpError;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// A fully buffered text response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// HTTP status code of the final response.
    pub status: u16,

    /// URL of the final response, after redirects were followed.
    pub url: String,

    pub body: String,
}

impl Page {
    /// Returns `true` only for `200 OK`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Returns `true` for any 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A streamed response body.
pub struct Download {
    pub status: u16,

    /// Declared `Content-Length`, if the server sent one.
    pub content_length: Option<u64>,

    pub body: BoxStream<'static, Result<Bytes, HttpError>>,
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Asynchronous HTTP client abstraction.
///
/// This trait provides the minimal interface the authenticator, tree walker
/// and downloader need. Implementations follow redirects themselves (except
/// for [`head`](HttpClient::head)) and keep
/// whatever cookies the server sets between calls.
///
/// # Implementations
///
/// - [`ReqwestClient`](crate::ReqwestClient): production implementation using `reqwest`
/// - [`MockClient`](crate::mock::MockClient): canned responses for tests
pub trait HttpClient: Send + Sync {
    /// Issue a GET request and buffer the body as text.
    fn get(&self, url: &str) -> impl Future<Output = Result<Page, HttpError>> + Send;

    /// Issue a HEAD request and return the status code of the first response.
    ///
    /// Redirects are not followed, so a `302` to a login page reads as `302`.
    fn head(&self, url: &str) -> impl Future<Output = Result<u16, HttpError>> + Send;

    /// POST an `application/x-www-form-urlencoded` body and buffer the response.
    fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> impl Future<Output = Result<Page, HttpError>> + Send;

    /// Open a GET request whose body is consumed as a stream of chunks.
    fn stream(&self, url: &str) -> impl Future<Output = Result<Download, HttpError>> + Send;
}
