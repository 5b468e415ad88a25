use std::fmt;

use crate::client::CookieJar;
use crate::http::HttpClient;

/// An HTTP client whose cookie jar holds an authenticated session.
///
/// Cloning is cheap: both the client and the jar share their state.
#[derive(Clone)]
pub struct Session<C> {
    client: C,
    jar: CookieJar,
}

impl<C: HttpClient> Session<C> {
    pub fn new(client: C, jar: CookieJar) -> Self {
        Self { client, jar }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }
}

impl<C> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("jar", &self.jar).finish_non_exhaustive()
    }
}
