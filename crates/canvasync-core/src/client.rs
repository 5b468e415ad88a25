use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cookie_store::CookieStore;
use futures_util::StreamExt;
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Proxy, Response, Url};
use reqwest_cookie_store::CookieStoreMutex;

use crate::error::{ClientSettingError, HttpError, JarError};
use crate::http::{Download, HttpClient, Page};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Shared, thread-safe cookie jar wired into every request of a client.
#[derive(Clone)]
pub struct CookieJar(Arc<CookieStoreMutex>);

impl CookieJar {
    pub fn from_store(store: CookieStore) -> Self {
        Self(Arc::new(CookieStoreMutex::new(store)))
    }

    /// Run `f` with the underlying store locked.
    pub fn with_store<R>(&self, f: impl FnOnce(&CookieStore) -> R) -> Result<R, JarError> {
        let store = self.0.lock().map_err(|_| JarError)?;
        Ok(f(&store))
    }

    /// Number of cookies held, including session-only and expired ones.
    pub fn len(&self) -> usize {
        self.with_store(|store| store.iter_any().count()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::from_store(CookieStore::default())
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar").field("cookies", &self.len()).finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClientSetting {
    pub proxies: Option<Vec<Url>>,
    pub user_agent: Option<String>,
    pub connect_timeout: Option<Duration>,
}

impl ClientSetting {
    /// Build a client that reads and writes cookies through `jar`.
    ///
    /// TLS certificate verification stays enabled; there is no switch to turn it off.
    pub fn build(&self, jar: &CookieJar) -> Result<ReqwestClient, ClientSettingError> {
        let client = self.builder(jar)?.build().map_err(ClientSettingError::Build)?;
        let probe = self
            .builder(jar)?
            .redirect(Policy::none())
            .build()
            .map_err(ClientSettingError::Build)?;
        Ok(ReqwestClient { client, probe })
    }

    fn builder(&self, jar: &CookieJar) -> Result<ClientBuilder, ClientSettingError> {
        let mut cb = Client::builder()
            .cookie_provider(Arc::clone(&jar.0))
            .user_agent(self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT));

        if let Some(timeout) = self.connect_timeout {
            cb = cb.connect_timeout(timeout);
        }

        if let Some(proxies) = &self.proxies {
            let (secure, insecure): (Vec<&Url>, Vec<&Url>) =
                proxies.iter().partition(|u| u.scheme() == "https");

            for u in secure {
                cb = cb.proxy(Proxy::https(u.as_str()).map_err(|source| {
                    ClientSettingError::Proxy {
                        url: u.to_string(),
                        source,
                    }
                })?);
            }

            for u in insecure {
                cb = cb.proxy(Proxy::http(u.as_str()).map_err(|source| {
                    ClientSettingError::Proxy {
                        url: u.to_string(),
                        source,
                    }
                })?);
            }
        }

        Ok(cb)
    }
}

/// Builds an [`HttpClient`] bound to a cookie jar.
///
/// The authenticator holds one of these so it can open a client for a
/// rehydrated jar first and, if that session is stale, for a fresh one.
pub trait Connect: Send + Sync {
    type Client: HttpClient + Clone + 'static;

    fn connect(&self, jar: &CookieJar) -> Result<Self::Client, ClientSettingError>;
}

impl Connect for ClientSetting {
    type Client = ReqwestClient;

    fn connect(&self, jar: &CookieJar) -> Result<ReqwestClient, ClientSettingError> {
        self.build(jar)
    }
}

/// Production HTTP client implementation using reqwest.
///
/// Both inner clients share one cookie jar; `probe` never follows redirects.
#[derive(Clone, Debug)]
pub struct ReqwestClient {
    client: Client,
    probe: Client,
}

impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Page, HttpError> {
        let response = self.client.get(parse(url)?).send().await?;
        into_page(response).await
    }

    async fn head(&self, url: &str) -> Result<u16, HttpError> {
        let response = self.probe.head(parse(url)?).send().await?;
        Ok(response.status().as_u16())
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Page, HttpError> {
        let response = self.client.post(parse(url)?).form(form).send().await?;
        into_page(response).await
    }

    async fn stream(&self, url: &str) -> Result<Download, HttpError> {
        let response = self.client.get(parse(url)?).send().await?;
        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body = response.bytes_stream().map(|chunk| chunk.map_err(HttpError::from));

        Ok(Download {
            status,
            content_length,
            body: Box::pin(body),
        })
    }
}

fn parse(url: &str) -> Result<Url, HttpError> {
    Url::parse(url).map_err(|e| HttpError::InvalidUrl(format!("{url}: {e}")))
}

async fn into_page(response: Response) -> Result<Page, HttpError> {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let body = response.text().await?;
    tracing::trace!(status, %url, len = body.len(), "response received");
    Ok(Page { status, url, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `/idp/login` with 200 and redirects every other path there.
    async fn redirecting_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let mut read = 0;
                    while read < buf.len() {
                        let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        read += n;
                        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                    let request = String::from_utf8_lossy(&buf[..read]);
                    let path = request.split_whitespace().nth(1).unwrap_or("/");
                    let response = if path == "/idp/login" {
                        "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nlogin"
                    } else {
                        "HTTP/1.1 302 Found\r\nLocation: /idp/login\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    };
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn head_reports_the_redirect_itself() {
        let base = redirecting_server().await;
        let client = ClientSetting::default().build(&CookieJar::default()).unwrap();

        assert_eq!(client.head(&base).await.unwrap(), 302);

        let page = client.get(&base).await.unwrap();
        assert_eq!(page.status, 200);
        assert!(page.url.ends_with("/idp/login"));
        assert_eq!(page.body, "login");
    }

    #[test]
    fn fresh_jar_is_empty() {
        let jar = CookieJar::default();
        assert!(jar.is_empty());
    }

    #[test]
    fn jar_clones_share_cookies() {
        let jar = CookieJar::default();
        let other = jar.clone();
        let url = Url::parse("https://canvas.example.edu/").unwrap();
        jar.0
            .lock()
            .unwrap()
            .parse("canvas_session=abc; Path=/", &url)
            .unwrap();
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn builds_with_proxies() {
        let setting = ClientSetting {
            proxies: Some(vec![
                Url::parse("http://127.0.0.1:3128").unwrap(),
                Url::parse("https://127.0.0.1:3129").unwrap(),
            ]),
            ..ClientSetting::default()
        };
        assert!(setting.build(&CookieJar::default()).is_ok());
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(matches!(parse("not a url"), Err(HttpError::InvalidUrl(_))));
    }
}
