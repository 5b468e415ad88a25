use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use canvasync_core::{CookieJar, HttpClient, Session};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::SessionError;

/// A cookie jar persisted at an explicit path.
///
/// Session-only cookies are written too, so a later run can skip signing in
/// for as long as the server still honours them.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional `.<host>_cookiejar` file inside `dir`.
    pub fn for_host(dir: impl AsRef<Path>, host: &str) -> Self {
        Self::new(dir.as_ref().join(format!(".{host}_cookiejar")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored jar, or `None` if nothing has been saved yet.
    pub fn load(&self) -> Result<Option<CookieJar>, SessionError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let store = cookie_store::serde::json::load_all(BufReader::new(file)).map_err(|e| {
            SessionError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        let jar = CookieJar::from_store(store);
        debug!(path = %self.path.display(), cookies = jar.len(), "loaded cookie jar");
        Ok(Some(jar))
    }

    /// Returns `true` when `url` itself answers `200 OK` with the session's cookies.
    ///
    /// An expired session is usually bounced to the login page; that redirect
    /// is not followed and counts as expired.
    pub async fn probe<C: HttpClient>(&self, session: &Session<C>, url: &str) -> bool {
        match session.client().head(url).await {
            Ok(status) => {
                debug!(%url, status, "probed stored session");
                status == 200
            }
            Err(e) => {
                warn!(%url, error = %e, "session probe failed");
                false
            }
        }
    }

    /// Persist every cookie in `jar`, replacing the previous file atomically.
    pub fn save(&self, jar: &CookieJar) -> Result<(), SessionError> {
        let io_err = |source: io::Error| SessionError::Io {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        let tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        let mut writer = BufWriter::new(tmp);
        jar.with_store(|store| {
            cookie_store::serde::json::save_incl_expired_and_nonpersistent(store, &mut writer)
        })?
        .map_err(|e| SessionError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        writer.flush().map_err(io_err)?;

        let tmp = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        debug!(path = %self.path.display(), cookies = jar.len(), "saved cookie jar");
        Ok(())
    }
}
