use canvasync_core::{Connect, CookieJar, Session};
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::saml::{Credentials, SamlFlow};
use crate::store::SessionStore;

/// Produces an authenticated [`Session`], reusing a stored jar when it is still live.
pub struct Authenticator<K> {
    connector: K,
    store: SessionStore,
    login_url: String,
}

impl<K: Connect> Authenticator<K> {
    pub fn new(connector: K, store: SessionStore, login_url: impl Into<String>) -> Self {
        Self {
            connector,
            store,
            login_url: login_url.into(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Sign in to `target`, or reuse the stored session if probing `target` returns `200`.
    pub async fn authenticate(
        &self,
        target: &str,
        credentials: &Credentials,
    ) -> Result<Session<K::Client>, AuthError> {
        match self.store.load() {
            Ok(Some(jar)) => {
                let session = Session::new(self.connector.connect(&jar)?, jar);
                if self.store.probe(&session, target).await {
                    info!(path = %self.store.path().display(), "reusing stored session");
                    return Ok(session);
                }
                debug!("stored session is no longer valid");
            }
            Ok(None) => debug!(path = %self.store.path().display(), "no stored session"),
            Err(e) => warn!(error = %e, "ignoring unreadable cookie jar"),
        }

        let jar = CookieJar::default();
        let client = self.connector.connect(&jar)?;
        SamlFlow::new(&client, &self.login_url)
            .run(target, credentials)
            .await?;
        self.store.save(&jar)?;

        Ok(Session::new(client, jar))
    }
}
