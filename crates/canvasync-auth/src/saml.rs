use std::fmt;

use canvasync_core::{HttpClient, Page};
use tracing::{debug, info};
use url::Url;

use crate::error::{AuthError, ExtractError};
use crate::extract::{extract_assertion, extract_form_action, hidden_field, is_login_form};

/// Shibboleth login endpoint of the University of Auckland identity provider.
pub const DEFAULT_LOGIN_URL: &str =
    "https://iam.auckland.ac.nz/profile/SAML2/Redirect/SSO?execution=e1s1";

/// Steps of the sign-in handshake, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStep {
    Init,
    CredentialSubmit,
    AssertionExtract,
    AssertionSubmit,
    Complete,
}

impl fmt::Display for AuthStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStep::Init => write!(f, "init"),
            AuthStep::CredentialSubmit => write!(f, "credential submit"),
            AuthStep::AssertionExtract => write!(f, "assertion extract"),
            AuthStep::AssertionSubmit => write!(f, "assertion submit"),
            AuthStep::Complete => write!(f, "complete"),
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One pass of the SAML redirect/form-post handshake.
///
/// The flow is strictly linear and makes a single attempt: any transport
/// error, non-2xx status or missing markup ends it. Cookies picked up along
/// the way land in whatever jar the client was built with.
pub struct SamlFlow<'a, C> {
    client: &'a C,
    login_url: &'a str,
}

impl<'a, C: HttpClient> SamlFlow<'a, C> {
    pub fn new(client: &'a C, login_url: &'a str) -> Self {
        Self { client, login_url }
    }

    pub async fn run(&self, target: &str, credentials: &Credentials) -> Result<(), AuthError> {
        debug!(step = %AuthStep::Init, %target, "requesting protected resource");
        let page = self
            .client
            .get(target)
            .await
            .map_err(|source| AuthError::Http { step: AuthStep::Init, source })?;
        ensure_success(AuthStep::Init, &page)?;

        debug!(step = %AuthStep::CredentialSubmit, url = %self.login_url, "submitting credentials");
        let form = [
            ("j_username", credentials.username.as_str()),
            ("j_password", credentials.password.as_str()),
            ("_eventId_proceed", ""),
        ];
        let page = self
            .client
            .post_form(self.login_url, &form)
            .await
            .map_err(|source| AuthError::Http {
                step: AuthStep::CredentialSubmit,
                source,
            })?;

        debug!(step = %AuthStep::AssertionExtract, status = page.status, "reading assertion");
        let assertion = match extract_assertion(&page.body) {
            Ok(assertion) => assertion,
            Err(_) if matches!(page.status, 401 | 403) || is_login_form(&page.body) => {
                return Err(AuthError::Rejected { status: page.status });
            }
            Err(source) => {
                return Err(AuthError::Protocol {
                    step: AuthStep::AssertionExtract,
                    status: page.status,
                    source,
                });
            }
        };
        let action = extract_form_action(&page.body)
            .and_then(|action| resolve_action(&page.url, &action))
            .map_err(|source| AuthError::Protocol {
                step: AuthStep::AssertionExtract,
                status: page.status,
                source,
            })?;
        let relay_state = hidden_field(&page.body, "RelayState").ok();

        debug!(step = %AuthStep::AssertionSubmit, url = %action, "posting assertion");
        let mut form = vec![("SAMLResponse", assertion.as_str())];
        if let Some(relay_state) = relay_state.as_deref() {
            form.push(("RelayState", relay_state));
        }
        let page = self
            .client
            .post_form(&action, &form)
            .await
            .map_err(|source| AuthError::Http {
                step: AuthStep::AssertionSubmit,
                source,
            })?;
        ensure_success(AuthStep::AssertionSubmit, &page)?;

        info!(step = %AuthStep::Complete, user = %credentials.username, "signed in");
        Ok(())
    }
}

/// Resolve a possibly relative form `action` against the page it came from.
fn resolve_action(page_url: &str, action: &str) -> Result<String, ExtractError> {
    Url::parse(page_url)
        .and_then(|base| base.join(action))
        .map(String::from)
        .map_err(|_| ExtractError::InvalidAction(action.to_string()))
}

fn ensure_success(step: AuthStep, page: &Page) -> Result<(), AuthError> {
    if page.is_success() {
        Ok(())
    } else {
        Err(AuthError::Status {
            step,
            status: page.status,
            url: page.url.clone(),
        })
    }
}
