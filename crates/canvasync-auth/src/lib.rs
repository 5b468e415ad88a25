//! Session persistence and SAML single-sign-on for canvasync.
//!
//! - `store.rs` - Per-host cookie jar on disk with a liveness probe
//! - `saml.rs` - The linear redirect/form-post handshake
//! - `extract.rs` - Markup scraping for hidden form fields and form targets
//!
//! [`Authenticator::authenticate`] ties them together: it reuses a stored
//! jar when the probe accepts it, otherwise signs in and saves the result.

mod authenticator;
mod error;
mod extract;
mod saml;
mod store;

pub use authenticator::Authenticator;
pub use error::{AuthError, ExtractError, SessionError};
pub use extract::{decode_entities, extract_assertion, extract_form_action, hidden_field};
pub use saml::{AuthStep, Credentials, DEFAULT_LOGIN_URL, SamlFlow};
pub use store::SessionStore;
