use std::io;
use std::path::PathBuf;

use canvasync_core::{ClientSettingError, HttpError, JarError};
use thiserror::Error;

use crate::saml::AuthStep;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to access cookie jar '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("cookie jar '{path}' is unreadable: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error(transparent)]
    Jar(#[from] JarError),
}

/// Markup did not contain what the handshake expected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("hidden field `{0}` not found")]
    FieldMissing(String),

    #[error("no form with method=\"post\" found")]
    FormMissing,

    #[error("form action `{0}` is not a usable URL")]
    InvalidAction(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{step} request failed: {source}")]
    Http {
        step: AuthStep,
        #[source]
        source: HttpError,
    },

    #[error("{step} returned HTTP {status} for {url}")]
    Status {
        step: AuthStep,
        status: u16,
        url: String,
    },

    #[error("identity provider rejected the credentials (HTTP {status})")]
    Rejected { status: u16 },

    #[error("unexpected identity provider markup during {step} (HTTP {status}): {source}")]
    Protocol {
        step: AuthStep,
        status: u16,
        #[source]
        source: ExtractError,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Client(#[from] ClientSettingError),
}
