//! Error types for canvasync-fetch.

use std::io;
use std::path::PathBuf;

use canvasync_core::HttpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no download URL")]
    MissingUrl,

    #[error("download failed: {0}")]
    Network(#[from] HttpError),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("body ended after {actual} of {expected} bytes")]
    Truncated { expected: u64, actual: u64 },

    #[error("'{path}' was placed by another download")]
    AlreadyPlaced { path: PathBuf },

    #[error("file I/O error on '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| FetchError::Io { path, source }
    }
}
