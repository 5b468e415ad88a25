use std::path::PathBuf;

use canvasync_core::HttpError;

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("request to {url} failed: {source}")]
    Http { url: String, source: HttpError },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("no embedded ENV configuration on {url}")]
    ConfigMissing { url: String },

    #[error("malformed JSON from {url}: {source}")]
    Json {
        url: String,
        source: serde_json::Error,
    },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("path '{path}' escapes '{base}'")]
    Escape { path: PathBuf, base: PathBuf },
}

pub type Result<T> = std::result::Result<T, WalkError>;
