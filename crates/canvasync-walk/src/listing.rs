//! Wire types for Canvas folder and file listings.

use serde::Deserialize;
use url::Url;

use crate::error::{Result, WalkError};

/// Canvas prefixes JSON bodies with this to defeat JSON hijacking.
const JSON_GUARD: &str = "while(1);";

pub(crate) fn strip_guard(body: &str) -> &str {
    let trimmed = body.trim_start();
    trimmed.strip_prefix(JSON_GUARD).unwrap_or(trimmed)
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilesEnv {
    #[serde(rename = "FILES_CONTEXTS", default)]
    pub contexts: Vec<FilesContext>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilesContext {
    pub asset_string: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FolderListing {
    pub files_url: Option<String>,
    pub folders_url: Option<String>,
    pub files_count: Option<u64>,
    pub folders_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChildFolder {
    pub name: String,
    pub folders_url: Option<String>,
}

impl ChildFolder {
    /// The folder's own endpoint: its `folders_url` without the trailing `/folders`.
    pub fn url(&self) -> Option<&str> {
        self.folders_url
            .as_deref()
            .and_then(|u| u.strip_suffix("/folders"))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoteFile {
    pub display_name: String,
    pub url: Option<String>,
}

/// Ask for everything in one page when `count` exceeds the default page size.
pub(crate) fn single_page(url: &str, count: Option<u64>, page_size: u64) -> Result<String> {
    let mut parsed = Url::parse(url).map_err(|source| WalkError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    if let Some(count) = count.filter(|&c| c > page_size) {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(k, _)| k != "per_page")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        parsed
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("per_page", &count.to_string());
    }

    Ok(parsed.into())
}
