use std::collections::HashSet;
use std::path::PathBuf;

use canvasync_core::{HttpClient, Session};
use serde::de::DeserializeOwned;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::container::{Container, Platform, classify, extract_env};
use crate::error::{Result, WalkError};
use crate::listing::{ChildFolder, FilesEnv, FolderListing, RemoteFile, single_page, strip_guard};
use crate::sanitize::sanitize;

/// Items Canvas returns per page when `per_page` is not given.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// A remote file and where it belongs locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Download URL; Canvas omits it for files the user may not fetch.
    pub url: Option<String>,
    /// Relative path built from sanitized folder and file names.
    pub path: PathBuf,
}

/// A folder endpoint waiting to be listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub url: String,
    pub prefix: PathBuf,
}

/// Walks Canvas folder trees with an authenticated session.
#[derive(Debug, Clone)]
pub struct TreeWalker<C> {
    session: Session<C>,
    platform: Platform,
    page_size: u64,
}

impl<C: HttpClient + Clone + 'static> TreeWalker<C> {
    pub fn new(session: Session<C>, platform: Platform) -> Self {
        Self {
            session,
            platform,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Every file storage root the user can see, from the `/files` page.
    ///
    /// Entries with an unrecognised asset string are logged and skipped.
    pub async fn list_containers(&self) -> Result<Vec<Container>> {
        let url = self.platform.files_page()?.to_string();
        let page = self.session.client().get(&url).await.map_err(|source| WalkError::Http {
            url: url.clone(),
            source,
        })?;
        if !page.is_ok() {
            return Err(WalkError::Status { url, status: page.status });
        }

        let blob = extract_env(&page.body).ok_or_else(|| WalkError::ConfigMissing { url: url.clone() })?;
        let env: FilesEnv = serde_json::from_str(blob).map_err(|source| WalkError::Json { url, source })?;

        let containers = env
            .contexts
            .into_iter()
            .filter_map(|ctx| {
                let container = classify(&ctx.asset_string, &ctx.name);
                if container.is_none() {
                    warn!(asset_string = %ctx.asset_string, name = %ctx.name, "unknown resource type, skipping");
                }
                container
            })
            .collect();
        Ok(containers)
    }

    /// Walk every container concurrently, one task each, and merge the results.
    ///
    /// Results are merged in container order. Paths are unique across the
    /// merged list: a repeat from a later container gets a numbered name.
    pub async fn walk_all(&self, containers: Vec<Container>) -> Vec<FileEntry> {
        let mut tasks = JoinSet::new();
        for (index, container) in containers.into_iter().enumerate() {
            let walker = self.clone();
            tasks.spawn(async move { (index, walker.walk(&container).await) });
        }

        let mut walked = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => walked.push(result),
                Err(e) => warn!(error = %e, "folder walk task did not finish"),
            }
        }
        walked.sort_unstable_by_key(|(index, _)| *index);

        let mut seen = HashSet::new();
        walked
            .into_iter()
            .flat_map(|(_, entries)| entries)
            .map(|mut entry| {
                entry.path = unique_path(&mut seen, entry.path);
                entry
            })
            .collect()
    }

    /// List every file below `container`'s root folder.
    ///
    /// A folder that cannot be listed is logged and its subtree left out;
    /// the rest of the tree is still walked.
    pub async fn walk(&self, container: &Container) -> Vec<FileEntry> {
        info!(kind = %container.kind, name = %container.name, "processing");
        let root = match self.platform.root_folder(container) {
            Ok(url) => FolderNode {
                url: url.into(),
                prefix: PathBuf::from(sanitize(&container.name)),
            },
            Err(e) => {
                warn!(error = %e, "skipping container");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            match self.expand(&node).await {
                Ok((children, entries)) => {
                    files.extend(entries.into_iter().map(|mut entry| {
                        entry.path = unique_path(&mut seen, entry.path);
                        entry
                    }));
                    pending.extend(children.into_iter().rev());
                }
                Err(e) => warn!(url = %node.url, error = %e, "failed to get folder listing"),
            }
        }

        debug!(name = %container.name, files = files.len(), "walked container");
        files
    }

    /// List one folder: its files and the child folders still to visit.
    async fn expand(&self, node: &FolderNode) -> Result<(Vec<FolderNode>, Vec<FileEntry>)> {
        let folder: FolderListing = self.fetch_json(&node.url).await?;

        let mut files = Vec::new();
        if let Some(files_url) = folder.files_url.as_deref().filter(|_| folder.files_count != Some(0)) {
            let url = single_page(files_url, folder.files_count, self.page_size)?;
            match self.fetch_json::<Vec<RemoteFile>>(&url).await {
                Ok(listing) => {
                    files = listing
                        .into_iter()
                        .map(|file| FileEntry {
                            url: file.url.filter(|u| !u.is_empty()),
                            path: node.prefix.join(sanitize(&file.display_name)),
                        })
                        .collect();
                }
                Err(e) => warn!(%url, error = %e, "failed to get file listing"),
            }
        }

        let mut children = Vec::new();
        if let Some(folders_url) = folder.folders_url.as_deref().filter(|_| folder.folders_count != Some(0)) {
            let url = single_page(folders_url, folder.folders_count, self.page_size)?;
            match self.fetch_json::<Vec<ChildFolder>>(&url).await {
                Ok(listing) => {
                    for child in listing {
                        match child.url() {
                            Some(child_url) => children.push(FolderNode {
                                url: child_url.to_string(),
                                prefix: node.prefix.join(sanitize(&child.name)),
                            }),
                            None => warn!(name = %child.name, "folder has no listing URL, skipping"),
                        }
                    }
                }
                Err(e) => warn!(%url, error = %e, "failed to get subfolder listing"),
            }
        }

        Ok((children, files))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let page = self.session.client().get(url).await.map_err(|source| WalkError::Http {
            url: url.to_string(),
            source,
        })?;
        if !page.is_ok() {
            return Err(WalkError::Status {
                url: url.to_string(),
                status: page.status,
            });
        }
        serde_json::from_str(strip_guard(&page.body)).map_err(|source| WalkError::Json {
            url: url.to_string(),
            source,
        })
    }
}

/// Keep canonical paths unique within one container by numbering repeats.
fn unique_path(seen: &mut HashSet<PathBuf>, path: PathBuf) -> PathBuf {
    if seen.insert(path.clone()) {
        return path;
    }

    let parent = path.parent().map(PathBuf::from).unwrap_or_default();
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 2;
    loop {
        let candidate = parent.join(format!("{stem} ({n}){extension}"));
        if seen.insert(candidate.clone()) {
            warn!(original = %path.display(), renamed = %candidate.display(), "duplicate file name");
            return candidate;
        }
        n += 1;
    }
}
