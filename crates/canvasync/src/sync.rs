//! The two things the binary does: mirror every container, or fetch one URL.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use canvasync_auth::{Authenticator, Credentials, SessionStore};
use canvasync_core::{ClientSetting, ReqwestClient, Session};
use canvasync_fetch::{DownloadOptions, DownloadOutcome, DownloadTask, Report, download, download_all};
use canvasync_walk::{FileEntry, TreeWalker, contained_path, sanitize};
use indicatif::MultiProgress;
use tracing::{info, warn};
use url::Url;

use crate::config::Config;

/// Name used when a URL has no usable last path segment.
const FALLBACK_NAME: &str = "download";

async fn sign_in(config: &Config, target: &Url, credentials: &Credentials) -> Result<Session<ReqwestClient>> {
    let host = target
        .host_str()
        .with_context(|| format!("'{target}' has no host"))?;
    let store = SessionStore::for_host(&config.jar_dir, host);
    let authenticator: Authenticator<ClientSetting> =
        Authenticator::new(config.client_setting(), store, config.login_url.as_str());

    authenticator
        .authenticate(target.as_str(), credentials)
        .await
        .with_context(|| format!("sign-in to {host} failed"))
}

fn options(config: &Config, progress: Option<&MultiProgress>) -> DownloadOptions {
    let options = config.download_options();
    match progress {
        Some(multi) => options.progress(multi.clone()),
        None => options,
    }
}

/// Download every reachable file of every container into `config.output`.
pub async fn sync_all(config: &Config, credentials: &Credentials) -> Result<Report> {
    let platform = config.platform()?;
    let session = sign_in(config, platform.base(), credentials).await?;

    let walker = TreeWalker::new(session.clone(), platform).with_page_size(config.page_size);
    let containers = walker
        .list_containers()
        .await
        .context("failed to list file containers")?;
    info!(containers = containers.len(), "walking containers");

    let entries = walker.walk_all(containers).await;
    let tasks = into_tasks(&config.output, entries);
    info!(files = tasks.len(), workers = config.workers, "starting downloads");

    let multi = config.progress.then(MultiProgress::new);
    let report = download_all(&session, tasks, config.workers, &options(config, multi.as_ref())).await;
    Ok(report)
}

/// Download a single resource behind single sign-on.
pub async fn fetch_one(
    config: &Config,
    credentials: &Credentials,
    url: &Url,
    filename: Option<&str>,
) -> Result<PathBuf> {
    let session = sign_in(config, url, credentials).await?;

    let name = filename.map_or_else(|| file_name_of(url), sanitize);
    let destination = contained_path(&config.output, &name)?;
    let multi = config.progress.then(MultiProgress::new);

    match download(&session, url.as_str(), &destination, &options(config, multi.as_ref())).await {
        DownloadOutcome::Skipped => {
            info!(path = %destination.display(), "already downloaded");
            Ok(destination)
        }
        DownloadOutcome::Completed { .. } => Ok(destination),
        DownloadOutcome::Failed(e) => Err(e).with_context(|| format!("failed to download {url}")),
    }
}

/// Bind each entry to a destination under `output`, dropping any that would escape it.
fn into_tasks(output: &Path, entries: Vec<FileEntry>) -> Vec<DownloadTask> {
    entries
        .into_iter()
        .filter_map(|entry| match contained_path(output, &entry.path) {
            Ok(destination) => Some(DownloadTask {
                url: entry.url,
                destination,
            }),
            Err(e) => {
                warn!(path = %entry.path.display(), error = %e, "skipping entry outside output directory");
                None
            }
        })
        .collect()
}

fn file_name_of(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map_or_else(|| FALLBACK_NAME.to_string(), sanitize)
}

pub fn print_summary(report: &Report) {
    println!(
        "{} files: {} downloaded, {} already present, {} failed",
        report.total(),
        report.completed,
        report.skipped,
        report.failed.len()
    );
    for (path, e) in &report.failed {
        println!("  failed: {} ({e})", path.display());
    }
}
