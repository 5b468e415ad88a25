//! Parallel download of a flat task list.

use std::path::PathBuf;

use canvasync_core::{HttpClient, Session};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::fetcher::{DownloadOutcome, download};
use crate::options::DownloadOptions;
use crate::tracker::ProgressTracker;

/// A remote file bound to its local destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: Option<String>,
    pub destination: PathBuf,
}

/// Tally of a fan-out run.
#[derive(Debug, Default)]
pub struct Report {
    pub completed: usize,
    pub skipped: usize,
    pub bytes: u64,
    pub failed: Vec<(PathBuf, FetchError)>,
}

impl Report {
    pub fn record(&mut self, destination: PathBuf, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::Skipped => self.skipped += 1,
            DownloadOutcome::Completed { bytes } => {
                self.completed += 1;
                self.bytes += bytes;
            }
            DownloadOutcome::Failed(e) => self.failed.push((destination, e)),
        }
    }

    pub fn merge(&mut self, other: Report) {
        self.completed += other.completed;
        self.skipped += other.skipped;
        self.bytes += other.bytes;
        self.failed.extend(other.failed);
    }

    pub fn total(&self) -> usize {
        self.completed + self.skipped + self.failed.len()
    }
}

/// Split `entries` into at most `workers` contiguous, near-equal chunks.
///
/// Chunk lengths differ by at most one; the leading chunks take the
/// remainder. Empty input yields no chunks and `workers == 0` acts as 1.
pub fn partition<T>(entries: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    let len = entries.len();
    let chunks = workers.max(1).min(len);
    if chunks == 0 {
        return Vec::new();
    }

    let base = len / chunks;
    let remainder = len % chunks;
    let mut entries = entries.into_iter();
    (0..chunks)
        .map(|i| {
            let size = base + usize::from(i < remainder);
            entries.by_ref().take(size).collect()
        })
        .collect()
}

/// Download every task with `workers` parallel workers.
///
/// Each worker takes one contiguous chunk and downloads it sequentially.
/// Returns once every worker has finished. A task without a URL, like any
/// other failure, is recorded and does not affect the rest.
pub async fn download_all<C>(
    session: &Session<C>,
    tasks: Vec<DownloadTask>,
    workers: usize,
    options: &DownloadOptions,
) -> Report
where
    C: HttpClient + Clone + 'static,
{
    let total = tasks.len() as u64;
    let overall = options
        .progress
        .as_ref()
        .map(|multi| ProgressTracker::files(multi, total));

    let mut set = JoinSet::new();
    for (worker, chunk) in partition(tasks, workers).into_iter().enumerate() {
        debug!(worker, files = chunk.len(), "starting worker");
        let session = session.clone();
        let options = options.clone();
        let counter = overall.as_ref().map(ProgressTracker::counter);
        set.spawn(async move {
            let mut report = Report::default();
            for task in chunk {
                let outcome = match task.url.as_deref() {
                    Some(url) => download(&session, url, &task.destination, &options).await,
                    None => {
                        warn!(path = %task.destination.display(), "file has no download URL, skipping");
                        DownloadOutcome::Failed(FetchError::MissingUrl)
                    }
                };
                report.record(task.destination, outcome);
                if let Some(counter) = &counter {
                    counter.step(1);
                }
            }
            report
        });
    }

    let mut report = Report::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(worker_report) => report.merge(worker_report),
            Err(e) => warn!(error = %e, "download worker did not finish"),
        }
    }

    if let Some(overall) = overall {
        overall.finish();
    }
    info!(
        completed = report.completed,
        skipped = report.skipped,
        failed = report.failed.len(),
        "downloads finished"
    );
    report
}
