use std::io;
use std::path::Path;

use bytes::BytesMut;
use canvasync_core::{Download, HttpClient, Session};
use futures_util::StreamExt;
use tempfile::{NamedTempFile, TempPath};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, trace, warn};

use crate::error::FetchError;
use crate::options::DownloadOptions;
use crate::progress::Progress;
use crate::tracker::{ProgressTracker, ProgressTrackerBuilder};

/// Terminal state of one download.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The destination already existed, or another download placed it first.
    Skipped,
    Completed { bytes: u64 },
    Failed(FetchError),
}

impl DownloadOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DownloadOutcome::Completed { .. })
    }
}

/// Download `url` to `destination` unless something is already there.
///
/// The body is streamed into a `.part` file of its own beside `destination`,
/// one `chunk_size` write at a time, each flushed and synced before the next.
/// Only a complete body is moved into place, and never over an existing
/// file. On failure the partial file is removed so a later run will try again.
pub async fn download<C: HttpClient>(
    session: &Session<C>,
    url: &str,
    destination: &Path,
    options: &DownloadOptions,
) -> DownloadOutcome {
    if fs::try_exists(destination).await.unwrap_or(false) {
        if options.show_existing {
            info!(path = %destination.display(), "already exists on disk");
        } else {
            debug!(path = %destination.display(), "already exists on disk");
        }
        return DownloadOutcome::Skipped;
    }

    match fetch(session, url, destination, options).await {
        Ok(bytes) => {
            info!(path = %destination.display(), bytes, "downloaded");
            DownloadOutcome::Completed { bytes }
        }
        Err(FetchError::AlreadyPlaced { .. }) => {
            debug!(path = %destination.display(), "placed by another download meanwhile");
            DownloadOutcome::Skipped
        }
        Err(e) => {
            warn!(path = %destination.display(), %url, error = %e, "download failed");
            DownloadOutcome::Failed(e)
        }
    }
}

async fn fetch<C: HttpClient>(
    session: &Session<C>,
    url: &str,
    destination: &Path,
    options: &DownloadOptions,
) -> Result<u64, FetchError> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).await.map_err(FetchError::io(dir))?;

    let response = session.client().stream(url).await?;
    if !(200..300).contains(&response.status) {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status,
        });
    }

    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tracker = options.progress.as_ref().map(|multi| {
        ProgressTrackerBuilder::default()
            .with_prefix(&name)
            .with_len(response.content_length)
            .with_finish("done")
            .build_in(multi)
    });

    // Dropping the staging path removes the partial file.
    let (file, staging) = stage(dir, &name).map_err(FetchError::io(dir))?.into_parts();
    let written = write_staged(
        response,
        File::from_std(file),
        &staging,
        options.chunk_size,
        tracker.as_ref(),
    )
    .await;
    let result = match written {
        Ok(bytes) => place(staging, destination).map(|()| bytes),
        Err(e) => Err(e),
    };

    if let Some(tracker) = tracker {
        match &result {
            Ok(_) => tracker.finish(),
            Err(_) => tracker.abandon("failed"),
        }
    }
    result
}

/// A fresh `.<name>.XXXXXX.part` file in `dir`, unique to this download.
fn stage(dir: &Path, name: &str) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".part")
        .tempfile_in(dir)
}

/// Move a finished staging file onto `destination` unless something got there first.
fn place(staging: TempPath, destination: &Path) -> Result<(), FetchError> {
    staging.persist_noclobber(destination).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            FetchError::AlreadyPlaced {
                path: destination.to_path_buf(),
            }
        } else {
            FetchError::Io {
                path: destination.to_path_buf(),
                source: e.error,
            }
        }
    })
}

async fn write_staged(
    response: Download,
    mut file: File,
    staging: &Path,
    chunk_size: usize,
    tracker: Option<&ProgressTracker>,
) -> Result<u64, FetchError> {
    let mut body = response.body;
    let mut progress = Progress::new(response.content_length);
    let mut buffer = BytesMut::with_capacity(chunk_size);

    while let Some(chunk) = body.next().await {
        buffer.extend_from_slice(&chunk?);
        while buffer.len() >= chunk_size {
            let piece = buffer.split_to(chunk_size);
            write_durably(&mut file, &piece, staging).await?;
            progress.advance(piece.len());
            report(&progress, tracker);
        }
    }
    if !buffer.is_empty() {
        write_durably(&mut file, &buffer, staging).await?;
        progress.advance(buffer.len());
        report(&progress, tracker);
    }

    match progress.total_bytes {
        Some(expected) if !progress.is_complete() => Err(FetchError::Truncated {
            expected,
            actual: progress.bytes_downloaded,
        }),
        _ => Ok(progress.bytes_downloaded),
    }
}

async fn write_durably(file: &mut File, piece: &[u8], path: &Path) -> Result<(), FetchError> {
    file.write_all(piece).await.map_err(FetchError::io(path))?;
    file.flush().await.map_err(FetchError::io(path))?;
    file.sync_data().await.map_err(FetchError::io(path))
}

fn report(progress: &Progress, tracker: Option<&ProgressTracker>) {
    if let Some(tracker) = tracker {
        tracker.update(progress);
    }
    if let Some(percent) = progress.percentage() {
        trace!(bytes = progress.bytes_downloaded, percent, "progress");
    }
}
