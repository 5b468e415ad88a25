//! Streaming downloads for canvasync.
//!
//! # Key Features
//!
//! - **Skip Existing**: a destination that already exists costs no request
//! - **Atomic Placement**: bodies stream into a `.part` sibling that is renamed on success
//! - **Durable Chunks**: every fixed-size chunk is flushed and synced before the next
//! - **Fan-out**: contiguous chunks of the task list run on parallel workers

mod error;
mod fanout;
mod fetcher;
mod options;
mod progress;
mod tracker;

pub use error::FetchError;
pub use fanout::{DownloadTask, Report, download_all, partition};
pub use fetcher::{DownloadOutcome, download};
pub use options::{DEFAULT_CHUNK_SIZE, DownloadOptions};
pub use progress::Progress;
pub use tracker::{ProgressTracker, ProgressTrackerBuilder};
