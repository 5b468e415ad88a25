use std::fmt;

use indicatif::MultiProgress;

/// Bytes written (and synced) per step while streaming a body.
pub const DEFAULT_CHUNK_SIZE: usize = 20 * 1024;

/// Configuration shared by every download of a run.
#[derive(Clone)]
pub struct DownloadOptions {
    /// Size of each write. Default: 20 KiB.
    pub chunk_size: usize,

    /// Log skipped files at `info` instead of `debug`.
    pub show_existing: bool,

    /// Render per-file bars into this set; `None` disables bars.
    pub progress: Option<MultiProgress>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            show_existing: false,
            progress: None,
        }
    }
}

impl DownloadOptions {
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn show_existing(mut self, show_existing: bool) -> Self {
        self.show_existing = show_existing;
        self
    }

    pub fn progress(mut self, progress: MultiProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("chunk_size", &self.chunk_size)
            .field("show_existing", &self.show_existing)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
