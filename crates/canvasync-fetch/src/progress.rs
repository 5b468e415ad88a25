/// Bytes written so far against the declared length of one download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Number of bytes written to the staging file.
    pub bytes_downloaded: u64,

    /// Total expected bytes, if known from the Content-Length header.
    pub total_bytes: Option<u64>,
}

impl Progress {
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self {
            bytes_downloaded: 0,
            total_bytes,
        }
    }

    pub fn advance(&mut self, len: usize) {
        self.bytes_downloaded += len as u64;
    }

    /// Whole-number percentage of completion, capped at 100.
    ///
    /// Returns `None` if `total_bytes` is unknown. An empty body counts as complete.
    #[must_use]
    pub fn percentage(&self) -> Option<u8> {
        self.total_bytes.map(|total| {
            if total == 0 {
                100
            } else {
                (self.bytes_downloaded.saturating_mul(100) / total).min(100) as u8
            }
        })
    }

    /// Returns `true` once the declared length has been reached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_bytes.is_some_and(|total| self.bytes_downloaded >= total)
    }
}
