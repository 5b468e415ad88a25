use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;

use crate::progress::Progress;

const PB_STYLE: &str = "{spinner:.blue} {prefix:>24.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}";

const FILES_STYLE: &str = "{prefix:>24.green.bold} [{elapsed_precise}] {wide_bar:.green/white} {pos}/{len} files {msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    let pb_style = match ProgressStyle::with_template(PB_STYLE) {
        Ok(pb_style) => pb_style.tick_chars(TICK).progress_chars(PB_CHARS),
        Err(_) => return None,
    };

    Some(pb_style)
});

static FILES_TEMPLATE: Lazy<Option<ProgressStyle>> =
    Lazy::new(|| ProgressStyle::with_template(FILES_STYLE).ok().map(|s| s.progress_chars(PB_CHARS)));

/// A progress bar for one download, or the run's overall file count.
pub struct ProgressTracker {
    pb: ProgressBar,
    finish: Option<String>,
}

impl ProgressTracker {
    /// Overall bar counting finished files.
    pub fn files(multi: &MultiProgress, total: u64) -> Self {
        let pb = ProgressBar::new(total);
        let pb = match FILES_TEMPLATE.as_ref() {
            Some(style) => pb.with_style(style.clone()),
            None => pb,
        };
        pb.set_prefix("Downloading");
        Self {
            pb: multi.add(pb),
            finish: Some("done".to_string()),
        }
    }

    /// A second handle on the same bar, for stepping from another task.
    pub(crate) fn counter(&self) -> Self {
        Self {
            pb: self.pb.clone(),
            finish: None,
        }
    }

    pub fn update(&self, progress: &Progress) {
        self.pb.set_position(progress.bytes_downloaded);
    }

    pub fn step(&self, len: u64) -> &Self {
        self.pb.inc(len);
        self
    }

    pub fn finish(self) {
        match self.finish {
            Some(msg) => self.pb.finish_with_message(msg),
            None => self.pb.finish(),
        }
    }

    pub fn abandon(self, msg: &str) {
        self.pb.abandon_with_message(msg.to_string());
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProgressTrackerBuilder {
    len: Option<u64>,
    prefix: Option<String>,
    finish: Option<String>,
}

impl ProgressTrackerBuilder {
    pub fn with_len(mut self, len: Option<u64>) -> Self {
        self.len = len;
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn with_finish(mut self, finish: &str) -> Self {
        self.finish = Some(finish.to_string());
        self
    }

    /// Build a bar drawn as part of `multi`.
    pub fn build_in(self, multi: &MultiProgress) -> ProgressTracker {
        let pb = match self.len {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        let pb = match PB_TEMPLATE.as_ref() {
            Some(style) => pb.with_style(style.clone()),
            None => pb,
        };

        if let Some(prefix) = self.prefix {
            pb.set_prefix(prefix);
        }
        ProgressTracker {
            pb: multi.add(pb),
            finish: self.finish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    #[test]
    fn bar_follows_progress() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let tracker = ProgressTrackerBuilder::default()
            .with_prefix("report.pdf")
            .with_len(Some(100))
            .build_in(&multi);

        let mut progress = Progress::new(Some(100));
        progress.advance(40);
        tracker.update(&progress);
        assert_eq!(tracker.pb.position(), 40);
        assert_eq!(tracker.pb.length(), Some(100));
    }

    #[test]
    fn finish_message_is_shown() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let tracker = ProgressTrackerBuilder::default()
            .with_len(Some(10))
            .with_finish("done")
            .build_in(&multi);
        let pb = tracker.pb.clone();

        tracker.finish();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "done");
    }

    #[test]
    fn files_bar_counts_steps() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let tracker = ProgressTracker::files(&multi, 3);
        tracker.step(1).step(1);
        assert_eq!(tracker.pb.position(), 2);
        tracker.finish();
    }
}
