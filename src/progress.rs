//! Terminal progress reporting with indicatif.
//!
//! The pipeline announces its phases through [`ProgressCallback`]; the
//! [`Progress`] reporter renders them as a spinner (while enumerating) or a
//! bar (hashing, resolving, deleting). Library callers can supply their own
//! callback or none at all.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Phase names reported by the pipeline.
pub mod phase {
    /// Walking the directory for candidate files.
    pub const ENUMERATE: &str = "enumerate";
    /// Decoding and fingerprinting images.
    pub const HASH: &str = "hash";
    /// Applying the retention policy to each group.
    pub const RESOLVE: &str = "resolve";
    /// Removing discarded files.
    pub const DELETE: &str = "delete";
}

/// Receives progress updates from the pipeline.
///
/// Callbacks may be invoked from worker threads.
pub trait ProgressCallback: Send + Sync {
    /// A phase begins with `total` items (0 when unknown).
    fn on_phase_start(&self, phase: &str, total: usize);

    /// `current` items of the running phase are done; `path` was the latest.
    fn on_progress(&self, current: usize, path: &str);

    /// The phase has finished.
    fn on_phase_end(&self, phase: &str);

    /// Free-form status line.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a reporter; `quiet` suppresses all output.
    ///
    /// ```
    /// use imgsieve::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self {
            multi,
            active: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn with_active(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.active.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = if phase == phase::ENUMERATE {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::bar_style());
            pb
        };
        pb.set_message(match phase {
            phase::ENUMERATE => "Finding images".to_string(),
            phase::HASH => "Hashing".to_string(),
            phase::RESOLVE => "Choosing survivors".to_string(),
            phase::DELETE => "Deleting".to_string(),
            other => other.to_string(),
        });

        if let Ok(mut active) = self.active.lock() {
            if let Some(previous) = active.replace(pb) {
                previous.finish_and_clear();
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        let message = truncate_path(path, 30);
        self.with_active(|pb| {
            pb.set_position(current as u64);
            pb.set_message(message);
        });
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        if let Ok(mut active) = self.active.lock() {
            if let Some(pb) = active.take() {
                pb.finish_with_message(format!("{phase} complete"));
            }
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        let message = message.to_string();
        self.with_active(|pb| pb.set_message(message));
    }
}

/// Shorten a path to its file name when it does not fit.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let chars: Vec<char> = file_name.chars().collect();
    if chars.len() + 4 > max_len {
        let keep = max_len.saturating_sub(3);
        let tail: String = chars[chars.len().saturating_sub(keep)..].iter().collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_path_unchanged() {
        assert_eq!(truncate_path("a/b.png", 30), "a/b.png");
    }

    #[test]
    fn test_truncate_long_directory() {
        let path = "/very/long/directory/structure/that/goes/on/photo.png";
        assert_eq!(truncate_path(path, 30), ".../photo.png");
    }

    #[test]
    fn test_truncate_long_file_name() {
        let path = "/d/an_extremely_long_file_name_for_a_photo.png";
        let out = truncate_path(path, 20);
        assert!(out.starts_with("..."));
        assert_eq!(out.chars().count(), 20);
        assert!(out.ends_with("photo.png"));
    }

    #[test]
    fn test_quiet_progress_ignores_events() {
        let progress = Progress::new(true);
        progress.on_phase_start(phase::HASH, 10);
        progress.on_progress(1, "x.png");
        progress.on_phase_end(phase::HASH);
        assert!(progress.active.lock().unwrap().is_none());
    }
}
