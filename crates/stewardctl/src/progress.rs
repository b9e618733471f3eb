//! Spinner shown while a pipeline step runs.
//!
//! Only drawn when stdout is a terminal and NO_COLOR is unset, so piped
//! and `--json` output stay clean. Timing works either way.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

pub struct ProgressIndicator {
    spinner: Option<ProgressBar>,
    start_time: Instant,
}

impl ProgressIndicator {
    pub fn new(message: &str) -> Self {
        Self::with_enabled(message, spinner_allowed())
    }

    /// Timing only, never draws
    pub fn hidden(message: &str) -> Self {
        Self::with_enabled(message, false)
    }

    fn with_enabled(message: &str, enabled: bool) -> Self {
        let spinner = if enabled {
            let pb = ProgressBar::new_spinner();

            let ticks: &[&str] = if console::Term::stdout().features().wants_emoji() {
                &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]
            } else {
                &["|", "/", "-", "\\"]
            };
            if let Ok(style) = ProgressStyle::default_spinner()
                .tick_strings(ticks)
                .template("{spinner} {msg}")
            {
                pb.set_style(style);
            }

            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(80));
            Some(pb)
        } else {
            None
        };

        Self {
            spinner,
            start_time: Instant::now(),
        }
    }

    pub fn update_message(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Hide the spinner while `f` writes to the terminal
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(f),
            None => f(),
        }
    }

    /// Clear the spinner line; callers print their own result line
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn is_enabled(&self) -> bool {
        self.spinner.is_some()
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        self.finish();
    }
}

fn spinner_allowed() -> bool {
    console::Term::stdout().is_term() && std::env::var_os("NO_COLOR").is_none()
}
