//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while tables are scanned
#[derive(Debug)]
pub struct ProgressReporter {
    spinner: Option<ProgressBar>,
    total: usize,
    done: usize,
}

impl ProgressReporter {
    /// Reporter for scanning `total` tables
    pub fn new_for_tables(total: usize) -> Self {
        Self {
            spinner: Some(create_spinner("Scanning tables...")),
            total,
            done: 0,
        }
    }

    /// Reporter that shows nothing
    pub fn new_minimal() -> Self {
        Self {
            spinner: None,
            total: 0,
            done: 0,
        }
    }

    pub fn start_table(&mut self, table: &str) {
        if let Some(pb) = &self.spinner {
            pb.set_message(format!("[{}/{}] Scanning {}", self.done + 1, self.total, table));
        }
    }

    pub fn finish_table(&mut self) {
        self.done += 1;
    }

    pub fn done(&self) -> usize {
        self.done
    }

    /// Remove the spinner so that statements can be printed cleanly.
    pub fn finish(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Create a spinner progress bar on stderr
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
