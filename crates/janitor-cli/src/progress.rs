use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

use janitor_core::deletion::{DeletionOutcome, DeletionStatus};
use janitor_core::PipelineReporter;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif.
///
/// - Fetch phase: spinner (listing size unknown until the last page)
/// - Delete phase: progress bar, one tick per file outcome
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICKS);
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl PipelineReporter for CliReporter {
    fn on_fetch_start(&self) {
        self.set_bar(Self::spinner("Fetching drive listing..."));
    }

    fn on_fetch_complete(&self, files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Fetch complete: {} files in {:.2}s",
            files, duration_secs
        );
    }

    fn on_ingest_complete(&self, rows: usize, duration_secs: f64) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Database write complete: {} records in {:.2}s",
            rows, duration_secs
        );
    }

    fn on_delete_start(&self, total: usize) {
        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "  {spinner:.cyan} Deleting [{bar:30.red/dim}] {pos}/{len} files",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─")
        .tick_chars(TICKS);
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_file_deleted(&self, outcome: &DeletionOutcome) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                if outcome.status == DeletionStatus::Failed {
                    pb.println(format!(
                        "  \x1b[31m✗\x1b[0m {} ({}): {}",
                        outcome.file_name,
                        outcome.file_id,
                        outcome.error.as_deref().unwrap_or("unknown error")
                    ));
                }
                pb.inc(1);
            }
        }
    }

    fn on_delete_complete(&self, deleted: usize, failed: usize) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Delete complete: {} deleted, {} failed",
            deleted, failed
        );
    }
}
