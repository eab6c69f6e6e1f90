use crate::deletion::DeletionOutcome;

/// Trait for reporting pipeline progress.
///
/// The CLI implements it with indicatif spinners. All methods have default
/// no-op implementations.
pub trait PipelineReporter: Send + Sync {
    fn on_fetch_start(&self) {}
    fn on_fetch_complete(&self, _files: usize, _duration_secs: f64) {}
    fn on_ingest_complete(&self, _rows: usize, _duration_secs: f64) {}
    fn on_delete_start(&self, _total: usize) {}
    fn on_file_deleted(&self, _outcome: &DeletionOutcome) {}
    fn on_delete_complete(&self, _deleted: usize, _failed: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl PipelineReporter for SilentReporter {}
