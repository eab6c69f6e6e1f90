use crossbeam_channel::unbounded;
use rayon::prelude::*;
use serde::Serialize;
use std::thread;
use tracing::{debug, error, info, warn};

use crate::drive::RemoteStore;
use crate::error::Error;
use crate::progress::PipelineReporter;
use crate::storage::models::FileRecord;
use crate::storage::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionStatus {
    Deleted,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionOutcome {
    pub file_id: i64,
    pub file_name: String,
    pub status: DeletionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub outcomes: Vec<DeletionOutcome>,
    pub deleted_count: usize,
    pub failed_count: usize,
}

impl DeletionReport {
    fn from_outcomes(outcomes: Vec<DeletionOutcome>) -> Self {
        let deleted_count = outcomes
            .iter()
            .filter(|o| o.status == DeletionStatus::Deleted)
            .count();
        let failed_count = outcomes.len() - deleted_count;
        Self {
            outcomes,
            deleted_count,
            failed_count,
        }
    }

    pub fn message(&self) -> String {
        format!(
            "Deleted {} files, {} failed",
            self.deleted_count, self.failed_count
        )
    }
}

/// Deletes files remotely, then locally on confirmed remote success.
pub struct DeletionExecutor<'a> {
    db: &'a Database,
    remote: &'a dyn RemoteStore,
    parallelism: usize,
}

impl<'a> DeletionExecutor<'a> {
    pub fn new(db: &'a Database, remote: &'a dyn RemoteStore, parallelism: usize) -> Self {
        Self {
            db,
            remote,
            parallelism: parallelism.max(1),
        }
    }

    /// Delete the owner's files among `file_ids`.
    ///
    /// Ids that don't resolve to one of the owner's records are skipped and
    /// left out of the report. Fails as a whole only when nothing resolves.
    /// Per-file failures never abort sibling deletions.
    pub fn execute(
        &self,
        owner_id: &str,
        access_token: &str,
        file_ids: &[i64],
        reporter: &dyn PipelineReporter,
    ) -> Result<DeletionReport, Error> {
        let files = self.db.get_owned_files(owner_id, file_ids)?;
        if files.is_empty() {
            return Err(Error::InvalidInput("No files found to delete".to_string()));
        }
        if files.len() < file_ids.len() {
            debug!(
                "{} of {} requested ids did not resolve for {}",
                file_ids.len() - files.len(),
                file_ids.len(),
                owner_id
            );
        }

        reporter.on_delete_start(files.len());
        let outcomes = if self.parallelism == 1 {
            self.execute_sequential(access_token, &files, reporter)
        } else {
            self.execute_parallel(access_token, &files, reporter)?
        };

        let report = DeletionReport::from_outcomes(outcomes);
        reporter.on_delete_complete(report.deleted_count, report.failed_count);
        info!("{} for {}", report.message(), owner_id);
        Ok(report)
    }

    fn execute_sequential(
        &self,
        access_token: &str,
        files: &[FileRecord],
        reporter: &dyn PipelineReporter,
    ) -> Vec<DeletionOutcome> {
        files
            .iter()
            .map(|file| {
                let remote_result = self.remote.delete_file(access_token, &file.remote_id);
                let outcome = self.apply(file, remote_result);
                reporter.on_file_deleted(&outcome);
                outcome
            })
            .collect()
    }

    /// Remote calls fan out over a bounded pool; each confirmed result is
    /// applied locally on this thread as it arrives.
    fn execute_parallel(
        &self,
        access_token: &str,
        files: &[FileRecord],
        reporter: &dyn PipelineReporter,
    ) -> Result<Vec<DeletionOutcome>, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .thread_name(|i| format!("delete-{}", i))
            .build()
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        let remote = self.remote;
        let (tx, rx) = unbounded::<(usize, Result<(), Error>)>();
        let mut indexed: Vec<(usize, DeletionOutcome)> = Vec::with_capacity(files.len());

        thread::scope(|scope| {
            let pool = &pool;
            scope.spawn(move || {
                pool.install(|| {
                    files
                        .par_iter()
                        .enumerate()
                        .for_each_with(tx, |tx, (idx, file)| {
                            let result = remote.delete_file(access_token, &file.remote_id);
                            let _ = tx.send((idx, result));
                        });
                });
            });

            for (idx, remote_result) in rx.iter() {
                let outcome = self.apply(&files[idx], remote_result);
                reporter.on_file_deleted(&outcome);
                indexed.push((idx, outcome));
            }
        });

        indexed.sort_by_key(|(idx, _)| *idx);
        Ok(indexed.into_iter().map(|(_, outcome)| outcome).collect())
    }

    fn apply(&self, file: &FileRecord, remote_result: Result<(), Error>) -> DeletionOutcome {
        let failure = match remote_result {
            Ok(()) => match self.db.delete_file(file.id) {
                Ok(_) => {
                    debug!("deleted: {} ({})", file.name, file.remote_id);
                    None
                }
                Err(e) => {
                    error!(
                        "Remote file '{}' deleted but local record {} remains: {}",
                        file.name, file.id, e
                    );
                    Some(format!("local cleanup failed: {}", e))
                }
            },
            Err(e) => {
                warn!("Failed to delete '{}' ({}): {}", file.name, file.remote_id, e);
                Some(e.detail())
            }
        };

        DeletionOutcome {
            file_id: file.id,
            file_name: file.name.clone(),
            status: if failure.is_none() {
                DeletionStatus::Deleted
            } else {
                DeletionStatus::Failed
            },
            error: failure,
        }
    }
}
