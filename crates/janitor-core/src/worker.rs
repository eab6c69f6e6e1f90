use chrono::Utc;
use crossbeam_channel::{unbounded, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

use crate::analysis::{analyze_pending, RuleSet};
use crate::config::AnalysisConfig;
use crate::error::Error;
use crate::notify::{Change, ChangeNotifier};
use crate::storage::Database;

#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub owner_id: String,
}

/// Background thread that runs one analysis pass per submitted job on its
/// own database connection. Submitting never blocks the caller.
pub struct AnalysisWorker {
    sender: Option<Sender<AnalysisJob>>,
    handle: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    pub fn spawn(
        db_path: &str,
        config: &AnalysisConfig,
        notifier: ChangeNotifier,
    ) -> Result<Self, Error> {
        let db = Database::open(db_path)?;
        let rules = RuleSet::from_config(config);
        let batch_size = config.batch_size;
        let (sender, receiver) = unbounded::<AnalysisJob>();

        let handle = thread::Builder::new()
            .name("analysis-worker".to_string())
            .spawn(move || {
                debug!("Analysis worker started");
                for job in receiver {
                    info!("Starting file analysis for user: {}", job.owner_id);
                    match analyze_pending(&db, &job.owner_id, &rules, batch_size, Utc::now()) {
                        Ok(summary) => notifier.publish(Change::AnalysisCompleted {
                            owner_id: job.owner_id,
                            files: summary.files_analyzed,
                            recommendations: summary.recommendations,
                        }),
                        Err(e) => {
                            error!("Error in file analysis for {}: {}", job.owner_id, e);
                            notifier.publish(Change::AnalysisFailed {
                                owner_id: job.owner_id,
                                error: e.to_string(),
                            });
                        }
                    }
                }
                debug!("Analysis worker stopped");
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queue an analysis pass. Returns false if the worker has stopped.
    pub fn submit(&self, owner_id: &str) -> bool {
        let job = AnalysisJob {
            owner_id: owner_id.to_string(),
        };
        match &self.sender {
            Some(sender) => sender.send(job).is_ok(),
            None => false,
        }
    }

    /// Stop accepting jobs and wait for queued ones to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Analysis worker panicked");
            }
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
