use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::analysis::{analyze_pending, AnalysisSummary, RuleSet};
use crate::config::AppConfig;
use crate::credentials::{require_token, CredentialProvider};
use crate::deletion::{DeletionExecutor, DeletionReport};
use crate::drive::RemoteStore;
use crate::error::Error;
use crate::ingest;
use crate::notify::{Change, ChangeNotifier};
use crate::progress::PipelineReporter;
use crate::recommendations::{self, CleanupSummary};
use crate::storage::models::StorageStats;
use crate::storage::Database;
use crate::worker::AnalysisWorker;

/// Drives the sync → analysis → recommendation → deletion pipeline for any
/// number of owners against one store.
///
/// The background analysis worker opens its own connection to
/// `config.db_path`, so the path must name a real file.
pub struct CleanupEngine {
    config: AppConfig,
    db: Database,
    remote: Arc<dyn RemoteStore>,
    credentials: Box<dyn CredentialProvider>,
    notifier: ChangeNotifier,
    rules: RuleSet,
    worker: Option<AnalysisWorker>,
}

#[derive(Debug)]
pub struct SyncResult {
    pub fetch_duration: Duration,
    pub ingest_duration: Duration,
    pub files_processed: usize,
    /// False when the background worker could not take the job.
    pub analysis_queued: bool,
}

impl CleanupEngine {
    pub fn new(
        config: AppConfig,
        remote: Arc<dyn RemoteStore>,
        credentials: Box<dyn CredentialProvider>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let db = Database::open(&config.db_path)?;
        let notifier = ChangeNotifier::new();
        let worker = AnalysisWorker::spawn(&config.db_path, &config.analysis, notifier.clone())?;
        let rules = RuleSet::from_config(&config.analysis);
        debug!("Cleanup engine ready on {}", config.db_path);

        Ok(Self {
            config,
            db,
            remote,
            credentials,
            notifier,
            rules,
            worker: Some(worker),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Fetch the owner's listing, upsert it, then queue analysis without
    /// waiting for it. Nothing is written unless the fetch succeeds.
    pub fn sync(&self, owner_id: &str, reporter: &dyn PipelineReporter) -> Result<SyncResult, Error> {
        let token = require_token(self.credentials.as_ref(), owner_id)?;

        reporter.on_fetch_start();
        let fetch_start = Instant::now();
        let listing = self.remote.list_files(&token)?;
        let fetch_duration = fetch_start.elapsed();
        reporter.on_fetch_complete(listing.len(), fetch_duration.as_secs_f64());

        let ingest_start = Instant::now();
        let files_processed = ingest::ingest_listing(&self.db, owner_id, listing, Utc::now())?;
        let ingest_duration = ingest_start.elapsed();
        reporter.on_ingest_complete(files_processed, ingest_duration.as_secs_f64());

        self.notifier.publish(Change::FilesChanged {
            owner_id: owner_id.to_string(),
            count: files_processed,
        });

        let analysis_queued = self
            .worker
            .as_ref()
            .map(|worker| worker.submit(owner_id))
            .unwrap_or(false);
        if !analysis_queued {
            warn!("Analysis worker unavailable; {} stays pending", owner_id);
        }

        info!(
            "Sync for {}: {} files in {:.2}s (fetch {:.2}s)",
            owner_id,
            files_processed,
            (fetch_duration + ingest_duration).as_secs_f64(),
            fetch_duration.as_secs_f64(),
        );

        Ok(SyncResult {
            fetch_duration,
            ingest_duration,
            files_processed,
            analysis_queued,
        })
    }

    /// Run one analysis pass on the calling thread.
    pub fn analyze_now(&self, owner_id: &str) -> Result<AnalysisSummary, Error> {
        let summary = analyze_pending(
            &self.db,
            owner_id,
            &self.rules,
            self.config.analysis.batch_size,
            Utc::now(),
        )?;
        self.notifier.publish(Change::AnalysisCompleted {
            owner_id: owner_id.to_string(),
            files: summary.files_analyzed,
            recommendations: summary.recommendations,
        });
        Ok(summary)
    }

    pub fn recommendations(&self, owner_id: &str) -> Result<CleanupSummary, Error> {
        let recs = self.db.get_recommendations(owner_id)?;
        Ok(recommendations::aggregate(&recs))
    }

    pub fn delete_files(
        &self,
        owner_id: &str,
        file_ids: &[i64],
        reporter: &dyn PipelineReporter,
    ) -> Result<DeletionReport, Error> {
        let token = require_token(self.credentials.as_ref(), owner_id)?;
        let executor = DeletionExecutor::new(
            &self.db,
            self.remote.as_ref(),
            self.config.deletion.parallelism,
        );
        let report = executor.execute(owner_id, &token, file_ids, reporter)?;

        if report.deleted_count > 0 {
            self.notifier.publish(Change::FilesDeleted {
                owner_id: owner_id.to_string(),
                count: report.deleted_count,
            });
        }
        Ok(report)
    }

    pub fn stats(&self, owner_id: &str) -> Result<StorageStats, Error> {
        Ok(self.db.storage_stats(owner_id)?)
    }

    /// Return files stuck in `processing` for longer than `older_than` to
    /// `pending`. Never called automatically.
    pub fn reset_stuck(&self, owner_id: &str, older_than: ChronoDuration) -> Result<usize, Error> {
        if older_than < ChronoDuration::zero() {
            return Err(Error::InvalidInput(
                "reset age must not be negative".to_string(),
            ));
        }
        let now = Utc::now();
        let reset = self
            .db
            .reset_stuck_processing(owner_id, now - older_than, now)?;
        if reset > 0 {
            info!("Reset {} stuck files to pending for {}", reset, owner_id);
            self.notifier.publish(Change::FilesChanged {
                owner_id: owner_id.to_string(),
                count: reset,
            });
        }
        Ok(reset)
    }

    /// Stop the analysis worker after it drains queued jobs.
    pub fn shutdown(mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
    }
}
