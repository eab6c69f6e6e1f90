#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use crossbeam_channel::Receiver;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use tempfile::TempDir;

use janitor_core::credentials::StaticCredentials;
use janitor_core::drive::{RemoteFile, RemoteStore};
use janitor_core::storage::models::NewFileRecord;
use janitor_core::notify::Change;
use janitor_core::{AppConfig, CleanupEngine, Error, SilentReporter, SyncResult};

pub const OWNER: &str = "alice";
pub const TOKEN: &str = "drive-token";

/// In-process stand-in for the remote store.
#[derive(Default)]
pub struct FakeDrive {
    pub files: Mutex<Vec<RemoteFile>>,
    pub list_error: Mutex<Option<u16>>,
    pub failing_deletes: Mutex<HashSet<String>>,
    pub delete_calls: Mutex<Vec<String>>,
    pub list_calls: Mutex<usize>,
}

impl FakeDrive {
    pub fn with_files(files: Vec<RemoteFile>) -> Arc<Self> {
        let drive = Self::default();
        *drive.files.lock().unwrap() = files;
        Arc::new(drive)
    }

    pub fn fail_listing(&self, status: u16) {
        *self.list_error.lock().unwrap() = Some(status);
    }

    pub fn fail_delete(&self, remote_id: &str) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert(remote_id.to_string());
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.delete_calls.lock().unwrap().clone()
    }
}

impl RemoteStore for FakeDrive {
    fn list_files(&self, access_token: &str) -> Result<Vec<RemoteFile>, Error> {
        *self.list_calls.lock().unwrap() += 1;
        if access_token != TOKEN {
            return Err(Error::Unauthenticated("HTTP 401".to_string()));
        }
        if let Some(status) = *self.list_error.lock().unwrap() {
            return Err(Error::UpstreamUnavailable(format!("HTTP {}", status)));
        }
        Ok(self.files.lock().unwrap().clone())
    }

    fn delete_file(&self, access_token: &str, remote_id: &str) -> Result<(), Error> {
        self.delete_calls
            .lock()
            .unwrap()
            .push(remote_id.to_string());
        if access_token != TOKEN {
            return Err(Error::UpstreamUnavailable("HTTP 401".to_string()));
        }
        if self.failing_deletes.lock().unwrap().contains(remote_id) {
            return Err(Error::UpstreamUnavailable("HTTP 500".to_string()));
        }
        self.files.lock().unwrap().retain(|f| f.id != remote_id);
        Ok(())
    }
}

pub fn remote_file(id: &str, name: &str, size: Option<i64>, modified: DateTime<Utc>) -> RemoteFile {
    RemoteFile {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: "image/jpeg".to_string(),
        size: size.map(|s| s.to_string()),
        modified_time: modified,
        created_time: modified - Duration::days(1),
        parents: Some(vec!["root".to_string()]),
        shared: Some(false),
    }
}

pub fn new_record(
    owner_id: &str,
    remote_id: &str,
    name: &str,
    size_bytes: Option<i64>,
    modified_at: DateTime<Utc>,
) -> NewFileRecord {
    NewFileRecord {
        owner_id: owner_id.to_string(),
        remote_id: remote_id.to_string(),
        name: name.to_string(),
        mime_type: "application/octet-stream".to_string(),
        size_bytes,
        modified_at,
        created_at: modified_at,
        parent_folders: vec!["root".to_string()],
        is_shared: false,
    }
}

pub fn recent() -> DateTime<Utc> {
    Utc::now() - Duration::days(1)
}

/// Engine on a fresh temp database with `OWNER` holding `TOKEN`.
pub fn engine_with(drive: Arc<FakeDrive>, tweak: impl FnOnce(&mut AppConfig)) -> (TempDir, CleanupEngine) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.db_path = dir.path().join("janitor.db").to_string_lossy().into_owned();
    tweak(&mut config);

    let credentials = StaticCredentials::new().with_token(OWNER, TOKEN);
    let engine = CleanupEngine::new(config, drive, Box::new(credentials)).unwrap();
    (dir, engine)
}

/// Block until the background worker reports on the owner's analysis pass.
pub fn wait_for_analysis(changes: &Receiver<Change>) -> Change {
    loop {
        let change = changes
            .recv_timeout(StdDuration::from_secs(10))
            .expect("analysis did not finish in time");
        if matches!(
            change,
            Change::AnalysisCompleted { .. } | Change::AnalysisFailed { .. }
        ) {
            return change;
        }
    }
}

/// Sync `owner` and wait for the analysis it queues.
pub fn sync_and_wait(engine: &CleanupEngine, owner: &str) -> (SyncResult, Change) {
    let changes = engine.notifier().subscribe(owner);
    let result = engine.sync(owner, &SilentReporter).unwrap();
    let change = wait_for_analysis(&changes);
    (result, change)
}
