//! JSON envelopes for the inbound sync, delete and recommendation triggers.
//!
//! `owner_id` is the principal already resolved by the identity provider;
//! `None` means the request carried no usable session.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::deletion::DeletionOutcome;
use crate::engine::CleanupEngine;
use crate::error::Error;
use crate::progress::SilentReporter;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncResponse {
    success: bool,
    files_processed: usize,
    message: String,
}

#[derive(Debug, Serialize)]
struct DeleteResponse<'a> {
    success: bool,
    message: String,
    results: &'a [DeletionOutcome],
}

impl ApiResponse {
    fn ok<T: Serialize>(body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self {
                status: 500,
                body: json!({ "error": e.to_string() }),
            },
        }
    }

    fn from_error(context: &str, e: &Error) -> Self {
        error!("Error in {}: {}", context, e);
        Self {
            status: e.status_code(),
            body: json!({ "error": e.detail() }),
        }
    }
}

fn require_owner(owner_id: Option<&str>) -> Result<&str, Error> {
    match owner_id.map(str::trim) {
        Some(owner) if !owner.is_empty() => Ok(owner),
        _ => Err(Error::Unauthenticated("No authorization header".to_string())),
    }
}

/// Parse `{"fileIds": [..]}`. Anything but an array of integers is rejected.
pub fn parse_delete_request(body: &str) -> Result<Vec<i64>, Error> {
    let invalid = || Error::InvalidInput("Invalid fileIds provided".to_string());
    let value: Value = serde_json::from_str(body).map_err(|_| invalid())?;
    let ids = value
        .get("fileIds")
        .and_then(Value::as_array)
        .ok_or_else(invalid)?;
    ids.iter()
        .map(|id| id.as_i64().ok_or_else(invalid))
        .collect()
}

pub fn handle_sync(engine: &CleanupEngine, owner_id: Option<&str>) -> ApiResponse {
    let result = require_owner(owner_id).and_then(|owner| engine.sync(owner, &SilentReporter));
    match result {
        Ok(sync) => ApiResponse::ok(&SyncResponse {
            success: true,
            files_processed: sync.files_processed,
            message: "Files synced successfully".to_string(),
        }),
        Err(e) => ApiResponse::from_error("sync", &e),
    }
}

pub fn handle_delete(engine: &CleanupEngine, owner_id: Option<&str>, body: &str) -> ApiResponse {
    let result = parse_delete_request(body).and_then(|ids| {
        let owner = require_owner(owner_id)?;
        engine.delete_files(owner, &ids, &SilentReporter)
    });
    match result {
        Ok(report) => ApiResponse::ok(&DeleteResponse {
            success: true,
            message: report.message(),
            results: &report.outcomes,
        }),
        Err(e) => ApiResponse::from_error("delete", &e),
    }
}

pub fn handle_recommendations(engine: &CleanupEngine, owner_id: Option<&str>) -> ApiResponse {
    match require_owner(owner_id).and_then(|owner| engine.recommendations(owner)) {
        Ok(summary) => ApiResponse::ok(&summary),
        Err(e) => ApiResponse::from_error("recommendations", &e),
    }
}
