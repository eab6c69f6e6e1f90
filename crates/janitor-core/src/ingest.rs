use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::drive::RemoteFile;
use crate::error::Error;
use crate::storage::models::NewFileRecord;
use crate::storage::Database;

/// Build the stored shape of a listed file.
pub fn normalize(owner_id: &str, file: RemoteFile) -> NewFileRecord {
    let size_bytes = file.size.as_deref().and_then(|raw| match raw.trim().parse::<i64>() {
        Ok(size) if size >= 0 => Some(size),
        _ => {
            warn!("Ignoring unparsable size '{}' for remote file {}", raw, file.id);
            None
        }
    });

    NewFileRecord {
        owner_id: owner_id.to_string(),
        remote_id: file.id,
        name: file.name,
        mime_type: file.mime_type,
        size_bytes,
        modified_at: file.modified_time,
        created_at: file.created_time,
        parent_folders: file.parents.unwrap_or_default(),
        is_shared: file.shared.unwrap_or(false),
    }
}

/// Upsert a full listing for an owner. Every listed file is re-queued for
/// analysis, whether or not it changed. Returns the number of files processed.
pub fn ingest_listing(
    db: &Database,
    owner_id: &str,
    listing: Vec<RemoteFile>,
    now: DateTime<Utc>,
) -> Result<usize, Error> {
    let records: Vec<NewFileRecord> = listing
        .into_iter()
        .map(|file| normalize(owner_id, file))
        .collect();

    db.upsert_files(&records, now)?;
    info!("Ingested {} files for {}", records.len(), owner_id);
    Ok(records.len())
}
