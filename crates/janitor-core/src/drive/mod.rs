pub mod client;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::Error;

pub use client::DriveClient;

/// Metadata of one non-trashed remote file, as returned by the listing call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Decimal byte count. Absent for folders and native documents.
    #[serde(default)]
    pub size: Option<String>,
    pub modified_time: DateTime<Utc>,
    pub created_time: DateTime<Utc>,
    #[serde(default)]
    pub parents: Option<Vec<String>>,
    #[serde(default)]
    pub shared: Option<bool>,
}

/// The two calls the pipeline makes against the remote store.
pub trait RemoteStore: Send + Sync {
    /// Full listing of non-trashed files visible to the credential.
    fn list_files(&self, access_token: &str) -> Result<Vec<RemoteFile>, Error>;

    fn delete_file(&self, access_token: &str, remote_id: &str) -> Result<(), Error>;
}
