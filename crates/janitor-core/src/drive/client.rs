use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

use super::{RemoteFile, RemoteStore};
use crate::config::DriveConfig;
use crate::error::Error;

const LIST_FIELDS: &str =
    "nextPageToken,files(id,name,mimeType,size,modifiedTime,createdTime,parents,shared)";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListPage {
    #[serde(default)]
    files: Vec<RemoteFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Blocking Drive v3 client.
pub struct DriveClient {
    http: Client,
    api_base: String,
    page_size: u32,
}

impl DriveClient {
    pub fn new(config: &DriveConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::UpstreamUnavailable(format!("HTTP client init: {}", e)))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            page_size: config.page_size,
        })
    }

    fn list_page(&self, access_token: &str, page_token: Option<&str>) -> Result<FileListPage, Error> {
        let mut query: Vec<(&str, String)> = vec![
            ("q", "trashed=false".to_string()),
            ("fields", LIST_FIELDS.to_string()),
            ("pageSize", self.page_size.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .map_err(|e| Error::UpstreamUnavailable(format!("listing request failed: {}", e)))?;

        check_status(response.status(), "Failed to fetch from Google Drive")?;

        response
            .json::<FileListPage>()
            .map_err(|e| Error::UpstreamUnavailable(format!("malformed listing: {}", e)))
    }
}

impl RemoteStore for DriveClient {
    fn list_files(&self, access_token: &str) -> Result<Vec<RemoteFile>, Error> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();
        let mut pages = 0;

        loop {
            let page = self.list_page(access_token, page_token.as_deref())?;
            pages += 1;
            debug!("Listing page {}: {} files", pages, page.files.len());
            files.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(Error::UpstreamUnavailable(format!(
                            "listing repeated page token after {} page(s)",
                            pages
                        )));
                    }
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        info!("Fetched {} remote files in {} page(s)", files.len(), pages);
        Ok(files)
    }

    fn delete_file(&self, access_token: &str, remote_id: &str) -> Result<(), Error> {
        let response = self
            .http
            .delete(format!("{}/files/{}", self.api_base, remote_id))
            .bearer_auth(access_token)
            .send()
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::UpstreamUnavailable(format!("HTTP {}", status.as_u16())))
        }
    }
}

fn check_status(status: StatusCode, context: &str) -> Result<(), Error> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthenticated(format!(
            "remote store rejected credential (HTTP {})",
            status.as_u16()
        ))),
        _ => Err(Error::UpstreamUnavailable(format!(
            "{} (HTTP {})",
            context,
            status.as_u16()
        ))),
    }
}
