//! Drive v3 REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::auth::resolve_access_token;
use super::rate_limit::{is_rate_limited, ApiRateLimiter};
use super::{DriveFolder, DriveSource, FilePage};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::models::FOLDER_MIME_TYPE;

const API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Largest page size the Drive API accepts for file listings.
const PAGE_SIZE: &str = "1000";

#[derive(Debug, Deserialize)]
struct FolderList {
    #[serde(default)]
    files: Vec<DriveFolder>,
}

/// Google Drive client authenticated with a bearer token.
pub struct GoogleDrive {
    client: Client,
    access_token: String,
    limiter: Mutex<ApiRateLimiter>,
}

impl GoogleDrive {
    pub fn new(client: Client, access_token: String, request_delay: Duration) -> Self {
        Self {
            client,
            access_token,
            limiter: Mutex::new(ApiRateLimiter::new("drive", request_delay)),
        }
    }

    /// Build an HTTP client from settings and resolve an access token.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(Duration::from_secs(settings.request_timeout))
            .build()?;
        let token = resolve_access_token(&client, &settings.token_file).await?;
        Ok(Self::new(
            client,
            token,
            Duration::from_millis(settings.request_delay_ms),
        ))
    }

    /// GET with pacing and retries on rate limit responses.
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        let mut attempt = 0;
        loop {
            self.limiter.lock().await.wait_for_slot().await;

            let response = self
                .client
                .get(url)
                .bearer_auth(&self.access_token)
                .query(query)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();

            if is_rate_limited(status, &body) {
                let wait = self
                    .limiter
                    .lock()
                    .await
                    .handle_rate_limit(attempt, retry_after.as_deref());
                if let Some(wait) = wait {
                    warn!("Drive rate limited, retrying in {:?}", wait);
                    sleep(wait).await;
                    attempt += 1;
                    continue;
                }
            }

            return Err(Error::Drive(format!(
                "{} returned {}: {}",
                url,
                status,
                body.trim()
            )));
        }
    }
}

/// Escape a value for use inside a single-quoted Drive query string.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn folder_query(name: &str) -> String {
    format!(
        "name contains '{}' and mimeType = '{}' and trashed = false",
        escape_query_value(name),
        FOLDER_MIME_TYPE
    )
}

fn children_query(folder_id: &str) -> String {
    format!(
        "'{}' in parents and trashed = false",
        escape_query_value(folder_id)
    )
}

#[async_trait]
impl DriveSource for GoogleDrive {
    async fn find_folder(&self, name: &str) -> Result<Option<DriveFolder>> {
        let q = folder_query(name);
        let response = self
            .get(
                &format!("{}/files", API_BASE),
                &[
                    ("q", q.as_str()),
                    ("fields", "files(id, name, webViewLink)"),
                    ("spaces", "drive"),
                ],
            )
            .await?;
        let list: FolderList = response.json().await?;
        debug!("Folder search '{}' matched {} folders", name, list.files.len());
        Ok(list.files.into_iter().next())
    }

    async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<FilePage> {
        let q = children_query(folder_id);
        let mut query = vec![
            ("q", q.as_str()),
            ("fields", "nextPageToken, files(id, name, mimeType)"),
            ("spaces", "drive"),
            ("pageSize", PAGE_SIZE),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self.get(&format!("{}/files", API_BASE), &query).await?;
        Ok(response.json().await?)
    }

    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
        let response = self
            .get(
                &format!("{}/files/{}/export", API_BASE, file_id),
                &[("mimeType", mime_type)],
            )
            .await?;
        Ok(response.bytes().await?.to_vec())
    }
}
