//! Google Drive access.
//!
//! The scanner only depends on the [`DriveSource`] trait; [`GoogleDrive`] is
//! the production implementation over the Drive v3 REST API.

pub mod auth;
mod google;
pub mod rate_limit;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
pub use google::GoogleDrive;

/// MIME type of Google Sheets exported as Excel workbooks.
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A file listed in a Drive folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
}

/// A folder found by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFolder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_view_link: String,
}

/// One page of a folder listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePage {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// Read access to the folders being scanned.
#[async_trait]
pub trait DriveSource: Send + Sync {
    /// First folder whose name contains `name`.
    async fn find_folder(&self, name: &str) -> Result<Option<DriveFolder>>;

    /// One page of the non-trashed direct children of a folder.
    async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<FilePage>;

    /// Export a Google Workspace document in the given format.
    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>>;
}
