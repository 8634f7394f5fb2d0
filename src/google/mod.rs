//! Remote capabilities consumed by the tools: Sheets values/metadata (the
//! primary handle) and Drive file listing (the extended handle).

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub mod drive;
pub mod http;
pub mod sheets;

pub use drive::GoogleDriveClient;
pub use http::{ApiAuth, DEFAULT_DRIVE_BASE_URL, DEFAULT_SHEETS_BASE_URL};
pub use sheets::GoogleSheetsClient;

pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// Rows of cells as returned by the values endpoint.
pub type ValueRows = Vec<Vec<Value>>;

#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Fetch values for `range`. An empty range yields an empty vector.
    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        render: Option<&str>,
    ) -> Result<ValueRows>;

    async fn get_spreadsheet(
        &self,
        spreadsheet_id: &str,
        fields: Option<&str>,
    ) -> Result<SpreadsheetMetadata>;

    /// True when the handle only carries an API key (public sheets only).
    fn is_read_only_public(&self) -> bool {
        false
    }
}

#[async_trait]
pub trait DriveApi: Send + Sync {
    async fn list_files(&self, query: &FileQuery) -> Result<FileList>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQuery {
    pub q: String,
    pub page_size: u32,
    pub order_by: Option<String>,
    pub fields: String,
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetMetadata {
    #[serde(default)]
    pub properties: SpreadsheetProperties,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetProperties {
    pub title: Option<String>,
    pub locale: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Sheet {
    #[serde(default)]
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(default)]
    pub sheet_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub index: i64,
    pub sheet_type: Option<String>,
    pub grid_properties: Option<GridProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    pub row_count: Option<i64>,
    pub column_count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub modified_time: Option<String>,
    pub created_time: Option<String>,
    #[serde(default)]
    pub owners: Vec<DriveUser>,
    pub shared: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveUser {
    pub display_name: Option<String>,
    pub email_address: Option<String>,
}

impl DriveUser {
    pub fn label(&self) -> Option<String> {
        self.display_name
            .clone()
            .or_else(|| self.email_address.clone())
    }
}

/// A request the provider rejected, or one that never reached it.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RemoteError {
    http_status: Option<u16>,
    status: Option<String>,
    message: String,
}

impl RemoteError {
    pub fn from_provider(http_status: u16, status: Option<String>, message: String) -> Self {
        Self {
            http_status: Some(http_status),
            status,
            message,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            http_status: None,
            status: None,
            message: message.into(),
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
