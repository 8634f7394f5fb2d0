//! Spreadsheet discovery against the extended (Drive) handle.

use super::param_enums::OrderBy;
use crate::errors::InvalidParamsError;
use crate::google::{DriveApi, DriveFile, FileQuery, SPREADSHEET_MIME_TYPE};
use crate::security::{drive_string_literal, require_term};
use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const LIST_FIELDS: &str = "nextPageToken, files(id, name, modifiedTime, createdTime, owners, shared)";
const SEARCH_FIELDS: &str = "nextPageToken, files(id, name, modifiedTime, createdTime, owners)";
const SEARCH_PAGE_SIZE: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 1000;

fn default_limit() -> u32 {
    20
}

fn default_order_by() -> String {
    "modifiedTime desc".to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListSpreadsheetsParams {
    /// Maximum number of spreadsheets to return
    #[serde(default = "default_limit")]
    #[schemars(range(min = 1, max = 1000))]
    pub limit: u32,
    /// How to order results: comma-separated `name`, `modifiedTime` or
    /// `createdTime`, each optionally followed by `desc`
    #[serde(default = "default_order_by")]
    pub order_by: String,
    /// Continuation token from a previous response's `next_page_token`
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchSpreadsheetsParams {
    /// Name or partial name of the spreadsheet to search for
    pub name: String,
    /// Whether to search for exact name match
    #[serde(default)]
    pub exact_match: bool,
    /// Continuation token from a previous response's `next_page_token`
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListSpreadsheetsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub count: usize,
    pub spreadsheets: Vec<SpreadsheetEntry>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchSpreadsheetsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub search_term: String,
    pub exact_match: bool,
    pub matches_found: usize,
    pub spreadsheets: Vec<SpreadsheetEntry>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpreadsheetEntry {
    pub id: String,
    pub name: String,
    pub modified_time: Option<String>,
    pub created_time: Option<String>,
    pub owners: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
}

impl SpreadsheetEntry {
    fn from_file(file: DriveFile, with_shared: bool) -> Self {
        Self {
            id: file.id,
            name: file.name,
            modified_time: file.modified_time,
            created_time: file.created_time,
            owners: file.owners.iter().filter_map(|o| o.label()).collect(),
            shared: with_shared.then(|| file.shared.unwrap_or(false)),
        }
    }
}

fn mime_clause() -> String {
    format!("mimeType='{SPREADSHEET_MIME_TYPE}'")
}

fn page_token(raw: Option<String>) -> Option<String> {
    raw.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

pub async fn list_spreadsheets(
    api: &dyn DriveApi,
    params: ListSpreadsheetsParams,
) -> Result<ListSpreadsheetsResponse> {
    const TOOL: &str = "list_spreadsheets";
    if !(1..=MAX_LIST_LIMIT).contains(&params.limit) {
        return Err(InvalidParamsError::new(
            TOOL,
            format!("limit must be between 1 and {MAX_LIST_LIMIT}"),
        )
        .with_path("limit")
        .into());
    }
    let order_by = OrderBy::parse(&params.order_by)
        .map_err(|reason| InvalidParamsError::new(TOOL, reason).with_path("order_by"))?;

    let query = FileQuery {
        q: mime_clause(),
        page_size: params.limit,
        order_by: Some(order_by.to_string()),
        fields: LIST_FIELDS.to_string(),
        page_token: page_token(params.page_token),
    };
    let listing = api.list_files(&query).await?;

    let spreadsheets: Vec<SpreadsheetEntry> = listing
        .files
        .into_iter()
        .map(|file| SpreadsheetEntry::from_file(file, true))
        .collect();
    tracing::debug!(count = spreadsheets.len(), "listed spreadsheets");

    Ok(ListSpreadsheetsResponse {
        message: spreadsheets
            .is_empty()
            .then(|| "No spreadsheets found.".to_string()),
        count: spreadsheets.len(),
        spreadsheets,
        next_page_token: listing.next_page_token,
    })
}

pub async fn search_spreadsheets_by_name(
    api: &dyn DriveApi,
    params: SearchSpreadsheetsParams,
) -> Result<SearchSpreadsheetsResponse> {
    const TOOL: &str = "search_spreadsheets_by_name";
    let name = require_term(TOOL, "name", &params.name)?;
    let literal = drive_string_literal(TOOL, "name", name)?;
    let operator = if params.exact_match { "=" } else { "contains" };

    let query = FileQuery {
        q: format!("{} and name {operator} {literal}", mime_clause()),
        page_size: SEARCH_PAGE_SIZE,
        order_by: None,
        fields: SEARCH_FIELDS.to_string(),
        page_token: page_token(params.page_token),
    };
    let listing = api.list_files(&query).await?;

    let spreadsheets: Vec<SpreadsheetEntry> = listing
        .files
        .into_iter()
        .map(|file| SpreadsheetEntry::from_file(file, false))
        .collect();

    Ok(SearchSpreadsheetsResponse {
        message: spreadsheets
            .is_empty()
            .then(|| format!("No spreadsheets found matching '{name}'.")),
        search_term: name.to_string(),
        exact_match: params.exact_match,
        matches_found: spreadsheets.len(),
        spreadsheets,
        next_page_token: listing.next_page_token,
    })
}
