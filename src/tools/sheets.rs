//! Reads against the primary (Sheets) handle.

use super::param_enums::ValueRenderOption;
use crate::google::{SheetsApi, ValueRows};
use crate::security::{require_non_empty, require_term};
use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_SHEET: &str = "Sheet1";

fn default_sheet() -> String {
    DEFAULT_SHEET.to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadSheetDataParams {
    /// The ID of the Google Spreadsheet
    pub spreadsheet_id: String,
    /// The range to read (e.g., 'Sheet1!A1:C10')
    #[serde(default = "default_sheet")]
    pub range: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SpreadsheetParams {
    /// The ID of the Google Spreadsheet
    pub spreadsheet_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchSheetDataParams {
    /// The ID of the Google Spreadsheet
    pub spreadsheet_id: String,
    /// The term to search for (case-insensitive substring)
    pub search_term: String,
    /// Name of the specific sheet to search in
    #[serde(default = "default_sheet")]
    pub sheet_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetRangeDataParams {
    /// The ID of the Google Spreadsheet
    pub spreadsheet_id: String,
    /// The range to read (e.g., 'Sheet1!A1:C10')
    pub range: String,
    /// How to render values
    #[serde(default)]
    pub value_render_option: ValueRenderOption,
}

#[derive(Debug, Serialize)]
pub struct SheetDataResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub spreadsheet_id: String,
    pub range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_render_option: Option<ValueRenderOption>,
    pub row_count: usize,
    pub column_count: usize,
    pub data: ValueRows,
}

#[derive(Debug, Serialize)]
pub struct SheetMetadataResponse {
    pub spreadsheet_id: String,
    pub title: Option<String>,
    pub locale: Option<String>,
    pub time_zone: Option<String>,
    pub sheet_count: usize,
    pub sheets: Vec<SheetSummary>,
}

#[derive(Debug, Serialize)]
pub struct SheetSummary {
    pub sheet_id: i64,
    pub title: String,
    pub index: i64,
    pub sheet_type: String,
    pub row_count: Option<i64>,
    pub column_count: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SheetListResponse {
    pub spreadsheet_id: String,
    pub sheet_count: usize,
    pub sheets: Vec<SheetTab>,
}

#[derive(Debug, Serialize)]
pub struct SheetTab {
    pub sheet_id: i64,
    pub title: String,
    pub index: i64,
    pub sheet_type: String,
}

#[derive(Debug, Serialize)]
pub struct SearchSheetDataResponse {
    pub spreadsheet_id: String,
    pub search_term: String,
    pub sheet_name: String,
    pub matches_found: usize,
    pub matches: Vec<CellMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellMatch {
    /// 1-based.
    pub row: usize,
    /// 1-based.
    pub column: usize,
    pub cell_value: Value,
    pub full_row: Vec<Value>,
}

const GRID: &str = "GRID";

pub async fn read_sheet_data(
    api: &dyn SheetsApi,
    params: ReadSheetDataParams,
) -> Result<SheetDataResponse> {
    const TOOL: &str = "read_sheet_data";
    let spreadsheet_id = require_non_empty(TOOL, "spreadsheet_id", &params.spreadsheet_id)?;
    let range = require_non_empty(TOOL, "range", &params.range)?;

    let rows = api.get_values(spreadsheet_id, range, None).await?;
    let message = rows
        .is_empty()
        .then(|| "No data found in the specified range".to_string());
    Ok(SheetDataResponse {
        message,
        spreadsheet_id: spreadsheet_id.to_string(),
        range: range.to_string(),
        value_render_option: None,
        row_count: rows.len(),
        column_count: widest_row(&rows),
        data: rows,
    })
}

pub async fn get_sheet_metadata(
    api: &dyn SheetsApi,
    params: SpreadsheetParams,
) -> Result<SheetMetadataResponse> {
    let spreadsheet_id =
        require_non_empty("get_sheet_metadata", "spreadsheet_id", &params.spreadsheet_id)?;
    let metadata = api.get_spreadsheet(spreadsheet_id, None).await?;

    let sheets: Vec<SheetSummary> = metadata
        .sheets
        .into_iter()
        .map(|sheet| {
            let props = sheet.properties;
            let grid = props.grid_properties.unwrap_or_default();
            SheetSummary {
                sheet_id: props.sheet_id,
                title: props.title,
                index: props.index,
                sheet_type: props.sheet_type.unwrap_or_else(|| GRID.to_string()),
                row_count: grid.row_count,
                column_count: grid.column_count,
            }
        })
        .collect();

    Ok(SheetMetadataResponse {
        spreadsheet_id: spreadsheet_id.to_string(),
        title: metadata.properties.title,
        locale: metadata.properties.locale,
        time_zone: metadata.properties.time_zone,
        sheet_count: sheets.len(),
        sheets,
    })
}

pub async fn list_sheets(
    api: &dyn SheetsApi,
    params: SpreadsheetParams,
) -> Result<SheetListResponse> {
    let spreadsheet_id =
        require_non_empty("list_sheets", "spreadsheet_id", &params.spreadsheet_id)?;
    let metadata = api
        .get_spreadsheet(spreadsheet_id, Some("sheets.properties"))
        .await?;

    let sheets: Vec<SheetTab> = metadata
        .sheets
        .into_iter()
        .map(|sheet| SheetTab {
            sheet_id: sheet.properties.sheet_id,
            title: sheet.properties.title,
            index: sheet.properties.index,
            sheet_type: sheet
                .properties
                .sheet_type
                .unwrap_or_else(|| GRID.to_string()),
        })
        .collect();

    Ok(SheetListResponse {
        spreadsheet_id: spreadsheet_id.to_string(),
        sheet_count: sheets.len(),
        sheets,
    })
}

pub async fn search_sheet_data(
    api: &dyn SheetsApi,
    params: SearchSheetDataParams,
) -> Result<SearchSheetDataResponse> {
    const TOOL: &str = "search_sheet_data";
    let spreadsheet_id = require_non_empty(TOOL, "spreadsheet_id", &params.spreadsheet_id)?;
    let search_term = require_term(TOOL, "search_term", &params.search_term)?;
    let sheet_name = require_non_empty(TOOL, "sheet_name", &params.sheet_name)?;

    let rows = api
        .get_values(spreadsheet_id, &sheet_range(sheet_name), None)
        .await?;
    let matches = find_matches(&rows, search_term);

    Ok(SearchSheetDataResponse {
        spreadsheet_id: spreadsheet_id.to_string(),
        search_term: search_term.to_string(),
        sheet_name: sheet_name.to_string(),
        matches_found: matches.len(),
        matches,
    })
}

pub async fn get_range_data(
    api: &dyn SheetsApi,
    params: GetRangeDataParams,
) -> Result<SheetDataResponse> {
    const TOOL: &str = "get_range_data";
    let spreadsheet_id = require_non_empty(TOOL, "spreadsheet_id", &params.spreadsheet_id)?;
    let range = require_non_empty(TOOL, "range", &params.range)?;
    let render = params.value_render_option;

    let rows = api
        .get_values(spreadsheet_id, range, Some(render.as_str()))
        .await?;
    Ok(SheetDataResponse {
        message: None,
        spreadsheet_id: spreadsheet_id.to_string(),
        range: range.to_string(),
        value_render_option: Some(render),
        row_count: rows.len(),
        column_count: widest_row(&rows),
        data: rows,
    })
}

/// The provider drops trailing empty cells per row, so the first row is not a
/// reliable width.
fn widest_row(rows: &ValueRows) -> usize {
    rows.iter().map(Vec::len).max().unwrap_or(0)
}

/// A bare tab name as an A1 range. Names that already carry a cell reference
/// or quotes are passed through.
fn sheet_range(sheet_name: &str) -> String {
    if sheet_name.contains('!') || sheet_name.starts_with('\'') {
        return sheet_name.to_string();
    }
    format!("'{}'", sheet_name.replace('\'', "''"))
}

/// Case-insensitive substring scan in row-major order.
pub fn find_matches(rows: &ValueRows, term: &str) -> Vec<CellMatch> {
    let needle = term.to_lowercase();
    let mut matches = Vec::new();
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            if cell_text(cell).to_lowercase().contains(&needle) {
                matches.push(CellMatch {
                    row: row_idx + 1,
                    column: col_idx + 1,
                    cell_value: cell.clone(),
                    full_row: row.clone(),
                });
            }
        }
    }
    matches
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
