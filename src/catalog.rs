//! The advertised tool list. A pure function of the authentication mode:
//! discovery tools only appear when Drive access was granted.

use crate::auth::AuthMode;
use crate::tools::discovery::{ListSpreadsheetsParams, SearchSpreadsheetsParams};
use crate::tools::sheets::{
    GetRangeDataParams, ReadSheetDataParams, SearchSheetDataParams, SpreadsheetParams,
};
use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use schemars::generate::SchemaSettings;
use std::sync::Arc;
use strum::IntoEnumIterator;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ToolName {
    ReadSheetData,
    GetSheetMetadata,
    ListSheets,
    SearchSheetData,
    GetRangeData,
    ListSpreadsheets,
    SearchSpreadsheetsByName,
}

impl ToolName {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Needs the extended (Drive) handle.
    pub fn requires_extended(self) -> bool {
        matches!(
            self,
            ToolName::ListSpreadsheets | ToolName::SearchSpreadsheetsByName
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolName::ReadSheetData => {
                "Read data from a Google Sheet by spreadsheet ID and range"
            }
            ToolName::GetSheetMetadata => {
                "Get metadata about a Google Spreadsheet: title, locale, time zone and per-sheet grid size"
            }
            ToolName::ListSheets => "List all sheets/tabs in a Google Spreadsheet",
            ToolName::SearchSheetData => {
                "Search for specific data in a Google Sheet (case-insensitive substring match)"
            }
            ToolName::GetRangeData => {
                "Get data from a specific range with formatting options (FORMATTED_VALUE, UNFORMATTED_VALUE, FORMULA)"
            }
            ToolName::ListSpreadsheets => {
                "List all Google Spreadsheets accessible to the authenticated user"
            }
            ToolName::SearchSpreadsheetsByName => "Search for Google Spreadsheets by name",
        }
    }

    pub fn input_schema(self) -> JsonObject {
        match self {
            ToolName::ReadSheetData => schema_for::<ReadSheetDataParams>(),
            ToolName::GetSheetMetadata | ToolName::ListSheets => {
                schema_for::<SpreadsheetParams>()
            }
            ToolName::SearchSheetData => schema_for::<SearchSheetDataParams>(),
            ToolName::GetRangeData => schema_for::<GetRangeDataParams>(),
            ToolName::ListSpreadsheets => schema_for::<ListSpreadsheetsParams>(),
            ToolName::SearchSpreadsheetsByName => schema_for::<SearchSpreadsheetsParams>(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: ToolName,
    pub description: &'static str,
    pub input_schema: Arc<JsonObject>,
}

impl ToolDescriptor {
    pub fn new(name: ToolName) -> Self {
        Self {
            name,
            description: name.description(),
            input_schema: Arc::new(name.input_schema()),
        }
    }

    pub fn to_mcp_tool(&self) -> Tool {
        Tool::new(
            self.name.as_str(),
            self.description,
            self.input_schema.clone(),
        )
    }
}

/// Base tools in fixed order, then discovery tools when `mode` grants them.
pub fn list_tools(mode: AuthMode) -> Vec<ToolDescriptor> {
    ToolName::iter()
        .filter(|tool| !tool.requires_extended() || mode.grants_discovery())
        .map(ToolDescriptor::new)
        .collect()
}

pub fn tool_names(mode: AuthMode) -> Vec<&'static str> {
    list_tools(mode).iter().map(|d| d.name.as_str()).collect()
}

fn schema_for<P: JsonSchema>() -> JsonObject {
    let generator = SchemaSettings::draft2020_12()
        .with(|s| s.inline_subschemas = true)
        .into_generator();
    let schema = generator.into_root_schema_for::<P>();
    let mut object = schema.as_object().cloned().unwrap_or_default();
    object.remove("$schema");
    object.remove("title");
    object
}
