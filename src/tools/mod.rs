pub mod discovery;
pub mod param_enums;
pub mod sheets;

use crate::auth::Services;
use crate::catalog::ToolName;
use crate::envelope::Envelope;
use crate::errors::{DiscoveryUnavailableError, InvalidParamsError};
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Run one operation and wrap its payload. Failures are returned as errors so
/// the dispatcher can shape them uniformly.
pub async fn run(tool: ToolName, services: &Services, arguments: Value) -> Result<Envelope> {
    let name = tool.as_str();
    let primary = services.primary().as_ref();

    match tool {
        ToolName::ReadSheetData => {
            Envelope::success(&sheets::read_sheet_data(primary, parse(name, arguments)?).await?)
        }
        ToolName::GetSheetMetadata => Envelope::success(
            &sheets::get_sheet_metadata(primary, parse(name, arguments)?).await?,
        ),
        ToolName::ListSheets => {
            Envelope::success(&sheets::list_sheets(primary, parse(name, arguments)?).await?)
        }
        ToolName::SearchSheetData => Envelope::success(
            &sheets::search_sheet_data(primary, parse(name, arguments)?).await?,
        ),
        ToolName::GetRangeData => {
            Envelope::success(&sheets::get_range_data(primary, parse(name, arguments)?).await?)
        }
        ToolName::ListSpreadsheets => {
            let drive = services
                .extended()
                .ok_or_else(|| DiscoveryUnavailableError::new(name))?;
            Envelope::success(
                &discovery::list_spreadsheets(drive.as_ref(), parse(name, arguments)?).await?,
            )
        }
        ToolName::SearchSpreadsheetsByName => {
            let drive = services
                .extended()
                .ok_or_else(|| DiscoveryUnavailableError::new(name))?;
            Envelope::success(
                &discovery::search_spreadsheets_by_name(drive.as_ref(), parse(name, arguments)?)
                    .await?,
            )
        }
    }
}

/// Deserialize arguments into the tool's parameter struct, reporting the
/// offending field. Missing fields fail at the root, so their name comes from
/// serde's message instead of the path.
pub fn parse<P: DeserializeOwned>(tool: &'static str, arguments: Value) -> Result<P> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_path_to_error::deserialize(arguments).map_err(|e| {
        let problem = e.inner().to_string();
        let path = e.path().to_string();
        let error = if path != "." {
            InvalidParamsError::new(tool, format!("invalid arguments: {path}: {problem}"))
                .with_path(path)
        } else {
            let error = InvalidParamsError::new(tool, format!("invalid arguments: {problem}"));
            match field_from_serde_message(&problem) {
                Some(field) => error.with_path(field),
                None => error,
            }
        };
        anyhow::Error::from(error)
    })
}

/// Pull the field name out of serde's "missing field `x`" and "unknown field
/// `x`" messages.
fn field_from_serde_message(problem: &str) -> Option<String> {
    for prefix in ["missing field `", "unknown field `"] {
        if let Some(start) = problem.find(prefix) {
            let rest = &problem[start + prefix.len()..];
            return rest.find('`').map(|end| rest[..end].to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_field_is_named_in_path() {
        let err = parse::<sheets::SpreadsheetParams>("list_sheets", json!({})).unwrap_err();
        let invalid = err.downcast_ref::<InvalidParamsError>().unwrap();
        assert_eq!(invalid.path(), Some("spreadsheet_id"));
        assert!(invalid.message().contains("spreadsheet_id"));
    }

    #[test]
    fn null_arguments_behave_like_empty_object() {
        let params: discovery::ListSpreadsheetsParams =
            parse("list_spreadsheets", Value::Null).unwrap();
        assert_eq!(params.limit, 20);
        assert_eq!(params.order_by, "modifiedTime desc");
    }

    #[test]
    fn wrong_type_is_an_invalid_params_error() {
        let err = parse::<discovery::ListSpreadsheetsParams>(
            "list_spreadsheets",
            json!({ "limit": "ten" }),
        )
        .unwrap_err();
        let invalid = err.downcast_ref::<InvalidParamsError>().unwrap();
        assert_eq!(invalid.path(), Some("limit"));
        assert!(invalid.message().starts_with("invalid arguments: limit: "));
    }

    #[test]
    fn unknown_variant_names_the_field() {
        let err = parse::<sheets::GetRangeDataParams>(
            "get_range_data",
            json!({ "spreadsheet_id": "abc", "range": "A1", "value_render_option": "bogus" }),
        )
        .unwrap_err();
        let invalid = err.downcast_ref::<InvalidParamsError>().unwrap();
        assert_eq!(invalid.path(), Some("value_render_option"));
    }
}
