use anyhow::Result;
use rmcp::model::ReadResourceRequestParam;
use serde_json::json;
use sheets_mcp::SheetsServer;

mod support;

use support::mcp::{call_tool, connect, envelope};
use support::{FakeDrive, FakeFactory, FakeSheets, api_key_state, oauth_state};

#[tokio::test]
async fn oauth_server_lists_seven_tools_after_authentication() -> Result<()> {
    let server = SheetsServer::from_state(oauth_state(FakeSheets::new(), FakeDrive::new()));
    server.preauthenticate().await;
    let client = connect(server).await?;

    let tools = client.list_tools(Default::default()).await?;
    let names: Vec<&str> = tools.tools.iter().map(|t| t.name.as_ref()).collect();
    assert_eq!(names.len(), 7);
    assert!(names.contains(&"list_spreadsheets"));
    assert!(names.contains(&"search_spreadsheets_by_name"));

    client.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn api_key_server_hides_discovery_tools() -> Result<()> {
    let factory = FakeFactory::new(FakeSheets::new(), FakeDrive::new());
    let server = SheetsServer::from_state(api_key_state(factory));
    server.preauthenticate().await;
    let client = connect(server).await?;

    let tools = client.list_tools(Default::default()).await?;
    let names: Vec<&str> = tools.tools.iter().map(|t| t.name.as_ref()).collect();
    assert_eq!(
        names,
        vec![
            "read_sheet_data",
            "get_sheet_metadata",
            "list_sheets",
            "search_sheet_data",
            "get_range_data"
        ]
    );

    client.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn tool_calls_return_envelopes_as_text() -> Result<()> {
    let sheets = FakeSheets::new().with_values("Sheet1", json!([["x", "y"]]));
    let server = SheetsServer::from_state(oauth_state(sheets, FakeDrive::new()));
    let client = connect(server).await?;

    let ok = client
        .call_tool(call_tool("read_sheet_data", json!({ "spreadsheet_id": "abc" })))
        .await?;
    assert_ne!(ok.is_error, Some(true));
    let body = envelope(&ok);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"], json!([["x", "y"]]));

    let failed = client
        .call_tool(call_tool("read_sheet_data", json!({})))
        .await?;
    assert_eq!(failed.is_error, Some(true));
    let body = envelope(&failed);
    assert_eq!(body["status"], "error");
    assert_eq!(body["path"], "spreadsheet_id");

    let unknown = client.call_tool(call_tool("drop_table", json!({}))).await?;
    assert_eq!(envelope(&unknown)["error"], "Unknown tool: drop_table");

    client.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn lazy_authentication_expands_the_catalog() -> Result<()> {
    let server = SheetsServer::from_state(oauth_state(FakeSheets::new(), FakeDrive::new()));
    let client = connect(server).await?;

    let before = client.list_tools(Default::default()).await?;
    assert_eq!(before.tools.len(), 5);

    client
        .call_tool(call_tool("list_sheets", json!({ "spreadsheet_id": "abc" })))
        .await?;
    let after = client.list_tools(Default::default()).await?;
    assert_eq!(after.tools.len(), 7);

    client.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn capability_resource_reports_auth_mode() -> Result<()> {
    let server = SheetsServer::from_state(oauth_state(FakeSheets::new(), FakeDrive::new()));
    server.preauthenticate().await;
    let client = connect(server).await?;

    let resources = client.list_resources(Default::default()).await?;
    assert_eq!(resources.resources.len(), 1);
    assert_eq!(resources.resources[0].uri, "sheets://");
    assert_eq!(resources.resources[0].name, "Google Sheets Reader");

    let read = client
        .read_resource(ReadResourceRequestParam {
            uri: "sheets://".to_string(),
        })
        .await?;
    let text = match &read.contents[0] {
        rmcp::model::ResourceContents::TextResourceContents { text, .. } => text.clone(),
        other => panic!("unexpected contents: {other:?}"),
    };
    let document: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(document["auth_mode"], "cached");
    assert_eq!(document["public_sheets_only"], false);
    assert_eq!(document["capabilities"].as_array().map(Vec::len), Some(7));

    let missing = client
        .read_resource(ReadResourceRequestParam {
            uri: "sheets://other".to_string(),
        })
        .await;
    assert!(missing.is_err());

    client.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn api_key_capability_resource_is_public_only() -> Result<()> {
    let factory = FakeFactory::new(FakeSheets::new(), FakeDrive::new());
    let server = SheetsServer::from_state(api_key_state(factory));
    server.preauthenticate().await;
    let client = connect(server).await?;

    let read = client
        .read_resource(ReadResourceRequestParam {
            uri: "sheets://".to_string(),
        })
        .await?;
    let text = match &read.contents[0] {
        rmcp::model::ResourceContents::TextResourceContents { text, .. } => text.clone(),
        other => panic!("unexpected contents: {other:?}"),
    };
    let document: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(document["auth_mode"], "api_key_only");
    assert_eq!(document["public_sheets_only"], true);
    assert_eq!(document["capabilities"].as_array().map(Vec::len), Some(5));

    client.cancel().await?;
    Ok(())
}
