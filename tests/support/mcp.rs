use anyhow::{Context, Result};
use rmcp::{
    RoleClient, ServiceExt,
    model::{CallToolRequestParam, CallToolResult},
    service::RunningService,
};
use serde_json::Value;
use sheets_mcp::SheetsServer;

pub type TestClient = RunningService<RoleClient, ()>;

pub fn call_tool(name: &'static str, args: Value) -> CallToolRequestParam {
    CallToolRequestParam {
        name: name.into(),
        arguments: args.as_object().cloned(),
    }
}

/// Serve `server` over an in-memory pipe and connect a bare client to it.
pub async fn connect(server: SheetsServer) -> Result<TestClient> {
    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    tokio::spawn(async move {
        match server.serve(server_io).await {
            Ok(service) => {
                let _ = service.waiting().await;
            }
            Err(error) => eprintln!("test server failed to start: {error:?}"),
        }
    });
    let client = ().serve(client_io).await.context("client handshake")?;
    Ok(client)
}

/// The envelope carried in a tool result's text content.
pub fn envelope(result: &CallToolResult) -> Value {
    let text = result
        .content
        .first()
        .and_then(|content| content.as_text())
        .map(|text| text.text.clone())
        .expect("text content");
    serde_json::from_str(&text).expect("envelope json")
}
