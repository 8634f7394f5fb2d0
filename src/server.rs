use crate::catalog;
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::state::AppState;
use anyhow::Result;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, Content, Implementation,
        ListResourcesResult, ListToolsResult, PaginatedRequestParam, RawResource,
        ReadResourceRequestParam, ReadResourceResult, ResourceContents, ServerCapabilities,
        ServerInfo,
    },
    service::RequestContext,
    transport::stdio,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

pub const RESOURCE_URI: &str = "sheets://";
const RESOURCE_NAME: &str = "Google Sheets Reader";

const INSTRUCTIONS: &str = "\
Google Sheets MCP: read-only access to Google Sheets.

WORKFLOW:
1) list_spreadsheets or search_spreadsheets_by_name to find a spreadsheet id (OAuth only)
2) get_sheet_metadata or list_sheets to see its tabs
3) read_sheet_data / get_range_data for values, search_sheet_data to locate cells

RANGES: A1 notation, e.g. Sheet1!A1:C10. A bare tab name reads the whole tab.

RESPONSES: every call returns a JSON object with status = success | error.

With only an API key configured, discovery tools are hidden and only public \
spreadsheets can be read by id.";

#[derive(Clone)]
pub struct SheetsServer {
    state: Arc<AppState>,
    dispatcher: Dispatcher,
}

impl SheetsServer {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self::from_state(Arc::new(AppState::new(config)))
    }

    pub fn from_state(state: Arc<AppState>) -> Self {
        Self {
            dispatcher: Dispatcher::new(state.clone()),
            state,
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Authenticate ahead of the first call. Failure is not fatal; tool calls
    /// retry lazily.
    pub async fn preauthenticate(&self) {
        match self.state.ensure_services().await {
            Ok(services) => {
                tracing::info!(auth_mode = %services.mode(), "startup authentication succeeded")
            }
            Err(error) => tracing::warn!("startup authentication failed: {error}"),
        }
    }

    pub async fn run_stdio(self) -> Result<()> {
        let service = self
            .serve(stdio())
            .await
            .inspect_err(|error| tracing::error!("serving error: {:?}", error))?;
        service.waiting().await?;
        Ok(())
    }

    fn capability_document(&self) -> String {
        let mode = self.state.auth_mode();
        let document = json!({
            "type": "google_sheets_resource",
            "description": "Google Sheets MCP Server for reading spreadsheet data",
            "auth_mode": mode.to_string(),
            "public_sheets_only": self.state.public_sheets_only(),
            "capabilities": catalog::tool_names(mode),
        });
        serde_json::to_string_pretty(&document).unwrap_or_else(|_| document.to_string())
    }
}

impl ServerHandler for SheetsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_tool_list_changed()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let mut resource = RawResource::new(RESOURCE_URI, RESOURCE_NAME);
        resource.description = Some("Access and read Google Sheets data".to_string());
        resource.mime_type = Some("application/json".to_string());
        std::future::ready(Ok(ListResourcesResult::with_all_items(vec![
            resource.no_annotation(),
        ])))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        let result = if request.uri == RESOURCE_URI {
            Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(
                    self.capability_document(),
                    request.uri,
                )],
            })
        } else {
            Err(McpError::resource_not_found(
                format!("unknown resource: {}", request.uri),
                None,
            ))
        };
        std::future::ready(result)
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = catalog::list_tools(self.state.auth_mode())
            .iter()
            .map(|descriptor| descriptor.to_mcp_tool())
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let mode_before = self.state.auth_mode();
            let envelope = self.dispatcher.call(&request.name, request.arguments).await;

            if self.state.auth_mode() != mode_before
                && let Err(error) = context.peer.notify_tool_list_changed().await
            {
                tracing::debug!("failed to send tool list change: {error}");
            }

            let content = vec![Content::text(envelope.to_pretty_json())];
            let mut result = if envelope.is_success() {
                CallToolResult::success(content)
            } else {
                CallToolResult::error(content)
            };
            result.structured_content = Some(envelope.to_value());
            Ok(result)
        }
    }
}
