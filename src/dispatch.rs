use crate::catalog::ToolName;
use crate::envelope::Envelope;
use crate::errors::{ResponseTooLargeError, ToolTimeoutError, UnknownToolError};
use crate::state::AppState;
use crate::tools;
use anyhow::{Context, Result};
use rmcp::model::JsonObject;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// Maps a tool call onto an operation. `call` never fails: every outcome,
/// including authentication and argument problems, becomes an envelope.
#[derive(Clone)]
pub struct Dispatcher {
    state: Arc<AppState>,
}

impl Dispatcher {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub async fn call(&self, name: &str, arguments: Option<JsonObject>) -> Envelope {
        let started = Instant::now();
        let result = self.try_call(name, arguments).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(envelope) => {
                tracing::info!(tool = name, status = "success", elapsed_ms, "tool call finished");
                envelope
            }
            Err(error) => {
                tracing::warn!(
                    tool = name,
                    status = "error",
                    elapsed_ms,
                    error = %format!("{error:#}"),
                    "tool call failed"
                );
                Envelope::from_error(&error)
            }
        }
    }

    async fn try_call(&self, name: &str, arguments: Option<JsonObject>) -> Result<Envelope> {
        let services = self
            .state
            .ensure_services()
            .await
            .context("authentication failed")?;
        let tool = ToolName::from_str(name).map_err(|_| UnknownToolError(name.to_string()))?;
        let arguments = arguments.map(Value::Object).unwrap_or(Value::Null);

        let config = self.state.config();
        let envelope = match config.tool_timeout() {
            Some(limit) => {
                match tokio::time::timeout(limit, tools::run(tool, &services, arguments)).await {
                    Ok(result) => result?,
                    Err(_) => return Err(ToolTimeoutError::new(name, limit.as_millis()).into()),
                }
            }
            None => tools::run(tool, &services, arguments).await?,
        };

        if let Some(limit) = config.max_response_bytes() {
            let size = serde_json::to_vec(&envelope)
                .with_context(|| format!("failed to serialize response for {name}"))?
                .len();
            if size > limit {
                return Err(ResponseTooLargeError::new(name, size, limit).into());
            }
        }
        Ok(envelope)
    }
}
