pub mod auth;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod errors;
pub mod google;
pub mod security;
pub mod server;
pub mod state;
pub mod tools;

pub use config::{CliArgs, ServerConfig};
pub use envelope::Envelope;
pub use server::SheetsServer;

use anyhow::Result;
use std::sync::Arc;

/// Authenticate eagerly, then serve MCP over stdio until the host disconnects.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let server = SheetsServer::new(Arc::new(config));
    server.preauthenticate().await;
    tracing::info!("starting sheets MCP server on stdio");
    server.run_stdio().await
}
