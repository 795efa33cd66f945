//! MCP server handlers.
//!
//! This module contains only the MCP server startup logic. The runtime
//! (config, workspace collaborator, checkpoint store) is built in main.rs.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::runtime::Runtime;

use super::server::AgentActionsServer;

/// Run the MCP server over stdio.
///
/// # Arguments
/// * `runtime` - Loaded runtime; its workspace is used for every tool call
/// * `session_id` - Checkpoint session for calls that do not name one
pub async fn run_mcp_server(runtime: Runtime, session_id: String) -> Result<()> {
    info!("🔧 Starting agent-actions MCP Tool Server...");
    info!("📝 Stdio mode (using rmcp)");
    info!("📁 Workspace: {}", runtime.workspace_root.display());
    info!("💾 Data directory: {}", runtime.data_dir.display());

    let server = AgentActionsServer::new(Arc::new(runtime), session_id);

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling running batches");
            shutdown.cancel();
        }
    });

    run_server(server).await
}

/// Run the MCP server with the given server instance.
async fn run_server(server: AgentActionsServer) -> Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    info!("✅ MCP tool server started (session '{}')", server.session_id());
    info!("🔗 Ready for MCP client connections");
    let shutdown = server.shutdown_token();

    // Start the service
    let service = server.serve(stdio()).await.map_err(|e| {
        error!("Failed to start MCP service: {:?}", e);
        anyhow::anyhow!("Failed to start MCP service: {:?}", e)
    })?;

    // Wait for service to complete
    let waited = service.waiting().await;
    shutdown.cancel();
    waited.map_err(|e| {
        error!("MCP service error: {:?}", e);
        anyhow::anyhow!("MCP service error: {:?}", e)
    })?;

    info!("MCP server shutting down");
    Ok(())
}
