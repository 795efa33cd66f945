//! MCP server implementation.
//!
//! This module contains the AgentActionsServer struct and its tool routing.
//! One server owns one action queue and one workspace collaborator for its
//! whole lifetime.

use rmcp::{
    handler::server::router::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::queue::{create_shared_action_queue, SharedActionQueue};
use crate::runtime::Runtime;

use super::tools;
use super::types::*;

/// Agent actions MCP Server
#[derive(Clone)]
pub struct AgentActionsServer {
    runtime: Arc<Runtime>,
    queue: SharedActionQueue,
    /// Session used when a tool call names none
    session_id: String,
    /// Cancels in-flight batches when the server shuts down
    shutdown: CancellationToken,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl AgentActionsServer {
    /// Create a new server over `runtime`'s workspace
    pub fn new(runtime: Arc<Runtime>, session_id: impl Into<String>) -> Self {
        Self {
            runtime,
            queue: create_shared_action_queue(),
            session_id: session_id.into(),
            shutdown: CancellationToken::new(),
            tool_router: Self::tool_router(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Token that cancels every running batch
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Parse proposed actions out of a response
    #[tool(
        name = "extract_actions",
        description = "Parse the proposed actions (file edits, shell commands, package installs, workflow and deployment configurations, tool nudges, RAG source references) embedded as tags in an assistant response. Nothing is executed."
    )]
    fn extract_actions(
        &self,
        Parameters(args): Parameters<ExtractActionsArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::extract_actions(args)
    }

    /// Apply the actions proposed in a response
    #[tool(
        name = "apply_actions",
        description = "Extract the proposed actions from an assistant response and execute the file edits, shell commands and package installs in order against the workspace. A checkpoint of the workspace is saved first whenever file edits are pending. One failing action does not stop the batch. With dry_run the batch runs against a scratch copy and the would-be changes are reported."
    )]
    async fn apply_actions(
        &self,
        Parameters(args): Parameters<ApplyActionsArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::apply_actions(
            &self.runtime,
            &self.queue,
            &self.shutdown,
            &self.session_id,
            args,
        )
        .await
    }

    /// Report the action queue
    #[tool(
        name = "queue_status",
        description = "Show every queued action with its status and error, plus per-status counts."
    )]
    async fn queue_status(
        &self,
        Parameters(args): Parameters<QueueStatusArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::queue_status(&self.queue, args).await
    }

    /// Drop finished entries from the queue
    #[tool(
        name = "clear_queue",
        description = "Remove one action by id, the completed actions, or every action when `all` is true."
    )]
    async fn clear_queue(
        &self,
        Parameters(args): Parameters<ClearQueueArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::clear_queue(&self.queue, args).await
    }

    /// List saved checkpoints
    #[tool(
        name = "list_checkpoints",
        description = "List the checkpoints saved for a session, oldest first."
    )]
    fn list_checkpoints(
        &self,
        Parameters(args): Parameters<ListCheckpointsArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::list_checkpoints(&self.runtime, &self.session_id, args)
    }

    /// Roll the workspace back to a checkpoint
    #[tool(
        name = "restore_checkpoint",
        description = "Restore the workspace files to a saved checkpoint (the latest one when checkpoint_id is omitted). Modified files are rewritten, files created since are deleted and deleted files are recreated."
    )]
    async fn restore_checkpoint(
        &self,
        Parameters(args): Parameters<RestoreCheckpointArgs>,
    ) -> Result<CallToolResult, McpError> {
        tools::restore_checkpoint(&self.runtime, &self.session_id, args).await
    }
}

#[tool_handler]
impl ServerHandler for AgentActionsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "agent-actions".to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Agent actions MCP Server extracts proposed actions from assistant responses, applies them to the workspace and manages rollback checkpoints."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{CheckpointStore, FileSet};
    use crate::config::AppConfig;
    use crate::domain::{ExecutableAction, ShellCommand};
    use crate::workspace::{InMemoryWorkspace, Workspace};
    use serde_json::Value;
    use tempfile::TempDir;

    const RESPONSE: &str = r#"<proposed_file_replace_substring file_path="README.md">
<old_str>Draft</old_str>
<new_str>Final</new_str>
</proposed_file_replace_substring>
<proposed_shell_command>make docs</proposed_shell_command>"#;

    fn setup() -> (AgentActionsServer, Arc<InMemoryWorkspace>, TempDir) {
        let data_dir = TempDir::new().unwrap();
        let files: FileSet = [("README.md", "# Draft")].into_iter().collect();
        let workspace = Arc::new(InMemoryWorkspace::with_files(files));
        let runtime = Runtime {
            config: AppConfig::default(),
            data_dir: data_dir.path().to_path_buf(),
            workspace_root: data_dir.path().to_path_buf(),
            workspace: workspace.clone(),
            checkpoints: CheckpointStore::new(data_dir.path()),
        };
        let server = AgentActionsServer::new(Arc::new(runtime), "mcp");
        (server, workspace, data_dir)
    }

    /// The JSON payload of a successful tool result.
    fn payload(result: &CallToolResult) -> Value {
        let value = serde_json::to_value(result).unwrap();
        let text = value["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_mcp_server_creation() {
        let (server, _workspace, _dir) = setup();
        assert_eq!(server.session_id(), "mcp");
        assert!(!server.shutdown_token().is_cancelled());

        let info = server.get_info();
        assert_eq!(info.server_info.name, "agent-actions");
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_extract_actions_tool() {
        let (server, _workspace, _dir) = setup();
        let result = server
            .extract_actions(Parameters(ExtractActionsArgs {
                text: RESPONSE.to_string(),
            }))
            .unwrap();

        let batch = payload(&result);
        assert_eq!(batch["fileEdits"].as_array().unwrap().len(), 1);
        assert_eq!(batch["shellCommands"][0]["command"], "make docs");
    }

    #[tokio::test]
    async fn test_apply_then_restore() {
        let (server, workspace, _dir) = setup();

        let result = server
            .apply_actions(Parameters(ApplyActionsArgs {
                text: RESPONSE.to_string(),
                session_id: None,
                dry_run: None,
            }))
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
        let report = payload(&result);
        assert_eq!(report["result"]["completed"], 2);
        assert_eq!(workspace.read_file("README.md").await.unwrap(), "# Final");

        let status = server
            .queue_status(Parameters(QueueStatusArgs {}))
            .await
            .unwrap();
        assert_eq!(payload(&status)["counts"]["completed"], 2);

        let listed = server
            .list_checkpoints(Parameters(ListCheckpointsArgs { session_id: None }))
            .unwrap();
        assert_eq!(payload(&listed).as_array().unwrap().len(), 1);

        let restored = server
            .restore_checkpoint(Parameters(RestoreCheckpointArgs {
                checkpoint_id: None,
                session_id: None,
            }))
            .await
            .unwrap();
        assert_ne!(restored.is_error, Some(true));
        assert_eq!(workspace.read_file("README.md").await.unwrap(), "# Draft");

        server
            .clear_queue(Parameters(ClearQueueArgs {
                id: None,
                all: None,
            }))
            .await
            .unwrap();
        let status = server
            .queue_status(Parameters(QueueStatusArgs {}))
            .await
            .unwrap();
        assert!(payload(&status)["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_dry_run_changes_nothing() {
        let (server, workspace, _dir) = setup();

        let result = server
            .apply_actions(Parameters(ApplyActionsArgs {
                text: RESPONSE.to_string(),
                session_id: Some("other".to_string()),
                dry_run: Some(true),
            }))
            .await
            .unwrap();

        let dry = payload(&result);
        assert_eq!(dry["changes"]["writes"][0], "README.md");
        assert_eq!(workspace.read_file("README.md").await.unwrap(), "# Draft");
        assert!(workspace.commands().await.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_keeps_queue_untouched() {
        let (server, workspace, _dir) = setup();
        let id = server
            .queue
            .write()
            .await
            .enqueue(ExecutableAction::ShellCommand(ShellCommand::new("make release")));

        server
            .apply_actions(Parameters(ApplyActionsArgs {
                text: RESPONSE.to_string(),
                session_id: None,
                dry_run: Some(true),
            }))
            .await
            .unwrap();

        let status = payload(
            &server
                .queue_status(Parameters(QueueStatusArgs {}))
                .await
                .unwrap(),
        );
        assert_eq!(status["total"], 1);
        assert_eq!(status["counts"]["pending"], 1);
        assert_eq!(status["items"][0]["id"], id.to_string());
        assert!(workspace.commands().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_action_flags_result() {
        let (server, workspace, _dir) = setup();
        workspace.fail_command("make docs").await;

        let result = server
            .apply_actions(Parameters(ApplyActionsArgs {
                text: RESPONSE.to_string(),
                session_id: None,
                dry_run: None,
            }))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
        let report = payload(&result);
        assert_eq!(report["result"]["completed"], 1);
        assert_eq!(report["result"]["failed"], 1);
    }

    #[tokio::test]
    async fn test_restore_without_checkpoints() {
        let (server, _workspace, _dir) = setup();

        let result = server
            .restore_checkpoint(Parameters(RestoreCheckpointArgs {
                checkpoint_id: None,
                session_id: None,
            }))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
    }
}
