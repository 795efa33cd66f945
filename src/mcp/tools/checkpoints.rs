//! Checkpoint tools.

use rmcp::{model::*, ErrorData as McpError};
use tracing::warn;

use super::common::{json_result, tool_error};
use crate::checkpoint::{CheckpointManager, CheckpointSummary};
use crate::mcp::types::{ListCheckpointsArgs, RestoreCheckpointArgs};
use crate::runtime::Runtime;

/// List a session's checkpoints, oldest first
pub fn list_checkpoints(
    runtime: &Runtime,
    default_session: &str,
    args: ListCheckpointsArgs,
) -> Result<CallToolResult, McpError> {
    let session = args.session_id.as_deref().unwrap_or(default_session);
    let history = match runtime.checkpoints.load(session) {
        Ok(history) => history,
        Err(e) => return Ok(tool_error(format!("Error loading checkpoints: {}", e))),
    };
    let summaries: Vec<CheckpointSummary> = history.iter().map(|c| c.summary()).collect();
    json_result(&summaries)
}

/// Roll the workspace back to a checkpoint
pub async fn restore_checkpoint(
    runtime: &Runtime,
    default_session: &str,
    args: RestoreCheckpointArgs,
) -> Result<CallToolResult, McpError> {
    let session = args.session_id.as_deref().unwrap_or(default_session);
    let history = match runtime.checkpoints.load(session) {
        Ok(history) => history,
        Err(e) => return Ok(tool_error(format!("Error loading checkpoints: {}", e))),
    };

    let checkpoint = match args.checkpoint_id.as_deref() {
        Some(id) => history.get(id),
        None => history.latest(),
    };
    let Some(checkpoint) = checkpoint else {
        return Ok(tool_error(match args.checkpoint_id {
            Some(id) => format!("Error: No checkpoint {} in session '{}'", id, session),
            None => format!("Error: No checkpoints for session '{}'", session),
        }));
    };

    match CheckpointManager::rollback(runtime.workspace.as_ref(), checkpoint).await {
        Ok(report) => {
            let mut result = json_result(&report)?;
            if !report.is_complete() {
                warn!(
                    "{} file(s) could not be restored from {}",
                    report.failures.len(),
                    checkpoint.id
                );
                result.is_error = Some(true);
            }
            Ok(result)
        }
        Err(e) => Ok(tool_error(format!(
            "Error reading current workspace state: {}",
            e
        ))),
    }
}
