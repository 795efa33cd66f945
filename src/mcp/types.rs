//! MCP tool parameter types.
//!
//! These types are used with rmcp's `Parameters<T>` wrapper for automatic
//! deserialization and JSON schema generation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::queue::{QueuedAction, StatusCounts};

/// Parameters for the extract_actions tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractActionsArgs {
    /// Assistant response text containing proposed-action tags
    pub text: String,
}

/// Parameters for the apply_actions tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ApplyActionsArgs {
    /// Assistant response text containing proposed-action tags
    pub text: String,
    /// Checkpoint session; defaults to the server's session
    #[serde(default)]
    pub session_id: Option<String>,
    /// Run against a scratch copy and report what would change
    #[serde(default)]
    pub dry_run: Option<bool>,
}

/// Parameters for the queue_status tool (no arguments needed)
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueueStatusArgs {}

/// Parameters for the clear_queue tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ClearQueueArgs {
    /// Remove just this entry, whatever its status
    #[serde(default)]
    pub id: Option<String>,
    /// Drop every entry, not only completed ones
    #[serde(default)]
    pub all: Option<bool>,
}

/// Parameters for the list_checkpoints tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListCheckpointsArgs {
    /// Checkpoint session; defaults to the server's session
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Parameters for the restore_checkpoint tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RestoreCheckpointArgs {
    /// Checkpoint to restore; the latest one when omitted
    #[serde(default)]
    pub checkpoint_id: Option<String>,
    /// Checkpoint session; defaults to the server's session
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Result of the queue_status tool.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub total: usize,
    pub counts: StatusCounts,
    pub items: Vec<QueuedAction>,
}
