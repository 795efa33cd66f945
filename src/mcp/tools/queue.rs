//! Queue inspection tools.

use rmcp::{model::*, ErrorData as McpError};

use super::common::{json_result, tool_error};
use crate::mcp::types::{ClearQueueArgs, QueueStatus, QueueStatusArgs};
use crate::queue::{ActionId, SharedActionQueue};

/// Report the status of every queued action
pub async fn queue_status(
    queue: &SharedActionQueue,
    _args: QueueStatusArgs,
) -> Result<CallToolResult, McpError> {
    let queue = queue.read().await;
    let counts = queue.counts();
    json_result(&QueueStatus {
        total: counts.total(),
        counts,
        items: queue.iter().cloned().collect(),
    })
}

/// Drop one entry by id, completed entries, or every entry when `all` is set
pub async fn clear_queue(
    queue: &SharedActionQueue,
    args: ClearQueueArgs,
) -> Result<CallToolResult, McpError> {
    let mut queue = queue.write().await;
    let removed = if let Some(id) = args.id {
        let id = ActionId::from(id);
        if queue.remove(&id).is_none() {
            return Ok(tool_error(format!("Error: No queued action {}", id)));
        }
        1
    } else if args.all.unwrap_or(false) {
        let count = queue.len();
        queue.clear_all();
        count
    } else {
        queue.clear_completed()
    };
    Ok(CallToolResult::success(vec![Content::text(format!(
        "Removed {} queued action(s), {} remaining",
        removed,
        queue.len()
    ))]))
}
