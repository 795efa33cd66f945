//! Apply tool implementation.

use rmcp::{model::*, ErrorData as McpError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::common::{describe_error, json_result, tool_error};
use crate::mcp::types::ApplyActionsArgs;
use crate::queue::SharedActionQueue;
use crate::runtime::Runtime;

/// Extract, checkpoint and execute the actions in a response
pub async fn apply_actions(
    runtime: &Runtime,
    queue: &SharedActionQueue,
    cancel: &CancellationToken,
    default_session: &str,
    args: ApplyActionsArgs,
) -> Result<CallToolResult, McpError> {
    let session = args.session_id.as_deref().unwrap_or(default_session);
    let pipeline = runtime.pipeline(session);

    if args.dry_run.unwrap_or(false) {
        return match pipeline.dry_run(&args.text, cancel).await {
            Ok(dry) => json_result(&dry),
            Err(e) => {
                warn!("Dry run failed: {:#}", e);
                Ok(tool_error(format!("Dry run failed: {}", describe_error(&e))))
            }
        };
    }

    match pipeline.apply_text(&args.text, queue, cancel).await {
        Ok(report) => {
            info!(
                "apply_actions [{}]: {}",
                pipeline.session_id(),
                report.result.summary()
            );
            let mut result = json_result(&report)?;
            if !report.result.all_succeeded() {
                result.is_error = Some(true);
            }
            Ok(result)
        }
        Err(e) => {
            warn!("Apply failed: {:#}", e);
            Ok(tool_error(format!("Apply failed: {}", describe_error(&e))))
        }
    }
}
