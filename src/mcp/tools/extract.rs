//! Extract tool implementation.

use rmcp::{model::*, ErrorData as McpError};

use super::common::json_result;
use crate::extract::extract;
use crate::mcp::types::ExtractActionsArgs;

/// Parse the proposed actions out of a response without running anything
pub fn extract_actions(args: ExtractActionsArgs) -> Result<CallToolResult, McpError> {
    json_result(&extract(&args.text))
}
