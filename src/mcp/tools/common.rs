//! Common utilities for MCP tools.

use rmcp::{model::*, ErrorData as McpError};
use serde::Serialize;

/// Error result for tool failures
pub fn tool_error(message: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message.into())])
}

/// Success result carrying `value` as pretty JSON.
pub fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("Failed to serialize result: {}", e), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Render an error with its cause chain on one line.
pub fn describe_error(error: &anyhow::Error) -> String {
    format!("{:#}", error)
}
