//! MCP (Model Context Protocol) server implementation using rmcp.
//!
//! The server exposes extraction, application, queue inspection and
//! checkpoint rollback as tools over stdio.

mod handlers;
mod server;
mod tools;
pub mod types;

// Re-export run_mcp_server from handlers
pub use handlers::run_mcp_server;
