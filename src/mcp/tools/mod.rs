//! MCP tool implementations.
//!
//! Each tool is implemented in its own module for better organization.

mod apply;
mod checkpoints;
mod common;
mod extract;
mod queue;

// Re-export tool functions
pub use apply::apply_actions;
pub use checkpoints::{list_checkpoints, restore_checkpoint};
pub use extract::extract_actions;
pub use queue::{clear_queue, queue_status};
