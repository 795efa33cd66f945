//! Domain types shared across modules.
//!
//! This module contains the action vocabulary used by the extractor, the
//! queue, the executor and the outer surfaces (CLI, MCP tools). Keeping it
//! here avoids circular dependencies between those modules.

mod action;
mod batch;

pub use action::{
    ActionKind, ChangeType, DeploymentConfiguration, ExecutableAction, FileEdit,
    PackageInstall, RagSourceReference, ShellCommand, WorkflowConfiguration, WorkflowMode,
    WorkspaceToolNudge,
};
pub use batch::ActionBatch;
