//! Workspace collaborators.
//!
//! The executor never touches files, shells or package managers itself.
//! Every side effect goes through a [`Workspace`]:
//!
//! - [`LocalWorkspace`]: a directory on this machine
//! - [`HttpWorkspace`]: a remote host exposing the workspace over HTTP
//! - [`InMemoryWorkspace`]: a map of files, used for dry runs and tests

mod error;
mod http;
mod local;
mod memory;
mod scanner;
#[cfg(test)]
mod tests;

pub use error::WorkspaceError;
pub use http::HttpWorkspace;
pub use local::{default_package_managers, LocalWorkspace, DEFAULT_SHELL};
pub use memory::InMemoryWorkspace;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::checkpoint::FileSet;

/// Captured output of a shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Side-effect surface the executor and checkpoint rollback delegate to.
///
/// Paths are relative to the workspace root and use forward slashes.
#[async_trait]
pub trait Workspace: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<String, WorkspaceError>;

    /// Write `content`, creating the file and parent directories if needed.
    async fn write_file(&self, path: &str, content: &str) -> Result<(), WorkspaceError>;

    async fn delete_file(&self, path: &str) -> Result<(), WorkspaceError>;

    /// Run `command` through the shell. A non-zero exit is an error.
    async fn execute_shell(
        &self,
        command: &str,
        working_directory: Option<&str>,
    ) -> Result<ShellOutput, WorkspaceError>;

    async fn install_packages(&self, language: &str, packages: &[String]) -> Result<(), WorkspaceError>;

    /// Current content of every tracked text file.
    async fn snapshot_files(&self) -> Result<FileSet, WorkspaceError>;
}
