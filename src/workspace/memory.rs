use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::{ShellOutput, Workspace, WorkspaceError};
use crate::checkpoint::FileSet;
use crate::domain::{PackageInstall, ShellCommand};

/// Map-backed workspace. Shell commands and installs are recorded, not run.
#[derive(Debug, Default)]
pub struct InMemoryWorkspace {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: FileSet,
    commands: Vec<ShellCommand>,
    installs: Vec<PackageInstall>,
    failing_commands: HashSet<String>,
    command_delays: HashMap<String, Duration>,
}

impl InMemoryWorkspace {
    /// Start from a copy of `files`.
    pub fn with_files(files: FileSet) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                files,
                ..MemoryState::default()
            }),
        }
    }

    pub async fn files(&self) -> FileSet {
        self.state.lock().await.files.clone()
    }

    /// Commands seen so far, in call order.
    pub async fn commands(&self) -> Vec<ShellCommand> {
        self.state.lock().await.commands.clone()
    }

    pub async fn installs(&self) -> Vec<PackageInstall> {
        self.state.lock().await.installs.clone()
    }

    /// Make `command` exit with status 1.
    #[cfg(test)]
    pub async fn fail_command(&self, command: &str) {
        self.state
            .lock()
            .await
            .failing_commands
            .insert(command.to_string());
    }

    /// Make `command` take `delay` before returning.
    #[cfg(test)]
    pub async fn delay_command(&self, command: &str, delay: Duration) {
        self.state
            .lock()
            .await
            .command_delays
            .insert(command.to_string(), delay);
    }
}

#[async_trait]
impl Workspace for InMemoryWorkspace {
    async fn read_file(&self, path: &str) -> Result<String, WorkspaceError> {
        self.state
            .lock()
            .await
            .files
            .content(path)
            .map(str::to_string)
            .ok_or_else(|| WorkspaceError::NotFound(path.to_string()))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), WorkspaceError> {
        self.state.lock().await.files.insert(path, content);
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<(), WorkspaceError> {
        self.state
            .lock()
            .await
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| WorkspaceError::NotFound(path.to_string()))
    }

    async fn execute_shell(
        &self,
        command: &str,
        working_directory: Option<&str>,
    ) -> Result<ShellOutput, WorkspaceError> {
        let (delay, fails) = {
            let mut state = self.state.lock().await;
            state.commands.push(ShellCommand {
                command: command.to_string(),
                working_directory: working_directory.map(str::to_string),
            });
            (
                state.command_delays.get(command).copied(),
                state.failing_commands.contains(command),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if fails {
            return Err(WorkspaceError::CommandFailed {
                command: command.to_string(),
                exit_code: Some(1),
                stderr: format!("{}: command failed", command),
            });
        }

        debug!("Recorded command `{}`", command);
        Ok(ShellOutput {
            exit_code: Some(0),
            ..ShellOutput::default()
        })
    }

    async fn install_packages(&self, language: &str, packages: &[String]) -> Result<(), WorkspaceError> {
        self.state.lock().await.installs.push(PackageInstall {
            language: language.to_string(),
            packages: packages.to_vec(),
        });
        Ok(())
    }

    async fn snapshot_files(&self) -> Result<FileSet, WorkspaceError> {
        Ok(self.files().await)
    }
}
