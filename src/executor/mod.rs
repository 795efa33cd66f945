//! Batch execution of queued actions.
//!
//! [`BatchExecutor::process_batch`] drains the actions that are pending
//! when it is called, one at a time in queue order. Each action is handed
//! to the [`Workspace`] collaborator; a failure is recorded on the action
//! and the batch moves on.

mod error;
mod result;

pub use error::{error_message, ActionError};
pub use result::BatchResult;

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{ChangeType, ExecutableAction, FileEdit};
use crate::queue::{ActionStatus, SharedActionQueue};
use crate::workspace::Workspace;

/// Default per-action timeout in seconds
pub const DEFAULT_ACTION_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Upper bound for a single action; `None` waits indefinitely.
    pub action_timeout: Option<Duration>,
    /// Write an edit back unchanged when its old content is not found,
    /// instead of failing it.
    pub allow_noop_edits: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            action_timeout: Some(Duration::from_secs(DEFAULT_ACTION_TIMEOUT_SECS)),
            allow_noop_edits: false,
        }
    }
}

/// Runs queued actions against a workspace.
#[derive(Clone)]
pub struct BatchExecutor {
    workspace: Arc<dyn Workspace>,
    config: ExecutorConfig,
}

impl BatchExecutor {
    pub fn new(workspace: Arc<dyn Workspace>, config: ExecutorConfig) -> Self {
        Self { workspace, config }
    }

    pub fn workspace(&self) -> &Arc<dyn Workspace> {
        &self.workspace
    }

    /// The same limits over a different workspace.
    pub fn with_workspace(&self, workspace: Arc<dyn Workspace>) -> Self {
        Self {
            workspace,
            config: self.config.clone(),
        }
    }

    /// Execute every action that is pending right now.
    ///
    /// The queue lock is only held for status bookkeeping, never while a
    /// collaborator call is in flight. Once `cancel` fires, the running
    /// action and every remaining one end up `cancelled`.
    pub async fn process_batch(
        &self,
        queue: &SharedActionQueue,
        cancel: &CancellationToken,
    ) -> BatchResult {
        let pending = queue.read().await.pending_ids();
        let mut result = BatchResult::new(pending.len());

        if pending.is_empty() {
            debug!("No pending actions");
            return result;
        }
        info!("Processing {} pending action(s)", pending.len());

        for id in pending {
            if cancel.is_cancelled() {
                let message = ActionError::Cancelled.to_string();
                let updated = queue.write().await.update_status(
                    &id,
                    ActionStatus::Cancelled,
                    Some(message.clone()),
                );
                if updated {
                    result.record(id, ActionStatus::Cancelled, Some(message));
                } else {
                    result.skip();
                }
                continue;
            }

            let action = queue.write().await.begin(&id);
            let Some(action) = action else {
                debug!("Skipping {}: no longer pending", id);
                result.skip();
                continue;
            };

            debug!("Running {}: {}", id, action.describe());
            let (status, error) = match self.run(&action, cancel).await {
                Ok(()) => (ActionStatus::Completed, None),
                Err(e @ ActionError::Cancelled) => (ActionStatus::Cancelled, Some(error_message(&e))),
                Err(e) => {
                    let message = error_message(&e);
                    warn!("Action {} failed: {}", id, message);
                    (ActionStatus::Failed, Some(message))
                }
            };

            queue
                .write()
                .await
                .update_status(&id, status, error.clone());
            result.record(id, status, error);
        }

        info!("Batch finished: {}", result.summary());
        result
    }

    /// Dispatch one action, bounded by the timeout and the cancel token.
    async fn run(&self, action: &ExecutableAction, cancel: &CancellationToken) -> Result<(), ActionError> {
        let bounded = async {
            match self.config.action_timeout {
                Some(limit) => match tokio::time::timeout(limit, self.dispatch(action)).await {
                    Ok(result) => result,
                    Err(_) => Err(ActionError::Timeout(limit)),
                },
                None => self.dispatch(action).await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ActionError::Cancelled),
            result = bounded => result,
        }
    }

    async fn dispatch(&self, action: &ExecutableAction) -> Result<(), ActionError> {
        match action {
            ExecutableAction::FileEdit(edit) => self.apply_file_edit(edit).await,
            ExecutableAction::ShellCommand(cmd) => {
                let output = self
                    .workspace
                    .execute_shell(&cmd.command, cmd.working_directory.as_deref())
                    .await?;
                debug!(
                    "`{}` exited with {:?} ({} bytes of output)",
                    cmd.command,
                    output.exit_code,
                    output.stdout.len()
                );
                Ok(())
            }
            ExecutableAction::PackageInstall(install) => {
                self.workspace
                    .install_packages(&install.language, &install.packages)
                    .await?;
                Ok(())
            }
        }
    }

    async fn apply_file_edit(&self, edit: &FileEdit) -> Result<(), ActionError> {
        let missing = |field| ActionError::MissingContent {
            file: edit.file.clone(),
            change: edit_change_name(edit.change_type),
            field,
        };

        match edit.change_type {
            ChangeType::Create => {
                let content = edit.new_content.as_deref().ok_or_else(|| missing("new content"))?;
                self.workspace.write_file(&edit.file, content).await?;
            }
            ChangeType::Edit => {
                let old = edit.old_content.as_deref().ok_or_else(|| missing("old content"))?;
                let new = edit.new_content.as_deref().ok_or_else(|| missing("new content"))?;

                let current = self.workspace.read_file(&edit.file).await?;
                let updated = if current.contains(old) {
                    current.replacen(old, new, 1)
                } else if self.config.allow_noop_edits {
                    debug!("Old content not found in {}; writing it back unchanged", edit.file);
                    current
                } else {
                    return Err(ActionError::OldContentNotFound(edit.file.clone()));
                };
                self.workspace.write_file(&edit.file, &updated).await?;
            }
            ChangeType::Delete => {
                self.workspace.delete_file(&edit.file).await?;
            }
        }
        Ok(())
    }
}

fn edit_change_name(change: ChangeType) -> &'static str {
    match change {
        ChangeType::Edit => "edit",
        ChangeType::Create => "create",
        ChangeType::Delete => "delete",
    }
}
