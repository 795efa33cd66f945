//! Extract → enqueue → checkpoint → execute, as one call.

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use std::sync::Arc;

use crate::checkpoint::{Checkpoint, CheckpointManager, CheckpointStore};
use crate::domain::{ActionBatch, ExecutableAction, PackageInstall, ShellCommand};
use crate::executor::{BatchExecutor, BatchResult};
use crate::extract::extract;
use crate::queue::{create_shared_action_queue, ActionId, ActionStatus, SharedActionQueue};
use crate::workspace::{InMemoryWorkspace, WorkspaceError};

/// Everything one `apply_text` call did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    /// All extracted actions, including the informational kinds
    pub batch: ActionBatch,
    pub enqueued: Vec<ActionId>,
    /// Checkpoint taken before the batch ran, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<String>,
    pub result: BatchResult,
}

/// What a dry run would have done to the real workspace.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunChanges {
    pub writes: Vec<String>,
    pub deletes: Vec<String>,
    pub commands: Vec<ShellCommand>,
    pub installs: Vec<PackageInstall>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunReport {
    pub report: ApplyReport,
    pub changes: DryRunChanges,
}

pub struct ApplyPipeline {
    executor: BatchExecutor,
    session_id: String,
    checkpoints: Option<CheckpointStore>,
}

impl ApplyPipeline {
    /// A pipeline that applies without checkpoints.
    pub fn new(executor: BatchExecutor, session_id: impl Into<String>) -> Self {
        Self {
            executor,
            session_id: session_id.into(),
            checkpoints: None,
        }
    }

    /// Capture and persist a checkpoint before any batch with file edits.
    pub fn with_checkpoints(mut self, store: CheckpointStore) -> Self {
        self.checkpoints = Some(store);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run `text` against a scratch copy of the workspace.
    ///
    /// The batch runs on its own queue, so actions pending elsewhere are
    /// left alone. Nothing touches the real workspace and no checkpoint is
    /// saved.
    pub async fn dry_run(&self, text: &str, cancel: &CancellationToken) -> Result<DryRunReport> {
        let before = self
            .executor
            .workspace()
            .snapshot_files()
            .await
            .context("Failed to snapshot workspace for dry run")?;
        let scratch = Arc::new(InMemoryWorkspace::with_files(before.clone()));
        let pipeline = ApplyPipeline::new(
            self.executor.with_workspace(scratch.clone()),
            self.session_id.clone(),
        );
        let queue = create_shared_action_queue();
        let report = pipeline.apply_text(text, &queue, cancel).await?;

        // The plan that takes the original state to the scratch state is
        // exactly what the batch did
        let after = CheckpointManager::capture(&self.session_id, "dry run", &scratch.files().await);
        let plan = CheckpointManager::plan_restore(&after, &before);
        let changes = DryRunChanges {
            writes: plan.writes.into_iter().map(|(path, _)| path).collect(),
            deletes: plan.deletes,
            commands: scratch.commands().await,
            installs: scratch.installs().await,
        };

        Ok(DryRunReport { report, changes })
    }

    /// Apply every action proposed in `text`.
    ///
    /// The checkpoint is written before anything is enqueued, so a failed
    /// capture leaves the queue untouched.
    pub async fn apply_text(
        &self,
        text: &str,
        queue: &SharedActionQueue,
        cancel: &CancellationToken,
    ) -> Result<ApplyReport> {
        let batch = extract(text);

        let mut targets = pending_edit_targets(queue).await;
        targets.extend(batch.file_edits.iter().map(|edit| edit.file.clone()));

        let checkpoint_id = match &self.checkpoints {
            Some(store) if !targets.is_empty() => {
                let edits = targets.len();
                targets.sort();
                targets.dedup();
                let checkpoint = self
                    .capture_checkpoint(&format!("Before applying {} file edit(s)", edits), &targets)
                    .await?;
                let id = checkpoint.id.clone();
                let file_count = checkpoint.files.len();
                store
                    .append(checkpoint)
                    .context("Failed to save checkpoint")?;
                info!("Saved checkpoint {} ({} files)", id, file_count);
                Some(id)
            }
            _ => None,
        };

        let enqueued = queue.write().await.enqueue_batch(&batch);
        let result = self.executor.process_batch(queue, cancel).await;

        Ok(ApplyReport {
            batch,
            enqueued,
            checkpoint_id,
            result,
        })
    }

    /// Snapshot the workspace plus every edit target the scan skipped.
    async fn capture_checkpoint(&self, description: &str, targets: &[String]) -> Result<Checkpoint> {
        let workspace = self.executor.workspace();
        let mut files = workspace
            .snapshot_files()
            .await
            .context("Failed to snapshot workspace for checkpoint")?;

        let unseen: Vec<&String> = targets.iter().filter(|path| !files.contains(path)).collect();
        let mut missing = Vec::new();
        for path in unseen {
            match workspace.read_file(path).await {
                Ok(content) => {
                    debug!("Checkpointing {} outside the scanned set", path);
                    files.insert(path.clone(), content);
                }
                Err(WorkspaceError::NotFound(_)) => missing.push(path.clone()),
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to read {} for checkpoint", path));
                }
            }
        }

        Ok(CheckpointManager::capture(&self.session_id, description, &files).with_missing(missing))
    }
}

/// Files touched by edits still waiting in the queue.
async fn pending_edit_targets(queue: &SharedActionQueue) -> Vec<String> {
    queue
        .read()
        .await
        .iter()
        .filter(|item| item.status == ActionStatus::Pending)
        .filter_map(|item| match &item.action {
            ExecutableAction::FileEdit(edit) => Some(edit.file.clone()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::FileSet;
    use crate::executor::ExecutorConfig;
    use crate::queue::create_shared_action_queue;
    use crate::workspace::{InMemoryWorkspace, LocalWorkspace, Workspace};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    const RESPONSE: &str = r#"I'll rename the greeting and run the tests.

<proposed_file_replace_substring file_path="src/app.js">
<old_str>hello</old_str>
<new_str>hi</new_str>
</proposed_file_replace_substring>

<proposed_shell_command>npm test</proposed_shell_command>
<proposed_workspace_tool_nudge tool_name="secrets" reason="Add API_KEY" />"#;

    fn setup() -> (Arc<InMemoryWorkspace>, BatchExecutor, TempDir) {
        let files: FileSet = [("src/app.js", "say('hello')")].into_iter().collect();
        let workspace = Arc::new(InMemoryWorkspace::with_files(files));
        let executor = BatchExecutor::new(workspace.clone(), ExecutorConfig::default());
        (workspace, executor, TempDir::new().unwrap())
    }

    #[tokio::test]
    async fn test_apply_text_end_to_end() {
        let (workspace, executor, data_dir) = setup();
        let store = CheckpointStore::new(data_dir.path());
        let pipeline = ApplyPipeline::new(executor, "s1").with_checkpoints(store.clone());
        let queue = create_shared_action_queue();

        let report = pipeline
            .apply_text(RESPONSE, &queue, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.batch.workspace_nudges.len(), 1);
        assert_eq!(report.enqueued.len(), 2);
        assert_eq!(report.result.total, 2);
        assert_eq!(report.result.completed, 2);
        assert_eq!(workspace.read_file("src/app.js").await.unwrap(), "say('hi')");

        // The checkpoint holds the state from before the edit
        let history = store.load("s1").unwrap();
        let checkpoint = history.latest().unwrap();
        assert_eq!(Some(&checkpoint.id), report.checkpoint_id.as_ref());
        assert_eq!(checkpoint.files.content("src/app.js"), Some("say('hello')"));

        CheckpointManager::rollback(&*workspace, checkpoint)
            .await
            .unwrap();
        assert_eq!(
            workspace.read_file("src/app.js").await.unwrap(),
            "say('hello')"
        );
    }

    #[tokio::test]
    async fn test_no_checkpoint_without_file_edits() {
        let (_workspace, executor, data_dir) = setup();
        let store = CheckpointStore::new(data_dir.path());
        let pipeline = ApplyPipeline::new(executor, "s1").with_checkpoints(store.clone());

        let report = pipeline
            .apply_text(
                "<proposed_shell_command>ls</proposed_shell_command>",
                &create_shared_action_queue(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(report.checkpoint_id.is_none());
        assert!(store.load("s1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkpoints_disabled() {
        let (_workspace, executor, _data_dir) = setup();
        let pipeline = ApplyPipeline::new(executor, "s1");

        let report = pipeline
            .apply_text(RESPONSE, &create_shared_action_queue(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.checkpoint_id.is_none());
        assert_eq!(report.result.completed, 2);
    }

    #[tokio::test]
    async fn test_prose_only_is_a_no_op() {
        let (workspace, executor, _data_dir) = setup();
        let pipeline = ApplyPipeline::new(executor, "s1");

        let report = pipeline
            .apply_text("Looks good to me!", &create_shared_action_queue(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.batch.is_empty());
        assert_eq!(report.result.total, 0);
        assert!(workspace.commands().await.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_leaves_workspace_untouched() {
        let (workspace, executor, data_dir) = setup();
        let store = CheckpointStore::new(data_dir.path());
        let pipeline = ApplyPipeline::new(executor, "s1").with_checkpoints(store.clone());

        let dry = pipeline
            .dry_run(RESPONSE, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(dry.report.result.completed, 2);
        assert!(dry.report.checkpoint_id.is_none());
        assert_eq!(dry.changes.writes, vec!["src/app.js".to_string()]);
        assert!(dry.changes.deletes.is_empty());
        assert_eq!(dry.changes.commands.len(), 1);
        assert_eq!(dry.changes.commands[0].command, "npm test");

        assert_eq!(
            workspace.read_file("src/app.js").await.unwrap(),
            "say('hello')"
        );
        assert!(workspace.commands().await.is_empty());
        assert!(store.load("s1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_leaves_queued_actions_pending() {
        let (workspace, executor, _data_dir) = setup();
        let pipeline = ApplyPipeline::new(executor.clone(), "s1");
        let queue = create_shared_action_queue();
        let id = queue
            .write()
            .await
            .enqueue(ExecutableAction::ShellCommand(ShellCommand::new("make build")));

        let dry = pipeline
            .dry_run(RESPONSE, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(dry.report.result.total, 2);
        assert_eq!(dry.changes.commands.len(), 1);
        assert_eq!(dry.changes.commands[0].command, "npm test");

        {
            let queue = queue.read().await;
            assert_eq!(queue.len(), 1);
            assert_eq!(queue.get(&id).unwrap().status, ActionStatus::Pending);
        }
        assert!(workspace.commands().await.is_empty());

        // The entry still runs for real afterwards
        let result = executor
            .process_batch(&queue, &CancellationToken::new())
            .await;
        assert_eq!(result.total, 1);
        assert_eq!(result.completed, 1);
        assert_eq!(workspace.commands().await[0].command, "make build");
    }

    #[tokio::test]
    async fn test_rollback_covers_files_outside_the_scan() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(".gitignore"), "config/\n").unwrap();
        fs::create_dir(root.path().join("config")).unwrap();
        fs::write(root.path().join("config/app.toml"), "port = 1").unwrap();
        fs::write(root.path().join(".env"), "KEY=old").unwrap();

        let workspace = Arc::new(LocalWorkspace::new(root.path()));
        let executor = BatchExecutor::new(workspace.clone(), ExecutorConfig::default());
        let data_dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(data_dir.path());
        let pipeline = ApplyPipeline::new(executor, "s1").with_checkpoints(store.clone());

        let text = r#"<proposed_file_replace_substring file_path="config/app.toml">
<old_str>port = 1</old_str>
<new_str>port = 2</new_str>
</proposed_file_replace_substring>
<proposed_file_replace_substring file_path=".env">
<old_str>KEY=old</old_str>
<new_str>KEY=new</new_str>
</proposed_file_replace_substring>
<proposed_file_replace file_path="config/local.toml">debug = true</proposed_file_replace>"#;

        let report = pipeline
            .apply_text(text, &create_shared_action_queue(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.result.completed, 3);
        assert_eq!(workspace.read_file(".env").await.unwrap(), "KEY=new");
        assert!(root.path().join("config/local.toml").exists());

        let history = store.load("s1").unwrap();
        let checkpoint = history.latest().unwrap();
        assert_eq!(checkpoint.files.content("config/app.toml"), Some("port = 1"));
        assert_eq!(checkpoint.files.content(".env"), Some("KEY=old"));
        assert_eq!(checkpoint.missing, vec!["config/local.toml".to_string()]);

        let restored = CheckpointManager::rollback(&*workspace, checkpoint)
            .await
            .unwrap();
        assert!(restored.is_complete());
        assert_eq!(
            workspace.read_file("config/app.toml").await.unwrap(),
            "port = 1"
        );
        assert_eq!(workspace.read_file(".env").await.unwrap(), "KEY=old");
        assert!(!root.path().join("config/local.toml").exists());
    }
}
