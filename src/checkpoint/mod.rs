//! Checkpoints of workspace file state.
//!
//! A checkpoint is taken immediately before a batch of file edits is
//! applied, so the whole batch can be rolled back as a unit. Checkpoints
//! are immutable: capture deep-copies the file set, and restore hands back
//! a fresh copy.

mod files;
mod history;
mod store;

pub use files::FileSet;
pub use history::CheckpointHistory;
pub use store::CheckpointStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::workspace::{Workspace, WorkspaceError};

/// Snapshot of file state for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub id: String,
    pub session_id: String,
    pub description: String,
    pub files: FileSet,
    /// Paths that did not exist at capture time; rollback removes them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Record paths that were absent when the checkpoint was taken.
    pub fn with_missing(mut self, missing: Vec<String>) -> Self {
        self.missing = missing;
        self
    }


    pub fn summary(&self) -> CheckpointSummary {
        CheckpointSummary {
            id: self.id.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
            file_count: self.files.len(),
            total_bytes: self.files.total_bytes(),
        }
    }
}

/// Checkpoint metadata without file contents, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointSummary {
    pub id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub file_count: usize,
    pub total_bytes: usize,
}

/// Changes that turn a live file set back into a checkpoint's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestorePlan {
    /// `(path, content)` for files that differ or are missing
    pub writes: Vec<(String, String)>,
    /// Files present live but absent from the checkpoint
    pub deletes: Vec<String>,
}

impl RestorePlan {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreFailure {
    pub path: String,
    pub error: String,
}

/// Outcome of a rollback. Per-file failures do not stop the rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub checkpoint_id: String,
    pub written: Vec<String>,
    pub deleted: Vec<String>,
    pub failures: Vec<RestoreFailure>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Stateless capture and restore operations.
pub struct CheckpointManager;

impl CheckpointManager {
    /// Take an isolated copy of `files`.
    pub fn capture(session_id: &str, description: &str, files: &FileSet) -> Checkpoint {
        let checkpoint = Checkpoint {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            description: description.to_string(),
            files: files.clone(),
            missing: Vec::new(),
            created_at: Utc::now(),
        };
        debug!(
            "Captured checkpoint {} for session {} ({} files)",
            checkpoint.id,
            session_id,
            checkpoint.files.len()
        );
        checkpoint
    }

    /// The checkpoint's files, to be re-applied as the live state.
    pub fn restore(checkpoint: &Checkpoint) -> FileSet {
        checkpoint.files.clone()
    }

    pub fn plan_restore(checkpoint: &Checkpoint, live: &FileSet) -> RestorePlan {
        let target = Self::restore(checkpoint);
        let writes = target
            .iter()
            .filter(|(path, record)| live.get(path).map(|l| l.hash != record.hash).unwrap_or(true))
            .map(|(path, record)| (path.clone(), record.content.clone()))
            .collect();

        let deletes = live
            .paths()
            .filter(|path| !target.contains(path))
            .cloned()
            .collect();

        RestorePlan { writes, deletes }
    }

    /// Bring the workspace back to `checkpoint`.
    ///
    /// Fails only if the live state cannot be read; individual write and
    /// delete failures are collected in the report.
    pub async fn rollback(
        workspace: &dyn Workspace,
        checkpoint: &Checkpoint,
    ) -> Result<RestoreReport, WorkspaceError> {
        let mut live = workspace.snapshot_files().await?;

        // The scan leaves out ignored and oversized files; look up every
        // tracked path it did not report so edits to those roll back too
        let tracked = checkpoint.files.paths().chain(checkpoint.missing.iter());
        let unseen: Vec<String> = tracked.filter(|path| !live.contains(path)).cloned().collect();
        for path in unseen {
            match workspace.read_file(&path).await {
                Ok(content) => {
                    live.insert(path, content);
                }
                Err(WorkspaceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let plan = Self::plan_restore(checkpoint, &live);

        let mut report = RestoreReport {
            checkpoint_id: checkpoint.id.clone(),
            ..RestoreReport::default()
        };

        if plan.is_empty() {
            info!("Workspace already matches checkpoint {}", checkpoint.id);
            return Ok(report);
        }

        for (path, content) in plan.writes {
            match workspace.write_file(&path, &content).await {
                Ok(()) => report.written.push(path),
                Err(e) => {
                    warn!("Failed to restore {}: {}", path, e);
                    report.failures.push(RestoreFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        for path in plan.deletes {
            match workspace.delete_file(&path).await {
                Ok(()) => report.deleted.push(path),
                Err(e) => {
                    warn!("Failed to remove {}: {}", path, e);
                    report.failures.push(RestoreFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Rolled back to checkpoint {}: {} written, {} deleted, {} failed",
            checkpoint.id,
            report.written.len(),
            report.deleted.len(),
            report.failures.len()
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::InMemoryWorkspace;

    fn files(entries: &[(&str, &str)]) -> FileSet {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_capture_is_isolated_from_live_files() {
        let mut live = files(&[("a.txt", "original")]);
        let checkpoint = CheckpointManager::capture("s1", "before edits", &live);

        live.insert("a.txt", "changed");
        live.insert("b.txt", "new");

        assert_eq!(checkpoint.files.content("a.txt"), Some("original"));
        assert!(!checkpoint.files.contains("b.txt"));
        assert_eq!(checkpoint.session_id, "s1");
        assert_eq!(checkpoint.description, "before edits");
    }

    #[test]
    fn test_restore_returns_snapshot_verbatim() {
        let live = files(&[("a.txt", "1"), ("b.txt", "2")]);
        let checkpoint = CheckpointManager::capture("s1", "", &live);

        let mut restored = CheckpointManager::restore(&checkpoint);
        assert_eq!(restored, live);

        // Mutating the restored copy leaves the checkpoint alone
        restored.remove("a.txt");
        assert!(checkpoint.files.contains("a.txt"));
    }

    #[test]
    fn test_plan_restore() {
        let checkpoint = CheckpointManager::capture(
            "s1",
            "",
            &files(&[("same.txt", "s"), ("edited.txt", "old"), ("deleted.txt", "d")]),
        );
        let live = files(&[("same.txt", "s"), ("edited.txt", "new"), ("created.txt", "c")]);

        let plan = CheckpointManager::plan_restore(&checkpoint, &live);
        assert_eq!(
            plan.writes,
            vec![
                ("deleted.txt".to_string(), "d".to_string()),
                ("edited.txt".to_string(), "old".to_string()),
            ]
        );
        assert_eq!(plan.deletes, vec!["created.txt".to_string()]);

        assert!(CheckpointManager::plan_restore(&checkpoint, &checkpoint.files).is_empty());
    }

    #[tokio::test]
    async fn test_rollback_restores_modified_created_and_deleted_files() {
        let workspace = InMemoryWorkspace::with_files(files(&[("a.txt", "a"), ("b.txt", "b")]));
        let checkpoint =
            CheckpointManager::capture("s1", "", &workspace.snapshot_files().await.unwrap());

        workspace.write_file("a.txt", "A!").await.unwrap();
        workspace.delete_file("b.txt").await.unwrap();
        workspace.write_file("c.txt", "c").await.unwrap();

        let report = CheckpointManager::rollback(&workspace, &checkpoint)
            .await
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.checkpoint_id, checkpoint.id);
        assert_eq!(report.written, vec!["a.txt", "b.txt"]);
        assert_eq!(report.deleted, vec!["c.txt"]);
        assert_eq!(workspace.files().await, checkpoint.files);
    }

    #[tokio::test]
    async fn test_rollback_removes_paths_recorded_missing() {
        let workspace = InMemoryWorkspace::with_files(files(&[("a.txt", "a")]));
        let checkpoint =
            CheckpointManager::capture("s1", "", &workspace.snapshot_files().await.unwrap())
                .with_missing(vec!["gone.txt".to_string(), "never.txt".to_string()]);

        workspace.write_file("gone.txt", "created").await.unwrap();

        let report = CheckpointManager::rollback(&workspace, &checkpoint)
            .await
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.deleted, vec!["gone.txt"]);
        assert!(matches!(
            workspace.read_file("gone.txt").await,
            Err(WorkspaceError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_defaults_when_absent_from_json() {
        let checkpoint = CheckpointManager::capture("s1", "", &files(&[("a.txt", "a")]));
        let mut value = serde_json::to_value(&checkpoint).unwrap();
        assert!(value.get("missing").is_none());

        value["missing"] = serde_json::json!(["new.txt"]);
        let parsed: Checkpoint = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.missing, vec!["new.txt"]);
    }

    #[tokio::test]
    async fn test_rollback_when_already_current() {
        let workspace = InMemoryWorkspace::with_files(files(&[("a.txt", "a")]));
        let checkpoint =
            CheckpointManager::capture("s1", "", &workspace.snapshot_files().await.unwrap());

        let report = CheckpointManager::rollback(&workspace, &checkpoint)
            .await
            .unwrap();
        assert!(report.written.is_empty());
        assert!(report.deleted.is_empty());
    }
}
