//! Queue entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::ExecutableAction;

static NEXT_ACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique queue entry id (`action-N`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    pub fn generate() -> Self {
        let n = NEXT_ACTION_ID.fetch_add(1, Ordering::Relaxed);
        Self(format!("action-{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ActionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Completed | ActionStatus::Failed | ActionStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: ActionStatus) -> bool {
        use ActionStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (*self, next),
            (Pending, InProgress)
                | (Pending, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::InProgress => "in_progress",
            ActionStatus::Completed => "completed",
            ActionStatus::Failed => "failed",
            ActionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action plus its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedAction {
    pub id: ActionId,
    pub action: ExecutableAction,
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedAction {
    pub(super) fn new(action: ExecutableAction) -> Self {
        Self {
            id: ActionId::generate(),
            action,
            status: ActionStatus::Pending,
            error: None,
            enqueued_at: Utc::now(),
        }
    }
}

/// Number of entries in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed + self.failed + self.cancelled
    }

    fn slot(&mut self, status: ActionStatus) -> &mut usize {
        match status {
            ActionStatus::Pending => &mut self.pending,
            ActionStatus::InProgress => &mut self.in_progress,
            ActionStatus::Completed => &mut self.completed,
            ActionStatus::Failed => &mut self.failed,
            ActionStatus::Cancelled => &mut self.cancelled,
        }
    }

    pub(super) fn add(&mut self, status: ActionStatus) {
        *self.slot(status) += 1;
    }

    pub(super) fn remove(&mut self, status: ActionStatus) {
        let slot = self.slot(status);
        *slot = slot.saturating_sub(1);
    }
}
