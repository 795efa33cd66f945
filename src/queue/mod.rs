//! Action queue with per-item lifecycle state.
//!
//! The queue owns its entries. Callers enqueue and remove; the batch
//! executor moves entries through their status lifecycle:
//!
//! ```text
//! pending ──► in_progress ──► completed | failed | cancelled
//!    └──────────────────────► cancelled
//! ```
//!
//! Terminal states are final. Retrying means enqueueing again.

mod types;

pub use types::{ActionId, ActionStatus, QueuedAction, StatusCounts};

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{ActionBatch, ExecutableAction};

/// Shared queue type for async operations
pub type SharedActionQueue = Arc<RwLock<ActionQueue>>;

/// Create a shared, empty action queue
pub fn create_shared_action_queue() -> SharedActionQueue {
    Arc::new(RwLock::new(ActionQueue::new()))
}

/// FIFO collection of queued actions.
#[derive(Debug, Default)]
pub struct ActionQueue {
    items: Vec<QueuedAction>,
    counts: StatusCounts,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action as `pending` and return its id.
    pub fn enqueue(&mut self, action: ExecutableAction) -> ActionId {
        let item = QueuedAction::new(action);
        let id = item.id.clone();
        debug!("Enqueued {}: {}", id, item.action.describe());
        self.counts.add(item.status);
        self.items.push(item);
        id
    }

    /// Enqueue the executable actions of a batch, in canonical order.
    pub fn enqueue_batch(&mut self, batch: &ActionBatch) -> Vec<ActionId> {
        batch
            .executable()
            .into_iter()
            .map(|action| self.enqueue(action))
            .collect()
    }

    /// Move an entry to `status`, recording `error` for failures.
    ///
    /// Unknown ids are ignored. Transitions the lifecycle does not allow
    /// are refused. Returns whether the entry changed.
    pub fn update_status(&mut self, id: &ActionId, status: ActionStatus, error: Option<String>) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| &item.id == id) else {
            debug!("Ignoring status update for unknown action {}", id);
            return false;
        };

        if !item.status.can_transition_to(status) {
            debug!(
                "Refusing transition of {} from {} to {}",
                id, item.status, status
            );
            return false;
        }

        self.counts.remove(item.status);
        self.counts.add(status);
        item.status = status;
        item.error = error;
        true
    }

    /// Mark a pending entry `in_progress` and return a copy of its action.
    ///
    /// Returns `None` if the entry is gone or no longer pending.
    pub fn begin(&mut self, id: &ActionId) -> Option<ExecutableAction> {
        let action = self
            .get(id)
            .filter(|item| item.status == ActionStatus::Pending)
            .map(|item| item.action.clone())?;
        self.update_status(id, ActionStatus::InProgress, None)
            .then_some(action)
    }

    pub fn remove(&mut self, id: &ActionId) -> Option<QueuedAction> {
        let idx = self.items.iter().position(|item| &item.id == id)?;
        let item = self.items.remove(idx);
        self.counts.remove(item.status);
        Some(item)
    }

    /// Drop every `completed` entry.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.status != ActionStatus::Completed);
        let removed = before - self.items.len();
        self.counts.completed = 0;
        removed
    }

    pub fn clear_all(&mut self) {
        self.items.clear();
        self.counts = StatusCounts::default();
    }

    pub fn get(&self, id: &ActionId) -> Option<&QueuedAction> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedAction> {
        self.items.iter()
    }

    /// Ids of every `pending` entry, in insertion order.
    pub fn pending_ids(&self) -> Vec<ActionId> {
        self.items
            .iter()
            .filter(|item| item.status == ActionStatus::Pending)
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn counts(&self) -> StatusCounts {
        self.counts
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
