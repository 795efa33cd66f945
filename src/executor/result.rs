use serde::{Deserialize, Serialize};

use crate::queue::{ActionId, ActionStatus};

/// Final state of one action within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub id: ActionId,
    pub status: ActionStatus,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report for one `process_batch` call.
///
/// `completed + failed + cancelled + skipped == total`, where `total` is the
/// number of pending actions when the batch started. Skipped actions left
/// the queue or were taken by another caller before their turn, and have
/// no entry in `results`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub skipped: usize,
    pub results: Vec<ActionOutcome>,
}

impl BatchResult {
    pub(super) fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(super) fn record(&mut self, id: ActionId, status: ActionStatus, error: Option<String>) {
        match status {
            ActionStatus::Completed => self.completed += 1,
            ActionStatus::Failed => self.failed += 1,
            ActionStatus::Cancelled => self.cancelled += 1,
            ActionStatus::Pending | ActionStatus::InProgress => {
                self.skipped += 1;
                return;
            }
        }
        self.results.push(ActionOutcome {
            id,
            status,
            success: status == ActionStatus::Completed,
            error,
        });
    }

    pub(super) fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn all_succeeded(&self) -> bool {
        self.completed == self.total
    }

    /// User-facing summary, e.g. `"2 succeeded, 1 failed"`.
    pub fn summary(&self) -> String {
        let mut summary = format!("{} succeeded, {} failed", self.completed, self.failed);
        if self.cancelled > 0 {
            summary.push_str(&format!(", {} cancelled", self.cancelled));
        }
        if self.skipped > 0 {
            summary.push_str(&format!(", {} skipped", self.skipped));
        }
        summary
    }
}
