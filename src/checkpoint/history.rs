use serde::{Deserialize, Serialize};

use super::Checkpoint;

/// Append-only, ordered checkpoints of one session. The last one is the tip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointHistory {
    pub session_id: String,
    #[serde(default)]
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointHistory {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            checkpoints: Vec::new(),
        }
    }

    pub fn push(&mut self, checkpoint: Checkpoint) -> &Checkpoint {
        self.checkpoints.push(checkpoint);
        &self.checkpoints[self.checkpoints.len() - 1]
    }

    pub fn latest(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    pub fn get(&self, id: &str) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|c| c.id == id)
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}
