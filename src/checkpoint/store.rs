//! On-disk checkpoint histories.
//!
//! One JSON file per session: `<data_dir>/checkpoints/<uuid>.json`, where
//! the UUID is derived from the session id so any id is a safe file name.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::{Checkpoint, CheckpointHistory};

/// Namespace UUID for session file names
const SESSION_NAMESPACE: Uuid = Uuid::from_bytes([
    0x3f, 0x5c, 0x1e, 0x92, 0x4b, 0x7a, 0x4d, 0x2e, 0x9c, 0x61, 0x0a, 0xd4, 0x58, 0xe3, 0x17, 0xb6,
]);

/// Deterministic file stem for a session id
pub fn compute_session_uuid(session_id: &str) -> String {
    Uuid::new_v5(&SESSION_NAMESPACE, session_id.as_bytes()).to_string()
}

#[derive(Debug, Error)]
pub enum CheckpointStoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse checkpoint history {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize checkpoint history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Checkpoint histories stored under a directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Store rooted at `<data_dir>/checkpoints`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("checkpoints"),
        }
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", compute_session_uuid(session_id)))
    }

    /// Load a session's history. A missing file is an empty history.
    pub fn load(&self, session_id: &str) -> Result<CheckpointHistory, CheckpointStoreError> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(CheckpointHistory::new(session_id));
        }

        let content = fs::read_to_string(&path).map_err(|source| CheckpointStoreError::Io {
            path: path.clone(),
            source,
        })?;
        let history: CheckpointHistory = serde_json::from_str(&content)
            .map_err(|source| CheckpointStoreError::Parse { path, source })?;

        debug!(
            "Loaded {} checkpoint(s) for session {}",
            history.len(),
            session_id
        );
        Ok(history)
    }

    pub fn save(&self, history: &CheckpointHistory) -> Result<(), CheckpointStoreError> {
        let path = self.path_for(&history.session_id);
        let io_error = |source: std::io::Error| CheckpointStoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(history)?;

        // Replace via a sibling temp file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(io_error)?;
        fs::rename(&tmp, &path).map_err(io_error)
    }

    /// Add `checkpoint` to its session's history and persist it.
    pub fn append(&self, checkpoint: Checkpoint) -> Result<CheckpointHistory, CheckpointStoreError> {
        let mut history = self.load(&checkpoint.session_id)?;
        history.push(checkpoint);
        self.save(&history)?;
        Ok(history)
    }
}
