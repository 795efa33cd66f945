use std::time::Duration;
use thiserror::Error;

use crate::workspace::WorkspaceError;

/// Why a single queued action did not complete.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Collaborator(#[from] WorkspaceError),

    #[error("timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("cancelled before completion")]
    Cancelled,

    #[error("old content not found in {0}")]
    OldContentNotFound(String),

    #[error("{change} of {file} carries no {field}")]
    MissingContent {
        file: String,
        change: &'static str,
        field: &'static str,
    },
}

/// Message recorded on a failed action, never empty.
pub fn error_message(error: &ActionError) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        "Unknown error".to_string()
    } else {
        message
    }
}
