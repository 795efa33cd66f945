use thiserror::Error;

/// Failure reported by a workspace collaborator.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("path escapes the workspace root: {0}")]
    OutsideWorkspace(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("command `{command}` exited with {}: {stderr}", exit_code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("no package manager configured for language `{0}`")]
    UnsupportedLanguage(String),

    #[error("host returned HTTP {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid host URL: {0}")]
    InvalidUrl(String),
}

impl WorkspaceError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            WorkspaceError::NotFound(path)
        } else {
            WorkspaceError::Io { path, source }
        }
    }
}
