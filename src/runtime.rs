//! Process-lifetime state shared by the CLI commands and the MCP server.
//!
//! Built once at startup from the global flags:
//! - `AppConfig` from the data directory and environment
//! - The workspace collaborator (remote host if a host URL is set,
//!   otherwise the local workspace root)
//! - The checkpoint store under the data directory

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::checkpoint::CheckpointStore;
use crate::cli::resolve_workspace_root;
use crate::config::{AppConfig, ConfigStore};
use crate::executor::BatchExecutor;
use crate::pipeline::ApplyPipeline;
use crate::workspace::{HttpWorkspace, LocalWorkspace, Workspace};

/// Global options that shape the runtime.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    pub workspace_root: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub host_url: Option<String>,
}

pub struct Runtime {
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub workspace_root: PathBuf,
    pub workspace: Arc<dyn Workspace>,
    pub checkpoints: CheckpointStore,
}

impl Runtime {
    pub fn load(options: RuntimeOptions) -> Result<Self> {
        let store = ConfigStore::new(options.data_dir)?;
        let mut config = store.load()?;
        if let Some(url) = options.host_url {
            config.host_url = Some(url);
        }

        let workspace_root = resolve_workspace_root(options.workspace_root.as_deref())?;
        let workspace: Arc<dyn Workspace> = match &config.host_url {
            Some(url) => {
                let host = HttpWorkspace::new(url, config.host_token.clone())
                    .context("Failed to create workspace host client")?;
                info!("Using remote workspace host: {}", host.base_url());
                Arc::new(host)
            }
            None => {
                let local = LocalWorkspace::new(&workspace_root)
                    .with_shell(config.shell.clone())
                    .with_package_managers(config.package_managers.clone());
                info!("Using local workspace: {}", local.root().display());
                Arc::new(local)
            }
        };

        let data_dir = store.data_dir().to_path_buf();
        Ok(Self {
            checkpoints: CheckpointStore::new(&data_dir),
            config,
            data_dir,
            workspace_root,
            workspace,
        })
    }

    /// An executor over the configured workspace.
    pub fn executor(&self) -> BatchExecutor {
        self.executor_for(self.workspace.clone())
    }

    /// An executor over `workspace`, with the configured limits.
    pub fn executor_for(&self, workspace: Arc<dyn Workspace>) -> BatchExecutor {
        BatchExecutor::new(workspace, self.config.executor_config())
    }

    /// A checkpointing pipeline for `session_id` over the configured workspace.
    pub fn pipeline(&self, session_id: &str) -> ApplyPipeline {
        ApplyPipeline::new(self.executor(), session_id).with_checkpoints(self.checkpoints.clone())
    }
}
