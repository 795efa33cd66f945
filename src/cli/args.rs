use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Extract assistant-proposed actions and apply them with checkpoints
#[derive(Parser)]
#[command(name = "agent-actions")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as MCP server over stdio
    #[arg(long)]
    pub mcp: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace root (auto-detects git root if absent)
    #[arg(short = 'w', long, global = true)]
    pub workspace_root: Option<String>,

    /// Session whose checkpoint history is used
    #[arg(short = 's', long, global = true, default_value = "default")]
    pub session: String,

    /// Directory for config and checkpoints. Defaults to ~/.agent-actions
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Apply against a remote workspace host instead of the local directory
    #[arg(long, global = true)]
    pub host_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the actions proposed in an assistant response
    Extract {
        /// Response file (stdin when absent or `-`)
        file: Option<PathBuf>,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// Extract, checkpoint and execute the actions in an assistant response
    Apply {
        /// Response file (stdin when absent or `-`)
        file: Option<PathBuf>,

        /// Run against an in-memory copy of the workspace and report what would change
        #[arg(long)]
        dry_run: bool,

        /// Skip the checkpoint before file edits
        #[arg(long)]
        no_checkpoint: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the session's checkpoints
    Checkpoints {
        #[arg(long)]
        json: bool,
    },
    /// Roll the workspace back to a checkpoint
    Restore {
        /// Checkpoint id (latest when absent)
        checkpoint_id: Option<String>,
    },
}
