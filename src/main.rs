use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod checkpoint;
mod cli;
mod command;
mod config;
mod domain;
mod executor;
mod extract;
mod mcp;
mod pipeline;
mod queue;
mod runtime;
mod workspace;

use cli::{Cli, Commands};
use runtime::{Runtime, RuntimeOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output and MCP
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = RuntimeOptions {
        workspace_root: cli.workspace_root,
        data_dir: cli.data_dir,
        host_url: cli.host_url,
    };

    // If --mcp flag is set, run as MCP server
    if cli.mcp {
        let runtime = Runtime::load(options)?;
        return mcp::run_mcp_server(runtime, cli.session).await;
    }

    // Otherwise, handle subcommands
    match cli.command {
        Some(Commands::Extract { file, json }) => {
            command::run_extract(file.as_deref(), json)?;
        }
        Some(Commands::Apply {
            file,
            dry_run,
            no_checkpoint,
            json,
        }) => {
            let runtime = Runtime::load(options)?;
            command::run_apply(
                &runtime,
                command::ApplyArgs {
                    session: cli.session,
                    file,
                    dry_run,
                    no_checkpoint,
                    json,
                },
            )
            .await?;
        }
        Some(Commands::Checkpoints { json }) => {
            let runtime = Runtime::load(options)?;
            command::run_checkpoints(&runtime, &cli.session, json)?;
        }
        Some(Commands::Restore { checkpoint_id }) => {
            let runtime = Runtime::load(options)?;
            command::run_restore(&runtime, &cli.session, checkpoint_id.as_deref()).await?;
        }
        None => {
            // No command specified, show help
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!(
                "Use 'agent-actions apply <FILE>' to apply a response or 'agent-actions --mcp' to start MCP server."
            );
        }
    }

    Ok(())
}
