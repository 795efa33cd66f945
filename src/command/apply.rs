use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::read_input;
use crate::pipeline::{ApplyPipeline, ApplyReport, DryRunChanges};
use crate::queue::{create_shared_action_queue, ActionStatus};
use crate::runtime::Runtime;

pub struct ApplyArgs {
    pub session: String,
    pub file: Option<PathBuf>,
    pub dry_run: bool,
    pub no_checkpoint: bool,
    pub json: bool,
}

pub async fn run_apply(runtime: &Runtime, args: ApplyArgs) -> Result<()> {
    let text = read_input(args.file.as_deref())?;
    let cancel = cancel_on_ctrl_c();

    if args.dry_run {
        let dry = runtime
            .pipeline(&args.session)
            .dry_run(&text, &cancel)
            .await?;
        if args.json {
            let output = serde_json::to_string_pretty(&dry).context("Failed to serialize report")?;
            println!("{}", output);
        } else {
            print_report(&dry.report);
            print_dry_run(&dry.changes);
        }
        return Ok(());
    }

    let pipeline = if args.no_checkpoint {
        ApplyPipeline::new(runtime.executor(), &args.session)
    } else {
        runtime.pipeline(&args.session)
    };
    let queue = create_shared_action_queue();
    let report = pipeline.apply_text(&text, &queue, &cancel).await?;

    if args.json {
        let output = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", output);
    } else {
        print_report(&report);
    }

    if report.result.failed > 0 || report.result.cancelled > 0 {
        anyhow::bail!("Batch did not complete: {}", report.result.summary());
    }
    Ok(())
}

/// A token cancelled by the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling remaining actions");
            trigger.cancel();
        }
    });
    cancel
}

fn print_report(report: &ApplyReport) {
    let informational = report.batch.len() - report.enqueued.len();
    if report.batch.is_empty() {
        println!("No actions found.");
        return;
    }

    if let Some(id) = &report.checkpoint_id {
        println!("Checkpoint: {}", id);
    }

    // Ids were handed out in the batch's executable order
    let labels: HashMap<_, _> = report
        .enqueued
        .iter()
        .zip(report.batch.executable())
        .map(|(id, action)| (id.clone(), action.describe()))
        .collect();
    for outcome in &report.result.results {
        let label = labels
            .get(&outcome.id)
            .cloned()
            .unwrap_or_else(|| outcome.id.to_string());
        let marker = match outcome.status {
            ActionStatus::Completed => "✅",
            ActionStatus::Cancelled => "⏹️ ",
            _ => "❌",
        };
        match &outcome.error {
            Some(error) => println!("{} {}\n     {}", marker, label, error),
            None => println!("{} {}", marker, label),
        }
    }

    if informational > 0 {
        println!("\nSuggestions (not executed):");
        for action in report.batch.actions() {
            if !action.kind().is_executable() {
                println!("  - {}", action.describe());
            }
        }
    }

    println!("\n{}", report.result.summary());
}

fn print_dry_run(changes: &DryRunChanges) {
    println!("\nDry run, nothing was changed. The batch would:");
    for path in &changes.writes {
        println!("  write   {}", path);
    }
    for path in &changes.deletes {
        println!("  delete  {}", path);
    }
    for cmd in &changes.commands {
        println!("  run     {}", cmd.command);
    }
    for install in &changes.installs {
        println!("  install {} ({})", install.packages.join(" "), install.language);
    }
}
