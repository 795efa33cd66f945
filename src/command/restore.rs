use anyhow::{Context, Result};

use crate::checkpoint::CheckpointManager;
use crate::runtime::Runtime;

pub async fn run_restore(runtime: &Runtime, session: &str, checkpoint_id: Option<&str>) -> Result<()> {
    let history = runtime.checkpoints.load(session)?;
    let checkpoint = match checkpoint_id {
        Some(id) => history
            .get(id)
            .with_context(|| format!("No checkpoint {} in session '{}'", id, session))?,
        None => history
            .latest()
            .with_context(|| format!("No checkpoints for session '{}'", session))?,
    };

    println!(
        "Restoring checkpoint {} ({})",
        checkpoint.id, checkpoint.description
    );
    let report = CheckpointManager::rollback(runtime.workspace.as_ref(), checkpoint)
        .await
        .context("Failed to read current workspace state")?;

    for path in &report.written {
        println!("  restored {}", path);
    }
    for path in &report.deleted {
        println!("  removed  {}", path);
    }
    for failure in &report.failures {
        println!("  ❌ {}: {}", failure.path, failure.error);
    }

    if !report.is_complete() {
        anyhow::bail!("{} file(s) could not be restored", report.failures.len());
    }
    if report.written.is_empty() && report.deleted.is_empty() {
        println!("✅ Workspace already matches the checkpoint.");
    } else {
        println!("✅ Restored.");
    }
    Ok(())
}
