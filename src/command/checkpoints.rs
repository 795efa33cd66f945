use anyhow::{Context, Result};

use super::format_size;
use crate::checkpoint::CheckpointSummary;
use crate::runtime::Runtime;

pub fn run_checkpoints(runtime: &Runtime, session: &str, json: bool) -> Result<()> {
    let history = runtime.checkpoints.load(session)?;
    let summaries: Vec<CheckpointSummary> = history.iter().map(|c| c.summary()).collect();

    if json {
        let output =
            serde_json::to_string_pretty(&summaries).context("Failed to serialize checkpoints")?;
        println!("{}", output);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No checkpoints for session '{}'.", session);
        return Ok(());
    }

    println!("Checkpoints for session '{}' (newest last):\n", session);
    for summary in &summaries {
        println!(
            "  {}  {}  {} file(s), {}",
            summary.id,
            summary.created_at.format("%Y-%m-%d %H:%M:%S"),
            summary.file_count,
            format_size(summary.total_bytes)
        );
        if !summary.description.is_empty() {
            println!("      {}", summary.description);
        }
    }

    Ok(())
}
