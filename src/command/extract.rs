use anyhow::{Context, Result};
use std::path::Path;

use super::read_input;
use crate::domain::ActionKind;
use crate::extract::extract;

pub fn run_extract(file: Option<&Path>, json: bool) -> Result<()> {
    let text = read_input(file)?;
    let batch = extract(&text);

    if json {
        let output = serde_json::to_string_pretty(&batch).context("Failed to serialize actions")?;
        println!("{}", output);
        return Ok(());
    }

    if batch.is_empty() {
        println!("No actions found.");
        return Ok(());
    }

    println!("Found {} action(s):", batch.len());
    let mut current: Option<ActionKind> = None;
    for action in batch.actions() {
        let kind = action.kind();
        if current != Some(kind) {
            println!("\n  {}:", kind);
            current = Some(kind);
        }
        println!("    - {}", action.describe());
    }

    Ok(())
}
