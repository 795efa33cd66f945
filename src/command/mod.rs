mod apply;
mod checkpoints;
mod extract;
mod restore;

pub use apply::{run_apply, ApplyArgs};
pub use checkpoints::run_checkpoints;
pub use extract::run_extract;
pub use restore::run_restore;

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Read an assistant response from `file`, or stdin when absent or `-`.
fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read response from stdin")?;
            Ok(text)
        }
    }
}

/// Human-readable byte count.
fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} bytes", bytes)
    }
}
