//! Directory scanning for checkpoint snapshots.
//!
//! Uses `ignore::WalkBuilder` so `.gitignore` rules apply recursively,
//! plus an `.agentignore` file at any level and a fixed set of sensitive
//! patterns that are never captured.

use crate::checkpoint::FileSet;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Maximum file size to capture (1MB).
/// Larger files are left out of snapshots.
pub const MAX_READABLE_FILE_SIZE: u64 = 1024 * 1024;

/// Custom ignore file honoured next to `.gitignore`.
pub const IGNORE_FILENAME: &str = ".agentignore";

/// Patterns that are never captured, whatever the ignore files say.
const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".env",
    ".env.*",
    "*.pem",
    "*.key",
    "id_rsa*",
    "node_modules",
    "target",
];

/// Build a WalkBuilder with all ignore rules configured.
fn build_walker(root_path: &Path) -> WalkBuilder {
    let mut builder = WalkBuilder::new(root_path);

    // Enable standard gitignore processing (recursive)
    builder.standard_filters(true);
    builder.git_ignore(true);
    builder.git_global(true);
    builder.git_exclude(true);
    // Honour .gitignore even outside a git repository
    builder.require_git(false);

    // Don't follow symlinks
    builder.follow_links(false);

    builder.add_custom_ignore_filename(IGNORE_FILENAME);

    // `!` in an override glob means ignore
    let mut override_builder = OverrideBuilder::new(root_path);
    for pattern in DEFAULT_EXCLUDES {
        if let Err(e) = override_builder.add(&format!("!{}", pattern)) {
            warn!("Failed to add default exclude '{}': {}", pattern, e);
        }
    }
    match override_builder.build() {
        Ok(overrides) => {
            builder.overrides(overrides);
        }
        Err(e) => warn!("Failed to build default excludes: {}", e),
    }

    builder
}

/// Capture every readable text file under `root_path`.
///
/// Unreadable, binary and oversized files are skipped with a log line.
pub fn snapshot_directory(root_path: &Path) -> FileSet {
    let mut files = FileSet::new();

    debug!("Scanning workspace: {}", root_path.display());

    for entry in build_walker(root_path).build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Error walking directory: {}", e);
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        if let Some((relative_path, content)) = read_text_file(path, root_path) {
            files.insert(relative_path, content);
        }
    }

    debug!(
        "Captured {} files ({} bytes) from workspace",
        files.len(),
        files.total_bytes()
    );

    files
}

/// Read one file as `(relative_path, content)`.
///
/// Returns None if the file should be skipped (too large, binary, etc.)
fn read_text_file(path: &Path, root_path: &Path) -> Option<(String, String)> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            warn!("Failed to get metadata for {}: {}", path.display(), e);
            return None;
        }
    };

    if metadata.len() > MAX_READABLE_FILE_SIZE {
        debug!(
            "Skipping large file ({} bytes): {}",
            metadata.len(),
            path.display()
        );
        return None;
    }

    let content_bytes = match fs::read(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read file {}: {}", path.display(), e);
            return None;
        }
    };

    // Skip binary files
    let content = match String::from_utf8(content_bytes) {
        Ok(s) => s,
        Err(_) => {
            debug!("Skipping binary file: {}", path.display());
            return None;
        }
    };

    let relative_path = match path.strip_prefix(root_path) {
        Ok(p) => p.to_string_lossy().replace('\\', "/"),
        Err(_) => {
            warn!("Failed to get relative path for {}", path.display());
            return None;
        }
    };

    Some((relative_path, content))
}
