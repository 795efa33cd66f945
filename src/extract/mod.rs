//! Extraction of proposed actions from assistant output.
//!
//! The assistant embeds actions in free text as tagged markup (see
//! [`grammar`]). [`extract`] recovers them as a typed [`ActionBatch`]:
//!
//! - A single tokenizer pass finds tag boundaries generically
//! - Recognized action tags are dispatched to a per-kind parser
//! - Incomplete or malformed occurrences are dropped, never reported
//! - Inline `[label](rag://id)` links become RAG source references
//!
//! Output order is by kind first (file edits, shell commands, package
//! installs, nudges, workflows, deployments, RAG references), then by
//! position in the text.

pub mod grammar;
mod parse;
mod rag;
mod tokenizer;

use tracing::debug;

use crate::domain::ActionBatch;

/// Recover every complete proposed action from `text`.
///
/// Never fails: prose, stray markup and incomplete tags are skipped.
pub fn extract(text: &str) -> ActionBatch {
    let mut batch = ActionBatch::default();
    parse::collect_tagged(text, &mut batch);
    batch.rag_references = rag::find_references(text);

    debug!(
        "Extracted {} action(s): {} file edit(s), {} command(s), {} install(s)",
        batch.len(),
        batch.file_edits.len(),
        batch.shell_commands.len(),
        batch.package_installs.len()
    );

    batch
}
