//! Inline knowledge-source links: `[docs/setup.md](rag://abc123)`.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::RagSourceReference;

use super::grammar::RAG_SCHEME;

fn rag_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[([^\]\n]+)\]\(rag://([^)\s]+)\)")
            .expect("regex to match [label](rag://id) links")
    })
}

/// Every RAG link in `text`, left to right.
pub(super) fn find_references(text: &str) -> Vec<RagSourceReference> {
    if !text.contains(RAG_SCHEME) {
        return Vec::new();
    }

    rag_link_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let path = caps.get(1)?.as_str().trim();
            let id = caps.get(2)?.as_str();
            (!path.is_empty()).then(|| RagSourceReference {
                id: id.to_string(),
                path: path.to_string(),
            })
        })
        .collect()
}
