//! Context block assembly for grounded answers.

use crate::types::RetrievalHit;
use serde::Serialize;

/// Context handed to the answer model when retrieval produced nothing.
pub const NO_DOCUMENTS_CONTEXT: &str = "No documents loaded yet.";

/// Retrieved passages rendered for the answer prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RagContext {
    pub text: String,
    /// Titles of the documents the passages came from, in rank order
    pub citations: Vec<String>,
    /// False when the fallback context was used
    pub grounded: bool,
}

impl RagContext {
    pub fn fallback() -> Self {
        Self {
            text: NO_DOCUMENTS_CONTEXT.to_string(),
            citations: Vec::new(),
            grounded: false,
        }
    }
}

/// Render hits as `[title] text` blocks separated by blank lines.
///
/// Zero hits yields the explicit fallback context, never an empty string.
pub fn assemble_context(hits: &[RetrievalHit]) -> RagContext {
    if hits.is_empty() {
        return RagContext::fallback();
    }

    let text = hits
        .iter()
        .map(|h| format!("[{}] {}", h.title, h.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut citations: Vec<String> = Vec::with_capacity(hits.len());
    for hit in hits {
        if !citations.contains(&hit.title) {
            citations.push(hit.title.clone());
        }
    }

    RagContext {
        text,
        citations,
        grounded: true,
    }
}
