use async_trait::async_trait;
use tutor_core::RetrievedPassage;

use crate::error::Result;

/// Passages folded into a context string when the caller does not say.
pub const DEFAULT_CONTEXT_K: usize = 5;

/// Passages listed as citations next to an answer.
pub const CITATION_K: usize = 3;

/// Source of ranked passages for a query. An empty result is a normal
/// outcome, not an error.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Up to `k` passages, best match first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>>;

    /// The same passages as one prompt-ready string.
    async fn get_context(&self, query: &str, k: usize) -> Result<String> {
        let passages = self.retrieve(query, k).await?;
        Ok(format_context(&passages))
    }
}

/// `[Document i - source]` blocks in rank order, 1-indexed, separated by a
/// blank line. No passages gives an empty string.
pub fn format_context(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[Document {} - {}]\n{}", i + 1, p.source, p.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_numbered_in_rank_order() {
        let passages = vec![
            RetrievedPassage::new("  first body \n", "week1/intro.md"),
            RetrievedPassage::new("second body", "week2/loops.py").with_score(0.4),
        ];
        assert_eq!(
            format_context(&passages),
            "[Document 1 - week1/intro.md]\nfirst body\n\n[Document 2 - week2/loops.py]\nsecond body"
        );
    }

    #[test]
    fn no_passages_no_context() {
        assert_eq!(format_context(&[]), "");
    }
}
