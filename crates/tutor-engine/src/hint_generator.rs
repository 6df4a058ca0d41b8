use std::sync::Arc;

use serde::Serialize;

use tutor_core::instructions::{SYSTEM_KEYWORDS, SYSTEM_PEDAGOGICAL};
use tutor_core::{HintLevel, MAX_HINT_LEVEL};

use crate::engine::ResponseGenerator;
use crate::error::Result;
use crate::hints::HintTracker;
use crate::prompt;
use crate::retrieval::{ContextProvider, CITATION_K, DEFAULT_CONTEXT_K};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HintResult {
    pub hint: String,
    pub level: HintLevel,
    pub max_level: u8,
    pub next_level_available: bool,
    pub query: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KeywordsResult {
    pub keywords: String,
    pub query: String,
}

pub struct HintGenerator {
    provider: Arc<dyn ContextProvider>,
    generator: Arc<dyn ResponseGenerator>,
    tracker: HintTracker,
    context_k: usize,
}

impl HintGenerator {
    pub fn new(provider: Arc<dyn ContextProvider>, generator: Arc<dyn ResponseGenerator>) -> Self {
        Self {
            provider,
            generator,
            tracker: HintTracker::new(),
            context_k: DEFAULT_CONTEXT_K,
        }
    }

    pub fn with_context_k(mut self, k: usize) -> Self {
        self.context_k = k;
        self
    }

    pub fn tracker(&self) -> &HintTracker {
        &self.tracker
    }

    /// Produce the next hint for `query`. The level advances before any
    /// external call, so a failed generation still counts as a request.
    pub async fn generate_hint(
        &self,
        query: &str,
        error_message: Option<&str>,
        code_context: Option<&str>,
    ) -> Result<HintResult> {
        let level = self.tracker.advance(query);
        tracing::info!(level = level.value(), "hint level advanced");

        let knowledge = self.provider.get_context(query, self.context_k).await?;
        let hint_prompt = prompt::hint_prompt(query, level, &knowledge, error_message, code_context);
        tracing::debug!(prompt_chars = hint_prompt.len(), "assembled hint prompt");

        let hint = self
            .generator
            .generate_with_context(&hint_prompt, "", Some(SYSTEM_PEDAGOGICAL))
            .await?;

        Ok(HintResult {
            hint,
            level,
            max_level: MAX_HINT_LEVEL,
            next_level_available: !level.is_max(),
            query: query.to_string(),
        })
    }

    /// `Some(query)` restarts one question; `None` restarts all of them.
    pub fn reset_hint_level(&self, query: Option<&str>) {
        match query {
            Some(q) => self.tracker.reset(q),
            None => self.tracker.reset_all(),
        }
    }

    pub async fn get_hint_keywords(&self, query: &str) -> Result<KeywordsResult> {
        let passages = self.provider.retrieve(query, CITATION_K).await?;
        let keyword_prompt = prompt::keyword_prompt(query, &passages);
        let keywords = self
            .generator
            .generate_with_context(&keyword_prompt, "", Some(SYSTEM_KEYWORDS))
            .await?;
        Ok(KeywordsResult {
            keywords,
            query: query.to_string(),
        })
    }
}
