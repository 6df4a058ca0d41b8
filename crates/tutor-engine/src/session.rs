use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use tutor_core::instructions::{SYSTEM_HINT, SYSTEM_NORMAL};
use tutor_core::{ConversationTurn, PassagePreview, ResponseMode};

use crate::engine::ResponseGenerator;
use crate::error::Result;
use crate::prompt;
use crate::retrieval::{ContextProvider, CITATION_K, DEFAULT_CONTEXT_K};

/// Prior turns replayed to the model by `answer_with_history`.
pub const HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnswerResult {
    pub response: String,
    pub mode: ResponseMode,
    pub context_used: bool,
    pub retrieved_documents: Vec<PassagePreview>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryAnswer {
    pub response: String,
    pub mode: ResponseMode,
    pub context_used: bool,
    pub history_length: usize,
}

pub fn system_instruction(mode: ResponseMode) -> &'static str {
    match mode {
        ResponseMode::Normal => SYSTEM_NORMAL,
        ResponseMode::Hint => SYSTEM_HINT,
    }
}

/// Question answering over retrieved context, with a running conversation.
///
/// Mode and history are guarded separately and neither lock is held while
/// waiting on a collaborator. History only grows by a full user/assistant
/// pair, after the generator has answered.
pub struct QaSession {
    provider: Arc<dyn ContextProvider>,
    generator: Arc<dyn ResponseGenerator>,
    context_k: usize,
    mode: Mutex<ResponseMode>,
    history: Mutex<Vec<ConversationTurn>>,
}

impl QaSession {
    pub fn new(provider: Arc<dyn ContextProvider>, generator: Arc<dyn ResponseGenerator>) -> Self {
        Self {
            provider,
            generator,
            context_k: DEFAULT_CONTEXT_K,
            mode: Mutex::new(ResponseMode::default()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Passages folded into the prompt context.
    pub fn with_context_k(mut self, k: usize) -> Self {
        self.context_k = k;
        self
    }

    pub fn set_mode(&self, mode: ResponseMode) {
        let mut current = self.mode.lock();
        let previous = *current;
        if previous != mode {
            tracing::info!(from = %previous, to = %mode, "response mode changed");
        }
        *current = mode;
    }

    pub fn mode(&self) -> ResponseMode {
        *self.mode.lock()
    }

    pub async fn answer(&self, query: &str, use_context: bool) -> Result<AnswerResult> {
        let mode = self.mode();

        let (context, retrieved_documents) = if use_context {
            let context = self.provider.get_context(query, self.context_k).await?;
            let passages = self.provider.retrieve(query, CITATION_K).await?;
            (context, passages.iter().map(|p| p.preview()).collect())
        } else {
            (String::new(), Vec::new())
        };

        tracing::debug!(%mode, context_chars = context.len(), "answering");
        let response = self
            .generator
            .generate_with_context(query, &context, Some(system_instruction(mode)))
            .await?;

        self.record_exchange(query, &response);

        Ok(AnswerResult {
            response,
            mode,
            context_used: use_context,
            retrieved_documents,
        })
    }

    pub async fn answer_with_history(&self, query: &str) -> Result<HistoryAnswer> {
        let mode = self.mode();
        let context = self.provider.get_context(query, self.context_k).await?;

        let mut turns = vec![ConversationTurn::system(system_instruction(mode))];
        {
            let history = self.history.lock();
            let start = history.len().saturating_sub(HISTORY_WINDOW);
            turns.extend_from_slice(&history[start..]);
        }
        turns.push(ConversationTurn::user(prompt::with_reference(query, &context)));

        tracing::debug!(%mode, turns = turns.len(), "answering with history");
        let response = self.generator.generate(&turns).await?;

        let history_length = self.record_exchange(query, &response);

        Ok(HistoryAnswer {
            response,
            mode,
            context_used: !context.is_empty(),
            history_length,
        })
    }

    /// Append a user/assistant pair and return the new history length.
    /// The user turn holds the bare query, never the context-prefixed prompt.
    pub fn record_exchange(&self, query: &str, response: &str) -> usize {
        let mut history = self.history.lock();
        history.push(ConversationTurn::user(query));
        history.push(ConversationTurn::assistant(response));
        history.len()
    }

    pub fn history(&self) -> Vec<ConversationTurn> {
        self.history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }
}
