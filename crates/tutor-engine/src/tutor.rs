use std::sync::Arc;

use serde::Serialize;

use tutor_core::{AiSettings, ResponseMode};

use crate::engine::{LlmGenerator, ResponseGenerator};
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::hint_generator::{HintGenerator, HintResult};
use crate::knowledge::KnowledgeBase;
use crate::retrieval::ContextProvider;
use crate::session::{AnswerResult, QaSession};

/// What `Tutor::ask` produced, depending on the mode at the time.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Reply {
    Answer(AnswerResult),
    Hint(HintResult),
}

/// One tutoring context: a session, a hint generator and an evaluator that
/// share the same collaborators.
pub struct Tutor {
    session: QaSession,
    hints: HintGenerator,
    evaluator: Evaluator,
    knowledge: Option<Arc<KnowledgeBase>>,
}

impl Tutor {
    pub fn new(provider: Arc<dyn ContextProvider>, generator: Arc<dyn ResponseGenerator>) -> Self {
        Self {
            session: QaSession::new(provider.clone(), generator.clone()),
            hints: HintGenerator::new(provider, generator.clone()),
            evaluator: Evaluator::new(generator),
            knowledge: None,
        }
    }

    /// Wire the `llm` generator and the Qdrant knowledge base from settings.
    pub fn from_settings(settings: &AiSettings) -> Result<Self> {
        let generator: Arc<dyn ResponseGenerator> = Arc::new(LlmGenerator::from_settings(settings)?);
        let knowledge = Arc::new(KnowledgeBase::connect(settings)?);
        let provider: Arc<dyn ContextProvider> = knowledge.clone();

        Ok(Self {
            session: QaSession::new(provider.clone(), generator.clone())
                .with_context_k(settings.retrieval_k),
            hints: HintGenerator::new(provider, generator.clone())
                .with_context_k(settings.retrieval_k),
            evaluator: Evaluator::new(generator),
            knowledge: Some(knowledge),
        })
    }

    pub fn session(&self) -> &QaSession {
        &self.session
    }

    pub fn hints(&self) -> &HintGenerator {
        &self.hints
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// The vector store, when this tutor was built from settings.
    pub fn knowledge(&self) -> Option<&KnowledgeBase> {
        self.knowledge.as_deref()
    }

    pub fn mode(&self) -> ResponseMode {
        self.session.mode()
    }

    pub fn set_mode(&self, mode: ResponseMode) {
        self.session.set_mode(mode);
    }

    /// Answer or hint, following the current mode. Hints are recorded in the
    /// session history like answers are.
    pub async fn ask(&self, query: &str) -> Result<Reply> {
        match self.session.mode() {
            ResponseMode::Normal => Ok(Reply::Answer(self.session.answer(query, true).await?)),
            ResponseMode::Hint => {
                let hint = self.hints.generate_hint(query, None, None).await?;
                self.session.record_exchange(query, &hint.hint);
                Ok(Reply::Hint(hint))
            }
        }
    }

    /// Forget the conversation and every hint progression.
    pub fn clear(&self) {
        self.session.clear_history();
        self.hints.reset_hint_level(None);
        tracing::info!("conversation cleared");
    }
}
