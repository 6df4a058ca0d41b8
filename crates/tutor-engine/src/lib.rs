pub mod engine;
pub mod error;
pub mod evaluator;
pub mod hint_generator;
pub mod hints;
pub mod knowledge;
mod parse;
pub mod prompt;
pub mod retrieval;
pub mod session;
pub mod tutor;

pub use engine::{LlmGenerator, ResponseGenerator};
pub use error::{EngineError, Result};
pub use evaluator::{
    Criterion, EvaluationRecord, EvaluationReport, EvaluationSummary, Evaluator, ModeBreakdown,
    Scores,
};
pub use hint_generator::{HintGenerator, HintResult, KeywordsResult};
pub use hints::HintTracker;
pub use knowledge::KnowledgeBase;
pub use parse::parse_scores;
pub use retrieval::{format_context, ContextProvider, DEFAULT_CONTEXT_K};
pub use session::{AnswerResult, HistoryAnswer, QaSession};
pub use tutor::{Reply, Tutor};
