use std::path::PathBuf;
use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tutor_core::ResponseMode;
use tutor_engine::{KnowledgeBase, Tutor, DEFAULT_CONTEXT_K};

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct QueryRequest {
    /// The student's question, verbatim. Hint progression is tracked per exact question text.
    query: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AnswerRequest {
    /// The student's question
    query: String,
    /// Retrieve reference materials from the exercise index first. Default: true.
    use_context: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SetModeRequest {
    /// "normal" for direct answers, "hint" for staged hints
    mode: ResponseMode,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct HintRequest {
    /// The student's question, verbatim. Asking the same text again raises the hint level (max 3).
    query: String,
    /// Error message the student is seeing, if any
    error_message: Option<String>,
    /// The code the question is about, if any
    code_context: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ResetHintsRequest {
    /// Question whose progression to restart. Omit to restart every question.
    query: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct EvaluateRequest {
    /// The question that was asked
    query: String,
    /// The answer or hint to score
    response: String,
    /// Mode the response was produced in. Default: the current mode.
    mode: Option<ResponseMode>,
    /// Reference context the response was based on
    context: Option<String>,
    /// Also ask for three concrete improvement suggestions. Default: false.
    suggest_improvements: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ExportReportRequest {
    /// Output file. Default: ~/.tutor/evaluation_report.json
    path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct IndexRequest {
    /// Directory to index. Default: the configured exercises directory.
    dir: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AddDocumentRequest {
    /// Document text
    content: String,
    /// Source name shown in citations, e.g. "week3/recursion.md"
    source: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SearchRequest {
    /// Search text
    query: String,
    /// Number of passages to return. Default: 5.
    k: Option<usize>,
    /// Only search chunks of this source, e.g. "week3/recursion.md"
    source: Option<String>,
}

// --- Server ---

#[derive(Clone)]
pub struct TutorServer {
    tutor: Arc<Tutor>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl TutorServer {
    pub fn new(tutor: Tutor) -> Self {
        Self {
            tutor: Arc::new(tutor),
            tool_router: Self::tool_router(),
        }
    }

    fn knowledge(&self) -> Result<&KnowledgeBase, CallToolResult> {
        self.tutor
            .knowledge()
            .ok_or_else(|| error_result("No knowledge base configured."))
    }

    #[tool(
        description = "Answer a student question according to the current mode: a direct answer with cited reference documents in normal mode, the next staged hint in hint mode. The exchange is added to the conversation history."
    )]
    async fn ask(&self, Parameters(req): Parameters<QueryRequest>) -> Result<CallToolResult, McpError> {
        if let Err(e) = require_text("query", &req.query) {
            return Ok(e);
        }
        match self.tutor.ask(&req.query).await {
            Ok(reply) => Ok(json_result(&reply)),
            Err(e) => Ok(error_result(format!("Failed to answer: {e}"))),
        }
    }

    #[tool(
        description = "Answer a question directly. Returns {response, mode, context_used, retrieved_documents: [{content, source, score?}]}. Documents are the top 3 matches, cut to 200 characters."
    )]
    async fn answer(&self, Parameters(req): Parameters<AnswerRequest>) -> Result<CallToolResult, McpError> {
        if let Err(e) = require_text("query", &req.query) {
            return Ok(e);
        }
        let use_context = req.use_context.unwrap_or(true);
        match self.tutor.session().answer(&req.query, use_context).await {
            Ok(result) => Ok(json_result(&result)),
            Err(e) => Ok(error_result(format!("Failed to answer: {e}"))),
        }
    }

    #[tool(
        description = "Answer a question taking the last 10 conversation turns into account. Returns {response, mode, context_used, history_length}."
    )]
    async fn answer_with_history(
        &self,
        Parameters(req): Parameters<QueryRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = require_text("query", &req.query) {
            return Ok(e);
        }
        match self.tutor.session().answer_with_history(&req.query).await {
            Ok(result) => Ok(json_result(&result)),
            Err(e) => Ok(error_result(format!("Failed to answer: {e}"))),
        }
    }

    #[tool(description = "Switch the response mode. Takes effect on the next question.")]
    fn set_mode(&self, Parameters(req): Parameters<SetModeRequest>) -> Result<CallToolResult, McpError> {
        self.tutor.set_mode(req.mode);
        Ok(text_result(format!("Mode set to {}.", req.mode)))
    }

    #[tool(description = "Get the current response mode (\"normal\" or \"hint\").")]
    fn get_mode(&self) -> Result<CallToolResult, McpError> {
        Ok(text_result(self.tutor.mode().to_string()))
    }

    #[tool(
        description = "Generate the next staged hint for a question without giving the answer away. Returns {hint, level, max_level, next_level_available, query}. Levels: 1 basic, 2 intermediate, 3 detailed."
    )]
    async fn generate_hint(&self, Parameters(req): Parameters<HintRequest>) -> Result<CallToolResult, McpError> {
        if let Err(e) = require_text("query", &req.query) {
            return Ok(e);
        }
        let result = self
            .tutor
            .hints()
            .generate_hint(
                &req.query,
                req.error_message.as_deref(),
                req.code_context.as_deref(),
            )
            .await;
        match result {
            Ok(hint) => Ok(json_result(&hint)),
            Err(e) => Ok(error_result(format!("Failed to generate hint: {e}"))),
        }
    }

    #[tool(description = "Restart hint progression for one question, or for all questions when query is omitted.")]
    fn reset_hints(&self, Parameters(req): Parameters<ResetHintsRequest>) -> Result<CallToolResult, McpError> {
        self.tutor.hints().reset_hint_level(req.query.as_deref());
        let text = match req.query {
            Some(q) => format!("Hint level reset for: {q}"),
            None => "All hint levels reset.".to_string(),
        };
        Ok(text_result(text))
    }

    #[tool(
        description = "Suggest up to five searchable keywords for a question, based on the top 3 reference documents. Does not change hint levels. Returns {keywords, query}."
    )]
    async fn get_hint_keywords(
        &self,
        Parameters(req): Parameters<QueryRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = require_text("query", &req.query) {
            return Ok(e);
        }
        match self.tutor.hints().get_hint_keywords(&req.query).await {
            Ok(result) => Ok(json_result(&result)),
            Err(e) => Ok(error_result(format!("Failed to get keywords: {e}"))),
        }
    }

    #[tool(description = "Get the conversation history as [{role, content}].")]
    fn get_history(&self) -> Result<CallToolResult, McpError> {
        Ok(json_result(&self.tutor.session().history()))
    }

    #[tool(description = "Clear the conversation history and restart every hint progression.")]
    fn clear_history(&self) -> Result<CallToolResult, McpError> {
        self.tutor.clear();
        Ok(text_result("Conversation cleared."))
    }

    #[tool(
        description = "Score a response 0-10 on accuracy, clarity, relevance, educational value and hint appropriateness. Returns {query, response, mode, scores, total_score, evaluation}, plus improvements when requested."
    )]
    async fn evaluate_response(
        &self,
        Parameters(req): Parameters<EvaluateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let evaluator = self.tutor.evaluator();
        let mode = req.mode.unwrap_or_else(|| self.tutor.mode());
        let context = req.context.unwrap_or_default();

        let record = match evaluator
            .evaluate(&req.query, &req.response, mode, &context)
            .await
        {
            Ok(record) => record,
            Err(e) => return Ok(error_result(format!("Failed to evaluate: {e}"))),
        };

        if !req.suggest_improvements.unwrap_or(false) {
            return Ok(json_result(&record));
        }
        match evaluator.suggest_improvements(&record).await {
            Ok(improvements) => Ok(json_result(&EvaluationWithImprovements {
                record: &record,
                improvements,
            })),
            Err(e) => Ok(error_result(format!("Failed to suggest improvements: {e}"))),
        }
    }

    #[tool(
        description = "Aggregate all evaluations so far: {total_evaluations, average_scores, total_average, mode_breakdown: {counts, average_scores}}."
    )]
    fn evaluation_summary(&self) -> Result<CallToolResult, McpError> {
        Ok(json_result(&self.tutor.evaluator().summarize()))
    }

    #[tool(description = "Write the evaluation report {summary, detailed_evaluations} as JSON.")]
    fn export_evaluation_report(
        &self,
        Parameters(req): Parameters<ExportReportRequest>,
    ) -> Result<CallToolResult, McpError> {
        let path = req
            .path
            .map(PathBuf::from)
            .unwrap_or_else(|| tutor_core::tutor_dir().join("evaluation_report.json"));
        match self.tutor.evaluator().export_report(&path) {
            Ok(()) => Ok(text_result(format!("Report written to {}", path.display()))),
            Err(e) => Ok(error_result(format!(
                "Failed to write report to {}: {e}",
                path.display()
            ))),
        }
    }

    #[tool(
        description = "Index exercise material (.pdf, .txt, .md, .py) from a directory into the knowledge base. Returns the number of chunks indexed."
    )]
    async fn index_documents(&self, Parameters(req): Parameters<IndexRequest>) -> Result<CallToolResult, McpError> {
        let knowledge = match self.knowledge() {
            Ok(k) => k,
            Err(e) => return Ok(e),
        };
        let dir = req.dir.map(PathBuf::from);
        match knowledge.index_documents(dir.as_deref()).await {
            Ok(0) => Ok(text_result(format!(
                "No documents found in {}. Supported extensions: {}",
                dir.as_deref().unwrap_or(knowledge.exercises_dir()).display(),
                tutor_core::corpus::SUPPORTED_EXTENSIONS.join(", ")
            ))),
            Ok(n) => Ok(text_result(format!("Indexed {n} chunks."))),
            Err(e) => Ok(error_result(format!("Failed to index documents: {e}"))),
        }
    }

    #[tool(description = "Add a single text to the knowledge base under the given source name.")]
    async fn add_document(&self, Parameters(req): Parameters<AddDocumentRequest>) -> Result<CallToolResult, McpError> {
        let knowledge = match self.knowledge() {
            Ok(k) => k,
            Err(e) => return Ok(e),
        };
        if let Err(e) = require_text("source", &req.source) {
            return Ok(e);
        }
        match knowledge.add_document(&req.content, &req.source).await {
            Ok(n) => Ok(text_result(format!("Added {n} chunks from {}.", req.source))),
            Err(e) => Ok(error_result(format!("Failed to add document: {e}"))),
        }
    }

    #[tool(
        description = "Search the knowledge base directly. Returns [{content, source, score}], best match first. Optionally restricted to one source."
    )]
    async fn search_documents(&self, Parameters(req): Parameters<SearchRequest>) -> Result<CallToolResult, McpError> {
        let knowledge = match self.knowledge() {
            Ok(k) => k,
            Err(e) => return Ok(e),
        };
        if let Err(e) = require_text("query", &req.query) {
            return Ok(e);
        }
        let k = req.k.unwrap_or(DEFAULT_CONTEXT_K);
        match knowledge.search(&req.query, k, req.source.as_deref()).await {
            Ok(passages) => Ok(json_result(&passages)),
            Err(e) => Ok(error_result(format!("Search failed: {e}"))),
        }
    }

    #[tool(description = "Delete everything from the knowledge base. Re-run index_documents to rebuild it.")]
    async fn clear_index(&self) -> Result<CallToolResult, McpError> {
        let knowledge = match self.knowledge() {
            Ok(k) => k,
            Err(e) => return Ok(e),
        };
        match knowledge.clear_index().await {
            Ok(()) => Ok(text_result("Knowledge base cleared.")),
            Err(e) => Ok(error_result(format!("Failed to clear index: {e}"))),
        }
    }
}

const INSTRUCTIONS: &str = r#"tutor is a teaching assistant for a programming exercise course. It answers student questions grounded in indexed exercise material, or gives staged hints that never hand out the solution.

## Modes
- **normal**: `ask` returns a direct answer plus the top reference documents it used.
- **hint**: `ask` returns the next hint for that question. Asking the exact same question again raises the level: 1 basic (concept to review), 2 intermediate (approach), 3 detailed (cause and fix outline). Level 3 is the ceiling.

Use `set_mode` to switch. The switch applies to the next question only; history is kept.

## Hints
Progression is keyed on the literal question text. A rephrased question starts again at level 1. Pass `error_message` and `code_context` to `generate_hint` when the student has them. `reset_hints` restarts one question or all of them. `get_hint_keywords` suggests search terms without using up a hint level.

## History
Every answered question adds one student turn and one assistant turn. `answer_with_history` replays the last 10 turns to the model. `clear_history` forgets the conversation and every hint level.

## Evaluation
`evaluate_response` scores a response on five criteria (0-10 each). `evaluation_summary` aggregates them per criterion and per mode. `export_evaluation_report` writes everything to a JSON file.

## Knowledge base
Exercise material lives in a vector index. `index_documents` loads a directory (.pdf, .txt, .md, .py), `add_document` adds one text, `search_documents` looks passages up (optionally within one source), `clear_index` empties it. An empty index is not an error: answers simply come without references."#;

#[tool_handler]
impl ServerHandler for TutorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// --- Helpers ---

#[derive(Serialize)]
struct EvaluationWithImprovements<'a> {
    #[serde(flatten)]
    record: &'a tutor_engine::EvaluationRecord,
    improvements: String,
}

fn json_result<T: Serialize>(value: &T) -> CallToolResult {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("Serialization error: {}", e));
    CallToolResult::success(vec![Content::text(json)])
}

fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

fn error_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(text.into())])
}

fn require_text(field: &str, value: &str) -> Result<(), CallToolResult> {
    if value.trim().is_empty() {
        Err(error_result(format!("'{field}' must not be empty.")))
    } else {
        Ok(())
    }
}

fn init_logging() {
    // stdout carries the MCP protocol, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Global first, then the working directory.
    let _ = dotenvy::from_path(tutor_core::tutor_dir().join(".env"));
    let _ = dotenvy::dotenv();
    init_logging();

    let settings = tutor_core::read_settings();
    if !tutor_core::ai_configured(&settings) {
        tracing::warn!(
            provider = %settings.provider,
            "no API key configured; set TUTOR_API_KEY or OPENAI_API_KEY"
        );
    }

    let tutor = Tutor::from_settings(&settings)
        .inspect_err(|e| tracing::error!(error = %e, "failed to set up tutor"))?;

    // Handle `tutor-mcp index [dir]` subcommand
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("index") {
        return run_index(&tutor, args.next().map(PathBuf::from)).await;
    }

    tracing::info!(model = %settings.model, collection = %settings.collection, "starting MCP server");
    let service = TutorServer::new(tutor)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "MCP server error"))?;
    service.waiting().await?;
    Ok(())
}

/// Index the exercises directory (or `dir`) and exit.
async fn run_index(tutor: &Tutor, dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let knowledge = tutor.knowledge().ok_or("no knowledge base configured")?;
    let count = knowledge.index_documents(dir.as_deref()).await?;
    let shown = dir.as_deref().unwrap_or(knowledge.exercises_dir());
    eprintln!("Indexed {} chunks from {}", count, shown.display());
    Ok(())
}
