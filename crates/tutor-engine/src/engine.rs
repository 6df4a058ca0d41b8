use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use tutor_core::{AiSettings, ConversationTurn, Role};

use crate::error::{EngineError, Result};
use crate::prompt;

pub(crate) fn map_backend(provider: &str) -> Result<LLMBackend> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(EngineError::Config(format!("unknown provider: {other}"))),
    }
}

/// Produces text from a language model. One call, no retry; failures
/// propagate to the caller.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Multi-turn form: an ordered list of role-tagged turns.
    async fn generate(&self, turns: &[ConversationTurn]) -> Result<String>;

    /// Flat form: one instruction text plus an optional system instruction.
    async fn generate_text(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let mut turns = Vec::with_capacity(2);
        if let Some(system) = system {
            turns.push(ConversationTurn::system(system));
        }
        turns.push(ConversationTurn::user(prompt));
        self.generate(&turns).await
    }

    /// Flat form with reference materials. An empty `context` sends the
    /// query as is.
    async fn generate_with_context(
        &self,
        query: &str,
        context: &str,
        system: Option<&str>,
    ) -> Result<String> {
        let prompt = prompt::with_reference(query, context);
        self.generate_text(&prompt, system).await
    }

    /// Rough token estimate (about four characters per token). Budgeting only.
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

/// `ResponseGenerator` backed by the `llm` crate. A client is built per call
/// because the system instruction is part of the builder.
#[derive(Debug, Clone)]
pub struct LlmGenerator {
    provider: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmGenerator {
    pub fn from_settings(settings: &AiSettings) -> Result<Self> {
        map_backend(&settings.provider)?;
        if settings.model.is_empty() {
            return Err(EngineError::Config("no model configured".to_string()));
        }
        Ok(Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }
}

#[async_trait]
impl ResponseGenerator for LlmGenerator {
    async fn generate(&self, turns: &[ConversationTurn]) -> Result<String> {
        let backend = map_backend(&self.provider)?;

        let system: Vec<&str> = turns
            .iter()
            .filter(|t| t.role == Role::System)
            .map(|t| t.content.as_str())
            .collect();

        let mut builder = LLMBuilder::new()
            .backend(backend)
            .model(&self.model)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);

        if !system.is_empty() {
            builder = builder.system(system.join("\n\n"));
        }
        if !self.api_key.is_empty() {
            builder = builder.api_key(&self.api_key);
        }

        let llm = builder
            .build()
            .map_err(|e| EngineError::Config(format!("build LLM: {e}")))?;

        let messages: Vec<ChatMessage> = turns
            .iter()
            .filter_map(|t| match t.role {
                Role::System => None,
                Role::User => Some(ChatMessage::user().content(&t.content).build()),
                Role::Assistant => Some(ChatMessage::assistant().content(&t.content).build()),
            })
            .collect();

        tracing::debug!(
            provider = %self.provider,
            model = %self.model,
            messages = messages.len(),
            "sending chat request"
        );

        let response = llm.chat(&messages).await.map_err(|e| {
            tracing::warn!(provider = %self.provider, error = %e, "chat request failed");
            EngineError::Generation(format!("chat: {e}"))
        })?;

        match response.text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(EngineError::Generation("LLM returned empty text".to_string())),
            None => Err(EngineError::Generation("LLM returned no text".to_string())),
        }
    }
}
