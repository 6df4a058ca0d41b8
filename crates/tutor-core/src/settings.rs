use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{tutor_dir, CoreError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub embedding_provider: String,
    pub embedding_model: String,
    /// Falls back to `api_key` when empty.
    pub embedding_api_key: String,
    pub qdrant_url: String,
    pub collection: String,
    pub exercises_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_k: usize,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: String::new(),
            model: "gpt-4-turbo-preview".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            embedding_provider: "openai".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_api_key: String::new(),
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "exercises".to_string(),
            exercises_dir: tutor_dir().join("exercises"),
            chunk_size: 1000,
            chunk_overlap: 200,
            retrieval_k: 5,
        }
    }
}

impl AiSettings {
    pub fn embedding_key(&self) -> &str {
        if self.embedding_api_key.is_empty() {
            &self.api_key
        } else {
            &self.embedding_api_key
        }
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TUTOR_PROVIDER") {
            self.provider = v;
        }
        if let Some(v) = lookup("TUTOR_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.api_key = v;
        }
        if let Some(v) = lookup("MODEL_NAME") {
            self.model = v;
        }
        if let Some(v) = lookup("QDRANT_URL") {
            self.qdrant_url = v;
        }
        if let Some(v) = lookup("EXERCISES_DIR") {
            self.exercises_dir = PathBuf::from(v);
        }
        override_parsed(&lookup, "TEMPERATURE", &mut self.temperature);
        override_parsed(&lookup, "MAX_TOKENS", &mut self.max_tokens);
        override_parsed(&lookup, "CHUNK_SIZE", &mut self.chunk_size);
        override_parsed(&lookup, "CHUNK_OVERLAP", &mut self.chunk_overlap);
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable setting override"),
    }
}

fn settings_path() -> PathBuf {
    tutor_dir().join("settings.json")
}

/// Settings file (or defaults) with environment overrides applied.
pub fn read_settings() -> AiSettings {
    let path = settings_path();
    let mut settings = if path.exists() {
        fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    } else {
        AiSettings::default()
    };
    settings.apply_overrides(|key| std::env::var(key).ok());
    settings
}

pub fn write_settings(settings: &AiSettings) -> Result<(), CoreError> {
    let dir = tutor_dir();
    fs::create_dir_all(&dir).map_err(|e| CoreError::io(&dir, e))?;
    let json = serde_json::to_string_pretty(settings)?;
    let path = settings_path();
    fs::write(&path, json).map_err(|e| CoreError::io(&path, e))
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}
