pub mod corpus;
pub mod error;
pub mod instructions;
pub mod settings;

pub use error::CoreError;
pub use settings::{ai_configured, read_settings, write_settings, AiSettings};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Highest hint level a query can reach.
pub const MAX_HINT_LEVEL: u8 = 3;

/// Characters of a passage shown as a citation preview.
pub const PREVIEW_CHARS: usize = 200;

/// Marker appended to any excerpt that was cut short.
pub const TRUNCATION_MARKER: &str = "...";

// --- Conversation ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// --- Response mode ---

/// Session-wide switch between direct answers and staged hints.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
    schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Normal,
    Hint,
}

impl ResponseMode {
    pub const ALL: [ResponseMode; 2] = [ResponseMode::Normal, ResponseMode::Hint];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Normal => "normal",
            ResponseMode::Hint => "hint",
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(ResponseMode::Normal),
            "hint" => Ok(ResponseMode::Hint),
            other => Err(format!("unknown response mode: {other} (use normal or hint)")),
        }
    }
}

// --- Hint levels ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HintLevel {
    Basic = 1,
    Intermediate = 2,
    Detailed = 3,
}

impl HintLevel {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(HintLevel::Basic),
            2 => Some(HintLevel::Intermediate),
            3 => Some(HintLevel::Detailed),
            _ => None,
        }
    }

    /// The level that follows `previous`, clamped at `Detailed`.
    /// No previous level means the first request, which is `Basic`.
    pub fn after(previous: Option<HintLevel>) -> Self {
        match previous {
            None => HintLevel::Basic,
            Some(HintLevel::Basic) => HintLevel::Intermediate,
            Some(HintLevel::Intermediate) | Some(HintLevel::Detailed) => HintLevel::Detailed,
        }
    }

    pub fn is_max(self) -> bool {
        self.value() >= MAX_HINT_LEVEL
    }
}

impl Serialize for HintLevel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

impl<'de> Deserialize<'de> for HintLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        HintLevel::from_value(value)
            .ok_or_else(|| serde::de::Error::custom(format!("hint level out of range: {value}")))
    }
}

// --- Retrieval ---

/// A retrieved excerpt plus where it came from. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedPassage {
    pub content: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl RetrievedPassage {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// Citation view of this passage, cut to `PREVIEW_CHARS`.
    pub fn preview(&self) -> PassagePreview {
        PassagePreview {
            content: excerpt(&self.content, PREVIEW_CHARS),
            source: self.source.clone(),
            score: self.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassagePreview {
    pub content: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// One chunk of a loaded exercise file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub source: String,
    pub chunk: usize,
}

/// Cut `text` to at most `max` characters. Returns the excerpt and whether
/// anything was dropped. Counts chars, so multi-byte text is safe.
pub fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

/// Cut `text` to `max` characters, appending `TRUNCATION_MARKER` only when
/// something was dropped.
pub fn excerpt(text: &str, max: usize) -> String {
    let (head, truncated) = truncate_chars(text, max);
    let mut out = head.to_string();
    if truncated {
        out.push_str(TRUNCATION_MARKER);
    }
    out
}

// --- Storage ---

/// Resolve the per-user application directory (~/.tutor/).
pub fn tutor_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tutor")
}
