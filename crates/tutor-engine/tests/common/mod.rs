#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use tutor_core::{ConversationTurn, RetrievedPassage};
use tutor_engine::{ContextProvider, EngineError, ResponseGenerator, Result};

/// Generator that replays queued replies and records every request.
/// With the queue empty it answers "reply N". A queued `None` fails the call.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Option<String>>>,
    pub calls: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, text: &str) {
        self.replies.lock().push_back(Some(text.to_string()));
    }

    pub fn push_failure(&self) {
        self.replies.lock().push_back(None);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_call(&self) -> Vec<ConversationTurn> {
        self.calls.lock().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn generate(&self, turns: &[ConversationTurn]) -> Result<String> {
        let n = {
            let mut calls = self.calls.lock();
            calls.push(turns.to_vec());
            calls.len()
        };
        match self.replies.lock().pop_front() {
            Some(Some(text)) => Ok(text),
            Some(None) => Err(EngineError::Generation("scripted failure".to_string())),
            None => Ok(format!("reply {n}")),
        }
    }
}

/// Provider with a fixed passage list, truncated to `k`.
#[derive(Default)]
pub struct StaticProvider {
    pub passages: Vec<RetrievedPassage>,
    pub fail: bool,
}

impl StaticProvider {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(passages: Vec<RetrievedPassage>) -> Self {
        Self {
            passages,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            passages: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl ContextProvider for StaticProvider {
    async fn retrieve(&self, _query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        if self.fail {
            return Err(EngineError::Retrieval("store unreachable".to_string()));
        }
        Ok(self.passages.iter().take(k).cloned().collect())
    }
}

pub fn passages() -> Vec<RetrievedPassage> {
    vec![
        RetrievedPassage::new("A for loop repeats over an iterable.", "week1/loops.md").with_score(0.91),
        RetrievedPassage::new("x".repeat(300), "week1/long.txt").with_score(0.80),
        RetrievedPassage::new("range(n) yields 0..n-1.", "week1/range.py").with_score(0.72),
        RetrievedPassage::new("while loops check a condition.", "week2/while.md").with_score(0.51),
    ]
}
