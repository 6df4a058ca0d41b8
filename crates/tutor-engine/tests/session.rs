mod common;

use std::sync::Arc;

use common::{passages, ScriptedGenerator, StaticProvider};
use tutor_core::instructions::{SYSTEM_HINT, SYSTEM_NORMAL};
use tutor_core::{ConversationTurn, ResponseMode, Role, TRUNCATION_MARKER};
use tutor_engine::session::HISTORY_WINDOW;
use tutor_engine::QaSession;

fn session(provider: StaticProvider) -> (QaSession, Arc<ScriptedGenerator>) {
    let generator = Arc::new(ScriptedGenerator::new());
    (QaSession::new(Arc::new(provider), generator.clone()), generator)
}

#[tokio::test]
async fn answer_appends_user_then_assistant() {
    let (session, generator) = session(StaticProvider::with(passages()));
    generator.push_reply("Use a for loop.");

    let result = session.answer("How do I repeat something?", true).await.unwrap();

    assert_eq!(result.response, "Use a for loop.");
    assert_eq!(result.mode, ResponseMode::Normal);
    assert!(result.context_used);
    assert_eq!(
        session.history(),
        vec![
            ConversationTurn::user("How do I repeat something?"),
            ConversationTurn::assistant("Use a for loop."),
        ]
    );
}

#[tokio::test]
async fn answer_cites_top_three_previews() {
    let (session, _generator) = session(StaticProvider::with(passages()));
    let result = session.answer("loops?", true).await.unwrap();

    let docs = &result.retrieved_documents;
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[0].source, "week1/loops.md");
    assert_eq!(docs[0].content, "A for loop repeats over an iterable.");
    assert!(docs[1].content.ends_with(TRUNCATION_MARKER));
    assert_eq!(docs[1].content.chars().count(), 200 + TRUNCATION_MARKER.len());
    assert_eq!(docs[2].score, Some(0.72));
}

#[tokio::test]
async fn answer_prompt_carries_reference_materials_and_mode_instruction() {
    let (session, generator) = session(StaticProvider::with(passages()));
    session.answer("What does range do?", true).await.unwrap();

    let call = generator.last_call();
    assert_eq!(call[0], ConversationTurn::system(SYSTEM_NORMAL));
    let user = &call[1].content;
    assert!(user.starts_with("reference materials:\n[Document 1 - week1/loops.md]"));
    assert!(user.contains("[Document 4 - week2/while.md]"));
    assert!(user.ends_with("\n\nquestion: What does range do?"));

    session.set_mode(ResponseMode::Hint);
    let result = session.answer("again", true).await.unwrap();
    assert_eq!(result.mode, ResponseMode::Hint);
    assert_eq!(generator.last_call()[0], ConversationTurn::system(SYSTEM_HINT));
}

#[tokio::test]
async fn empty_retrieval_is_not_an_error() {
    let (session, generator) = session(StaticProvider::empty());
    let result = session.answer("anything indexed?", true).await.unwrap();

    assert!(result.context_used);
    assert!(result.retrieved_documents.is_empty());
    assert_eq!(generator.last_call()[1].content, "anything indexed?");
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn answer_without_context_skips_retrieval() {
    let (session, generator) = session(StaticProvider::failing());
    let result = session.answer("plain question", false).await.unwrap();

    assert!(!result.context_used);
    assert!(result.retrieved_documents.is_empty());
    assert_eq!(generator.last_call()[1].content, "plain question");
}

#[tokio::test]
async fn failed_generation_leaves_history_untouched() {
    let (session, generator) = session(StaticProvider::with(passages()));
    session.answer("first", true).await.unwrap();

    generator.push_failure();
    assert!(session.answer("second", true).await.is_err());
    assert_eq!(session.history().len(), 2);

    generator.push_failure();
    assert!(session.answer_with_history("third").await.is_err());
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn failed_retrieval_propagates_before_generation() {
    let (session, generator) = session(StaticProvider::failing());
    assert!(session.answer("q", true).await.is_err());
    assert_eq!(generator.call_count(), 0);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn history_window_caps_outbound_turns() {
    let (session, generator) = session(StaticProvider::empty());
    for i in 0..8 {
        session.answer(&format!("question {i}"), false).await.unwrap();
    }
    assert_eq!(session.history().len(), 16);

    let result = session.answer_with_history("latest").await.unwrap();
    let call = generator.last_call();

    assert_eq!(call.len(), 1 + HISTORY_WINDOW + 1);
    assert_eq!(call[0].role, Role::System);
    // The window is the tail: question 3 onwards.
    assert_eq!(call[1], ConversationTurn::user("question 3"));
    assert_eq!(call[2], ConversationTurn::assistant("reply 4"));
    assert_eq!(call[HISTORY_WINDOW], ConversationTurn::assistant("reply 8"));
    assert_eq!(call[HISTORY_WINDOW + 1], ConversationTurn::user("latest"));
    assert_eq!(result.history_length, 18);
    assert!(!result.context_used);
}

#[tokio::test]
async fn short_history_is_sent_whole() {
    let (session, generator) = session(StaticProvider::with(passages()));
    session.answer("one", false).await.unwrap();

    let result = session.answer_with_history("two").await.unwrap();
    let call = generator.last_call();

    assert_eq!(call.len(), 4);
    assert_eq!(call[1], ConversationTurn::user("one"));
    assert!(call[3].content.starts_with("reference materials:\n"));
    assert!(result.context_used);
    // History stores the bare query, not the prefixed prompt.
    assert_eq!(session.history()[2], ConversationTurn::user("two"));
}

#[tokio::test]
async fn clear_history_empties_it() {
    let (session, _generator) = session(StaticProvider::empty());
    session.answer("q", false).await.unwrap();
    session.clear_history();
    assert!(session.history().is_empty());
}
