use tutor_core::instructions::{
    EVALUATION_RUBRIC, HINT_CLOSING, HINT_LEVEL_BASIC, HINT_LEVEL_DETAILED,
    HINT_LEVEL_INTERMEDIATE,
};
use tutor_core::{excerpt, truncate_chars, HintLevel, ResponseMode, RetrievedPassage, MAX_HINT_LEVEL};

use crate::evaluator::Scores;

/// Character budget for the knowledge excerpt embedded in a hint prompt.
pub const KNOWLEDGE_EXCERPT_CHARS: usize = 500;

/// Character budget per passage in the keyword prompt.
pub const KEYWORD_PASSAGE_CHARS: usize = 200;

/// Character budget for the context shown to the judge.
pub const JUDGE_CONTEXT_CHARS: usize = 500;

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Prefix a query with retrieved reference materials. An empty context
/// leaves the query untouched.
pub fn with_reference(query: &str, context: &str) -> String {
    if context.is_empty() {
        query.to_string()
    } else {
        format!("reference materials:\n{context}\n\nquestion: {query}")
    }
}

pub fn level_instruction(level: HintLevel) -> &'static str {
    match level {
        HintLevel::Basic => HINT_LEVEL_BASIC,
        HintLevel::Intermediate => HINT_LEVEL_INTERMEDIATE,
        HintLevel::Detailed => HINT_LEVEL_DETAILED,
    }
}

/// Assemble the user content for a staged hint. Section order is fixed:
/// question, level, level instruction, error, code, knowledge excerpt,
/// closing instruction. Absent or empty optional inputs drop their section.
pub fn hint_prompt(
    query: &str,
    level: HintLevel,
    knowledge_context: &str,
    error_message: Option<&str>,
    code_context: Option<&str>,
) -> String {
    let mut parts = vec![
        format!("Student question: {query}"),
        format!("\nHint level: {}/{}", level.value(), MAX_HINT_LEVEL),
        level_instruction(level).to_string(),
    ];

    if let Some(error) = present(error_message) {
        parts.push(format!("\nError message:\n{error}"));
    }
    if let Some(code) = present(code_context) {
        parts.push(format!("\nCode context:\n{code}"));
    }
    if !knowledge_context.is_empty() {
        parts.push(format!(
            "\nReference overview:\n{}",
            excerpt(knowledge_context, KNOWLEDGE_EXCERPT_CHARS)
        ));
    }

    parts.push(format!("\n{HINT_CLOSING}"));
    parts.join("\n")
}

pub fn keyword_prompt(query: &str, passages: &[RetrievedPassage]) -> String {
    let materials = passages
        .iter()
        .map(|p| truncate_chars(&p.content, KEYWORD_PASSAGE_CHARS).0)
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "List up to five important keywords or concepts related to the question below.\n\n\
Question: {query}\n\n\
Reference materials:\n{materials}\n\n\
Choose terms the student can easily search for on their own.\n"
    )
}

pub fn judge_prompt(query: &str, response: &str, mode: ResponseMode, context: &str) -> String {
    let context = if context.is_empty() {
        "none".to_string()
    } else {
        excerpt(context, JUDGE_CONTEXT_CHARS)
    };

    format!(
        "Evaluate the following question and answer.\n\n\
Question: {query}\n\n\
Answer: {response}\n\n\
Mode: {mode}\n\n\
Context consulted:\n{context}\n\n\
{EVALUATION_RUBRIC}\n"
    )
}

pub fn improvement_prompt(scores: &Scores) -> String {
    format!(
        "Based on the evaluation below, give three concrete suggestions for improving the \
quality of the answer.\n\n\
Scores:\n\
- Accuracy: {}/10\n\
- Clarity: {}/10\n\
- Relevance: {}/10\n\
- Educational value: {}/10\n\
- Hint appropriateness: {}/10\n\n\
Focus on the lowest scores and make every suggestion actionable.\n",
        scores.accuracy,
        scores.clarity,
        scores.relevance,
        scores.educational_value,
        scores.hint_appropriateness,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::TRUNCATION_MARKER;

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("missing {needle:?} in {haystack}"))
    }

    #[test]
    fn hint_prompt_sections_in_order() {
        let prompt = hint_prompt(
            "Why does my loop never end?",
            HintLevel::Intermediate,
            "[Document 1 - loops.md]\nwhile loops need an exit condition",
            Some("TimeoutError"),
            Some("while True:\n    pass"),
        );

        let order = [
            "Student question: Why does my loop never end?",
            "Hint level: 2/3",
            HINT_LEVEL_INTERMEDIATE,
            "Error message:\nTimeoutError",
            "Code context:\nwhile True:",
            "Reference overview:\n[Document 1 - loops.md]",
            HINT_CLOSING,
        ];
        let positions: Vec<usize> = order.iter().map(|s| position(&prompt, s)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }

    #[test]
    fn hint_prompt_omits_absent_sections() {
        let prompt = hint_prompt("q", HintLevel::Basic, "", None, Some(""));
        assert!(!prompt.contains("Error message"));
        assert!(!prompt.contains("Code context"));
        assert!(!prompt.contains("Reference overview"));
        assert!(prompt.contains(HINT_LEVEL_BASIC));
        assert!(prompt.ends_with(HINT_CLOSING));
    }

    #[test]
    fn whitespace_only_inputs_keep_their_section() {
        let prompt = hint_prompt("q", HintLevel::Basic, "", Some(" "), Some("\t"));
        assert!(prompt.contains("\nError message:\n \n"));
        assert!(prompt.contains("\nCode context:\n\t\n"));
    }

    #[test]
    fn knowledge_excerpt_is_truncated_and_marked() {
        let knowledge = "k".repeat(KNOWLEDGE_EXCERPT_CHARS + 50);
        let prompt = hint_prompt("q", HintLevel::Detailed, &knowledge, None, None);
        let expected = format!("{}{}", "k".repeat(KNOWLEDGE_EXCERPT_CHARS), TRUNCATION_MARKER);
        assert!(prompt.contains(&expected));
        assert!(!prompt.contains(&"k".repeat(KNOWLEDGE_EXCERPT_CHARS + 1)));

        let short = hint_prompt("q", HintLevel::Detailed, "brief", None, None);
        assert!(short.contains("Reference overview:\nbrief\n"));
    }

    #[test]
    fn hint_prompt_is_deterministic() {
        let a = hint_prompt("q", HintLevel::Basic, "ctx", Some("e"), None);
        let b = hint_prompt("q", HintLevel::Basic, "ctx", Some("e"), None);
        assert_eq!(a, b);
    }

    #[test]
    fn each_level_has_its_own_template() {
        let levels = [HintLevel::Basic, HintLevel::Intermediate, HintLevel::Detailed];
        let texts: Vec<&str> = levels.iter().map(|l| level_instruction(*l)).collect();
        assert_ne!(texts[0], texts[1]);
        assert_ne!(texts[1], texts[2]);
    }

    #[test]
    fn reference_prefix_only_with_context() {
        assert_eq!(with_reference("q", ""), "q");
        assert_eq!(
            with_reference("q", "ctx"),
            "reference materials:\nctx\n\nquestion: q"
        );
    }

    #[test]
    fn keyword_prompt_cuts_each_passage() {
        let passages = vec![
            RetrievedPassage::new("a".repeat(300), "one.md"),
            RetrievedPassage::new("list comprehension", "two.md"),
        ];
        let prompt = keyword_prompt("what is a comprehension?", &passages);
        assert!(prompt.contains(&format!("{} list comprehension", "a".repeat(200))));
        assert!(!prompt.contains(&"a".repeat(201)));
        assert!(prompt.contains("Question: what is a comprehension?"));
    }

    #[test]
    fn judge_prompt_marks_missing_context() {
        let prompt = judge_prompt("q", "r", ResponseMode::Hint, "");
        assert!(prompt.contains("Context consulted:\nnone\n"));
        assert!(prompt.contains("Mode: hint"));
        assert!(prompt.contains(EVALUATION_RUBRIC));
    }
}
