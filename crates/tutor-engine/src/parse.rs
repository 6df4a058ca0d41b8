//! Judge output parsing.
//!
//! Free-text heuristic: for each criterion, the first line that mentions it
//! (case-insensitive, underscores read as spaces) supplies the first run of
//! digits in that line. Anything unmatched scores 0.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::evaluator::{Criterion, Scores};

pub fn parse_scores(judge_text: &str) -> Scores {
    let lowered: Vec<String> = judge_text.lines().map(str::to_lowercase).collect();

    let mut scores = Scores::default();
    for criterion in Criterion::ALL {
        let label = criterion.label();
        let score = lowered
            .iter()
            .find(|line| line.contains(&label))
            .and_then(|line| first_number(line))
            .unwrap_or(0);
        scores.set(criterion, score);
    }
    scores
}

/// Unicode decimal digits, so full-width and other scripts' digits count.
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));
static DECIMAL_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d$").expect("valid regex"));

/// First run of decimal digits in `line`. A run too large for `u32` counts as
/// no number.
fn first_number(line: &str) -> Option<u32> {
    let run = DIGIT_RUN.find(line)?.as_str();
    run.chars()
        .try_fold(0u32, |acc, c| acc.checked_mul(10)?.checked_add(digit_value(c)))
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DECIMAL_DIGIT.is_match(c.encode_utf8(&mut buf))
}

/// Value of a decimal digit. Unicode lays decimal digits out in contiguous
/// runs of ten starting at zero, so the offset from the start of the block
/// gives the value.
fn digit_value(c: char) -> u32 {
    if let Some(d) = c.to_digit(10) {
        return d;
    }
    let mut start = c as u32;
    while let Some(prev) = start.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        start -= 1;
    }
    (c as u32 - start) % 10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_rubric_defaults_the_rest() {
        let scores = parse_scores("Accuracy: 8/10\nClarity: 7/10");
        assert_eq!(scores.accuracy, 8);
        assert_eq!(scores.clarity, 7);
        assert_eq!(scores.relevance, 0);
        assert_eq!(scores.educational_value, 0);
        assert_eq!(scores.hint_appropriateness, 0);
        assert_eq!(scores.total(), 15);
    }

    #[test]
    fn full_rubric_with_prose() {
        let text = "Here is my assessment.\n\
ACCURACY: 9/10\n\
Clarity - 6 out of 10\n\
Relevance: 10/10\n\
Educational value: 7/10\n\
Hint appropriateness: 5/10\n\
The answer is correct but a bit dense.";
        let scores = parse_scores(text);
        assert_eq!(
            [
                scores.accuracy,
                scores.clarity,
                scores.relevance,
                scores.educational_value,
                scores.hint_appropriateness
            ],
            [9, 6, 10, 7, 5]
        );
        assert_eq!(scores.total(), 37);
    }

    #[test]
    fn only_first_matching_line_counts() {
        // The first "clarity" line has no digits, so a later line is not consulted.
        let scores = parse_scores("Clarity is acceptable\nClarity: 9/10\nAccuracy: 4\nAccuracy: 10");
        assert_eq!(scores.clarity, 0);
        assert_eq!(scores.accuracy, 4);
    }

    #[test]
    fn full_width_digits_are_read_as_digits() {
        let scores = parse_scores("Accuracy: ８/10\nClarity: ７点 (out of 10)\nRelevance: １０/10");
        assert_eq!(scores.accuracy, 8);
        assert_eq!(scores.clarity, 7);
        assert_eq!(scores.relevance, 10);
    }

    #[test]
    fn other_script_digits_are_read_as_digits() {
        // Arabic-Indic seven, Devanagari five.
        let scores = parse_scores("Accuracy: \u{0667}/10\nClarity: \u{096B}");
        assert_eq!(scores.accuracy, 7);
        assert_eq!(scores.clarity, 5);
    }

    #[test]
    fn underscore_names_match_spaced_text() {
        let scores = parse_scores("educational_value: 9\nEducational Value: 3");
        assert_eq!(scores.educational_value, 3);
    }

    #[test]
    fn garbage_scores_zero() {
        assert_eq!(parse_scores(""), Scores::default());
        assert_eq!(parse_scores("no scores here at all"), Scores::default());
    }

    #[test]
    fn oversized_number_is_ignored() {
        let scores = parse_scores("Relevance: 99999999999999999999/10");
        assert_eq!(scores.relevance, 0);
    }
}
