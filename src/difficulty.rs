//! Heuristic difficulty scoring for question/answer pairs.
//!
//! Scale: 1 = very easy, 2 = easy, 3 = medium, 4 = hard, 5 = very hard.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

const MAX_COMPLEXITY_POINTS: u8 = 2;

static TECHNICAL_INDICATORS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        // numbers, optionally with a decimal part
        Regex::new(r"\d+[.,]?\d*").expect("valid number pattern"),
        // acronyms
        Regex::new(r"\b[A-Z]{2,}\b").expect("valid acronym pattern"),
        // CamelCase terms
        Regex::new(r"\b[A-Z][a-z]+(?:[A-Z][a-z]+)+\b").expect("valid camel case pattern"),
    ]
});

/// Score a card from answer length and the presence of technical-looking tokens.
pub fn estimate_difficulty(question: &str, answer: &str) -> u8 {
    let length_points = match answer.split_whitespace().count() {
        0..=4 => 1,
        5..=14 => 2,
        _ => 3,
    };

    let complexity_points = TECHNICAL_INDICATORS
        .iter()
        .filter(|pattern| pattern.is_match(question) || pattern.is_match(answer))
        .count()
        .min(MAX_COMPLEXITY_POINTS as usize) as u8;

    (length_points + complexity_points).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

pub fn is_valid_difficulty(value: i64) -> bool {
    (MIN_DIFFICULTY as i64..=MAX_DIFFICULTY as i64).contains(&value)
}

/// Keep an externally supplied difficulty when it is an integer in range,
/// otherwise fall back to the estimate.
pub fn validate_difficulty(value: Option<&Value>, question: &str, answer: &str) -> u8 {
    match value.and_then(Value::as_i64) {
        Some(d) if is_valid_difficulty(d) => d as u8,
        _ => estimate_difficulty(question, answer),
    }
}
