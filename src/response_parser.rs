//! Permissive extraction of flashcard arrays from free-form model output.
//!
//! The parser runs an ordered list of strategies and takes the first one
//! that yields a well-formed card array.

use regex::Regex;
use tracing::debug;

use crate::models::GeneratedCardDraft;

/// One way of pulling a card array out of a model response.
pub trait ParseStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn attempt(&self, response: &str) -> Option<Vec<GeneratedCardDraft>>;
}

fn parse_card_array(candidate: &str) -> Option<Vec<GeneratedCardDraft>> {
    serde_json::from_str::<Vec<GeneratedCardDraft>>(candidate).ok()
}

/// The whole response is already the JSON array.
pub struct DirectJson;

impl ParseStrategy for DirectJson {
    fn name(&self) -> &'static str {
        "direct_json"
    }

    fn attempt(&self, response: &str) -> Option<Vec<GeneratedCardDraft>> {
        parse_card_array(response)
    }
}

/// The array sits in the first capture group of a regex match.
pub struct RegexCapture {
    name: &'static str,
    pattern: Regex,
}

impl RegexCapture {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("built-in response pattern must compile"),
        }
    }

    /// ```json fenced block
    pub fn fenced_json() -> Self {
        Self::new("fenced_json", r"(?s)```json\s*(\[.*?\])\s*```")
    }

    /// Fenced block without a language tag
    pub fn fenced_block() -> Self {
        Self::new("fenced_block", r"(?s)```\s*(\[.*?\])\s*```")
    }

    /// Bracketed array of objects anywhere in the text
    pub fn bare_array() -> Self {
        Self::new("bare_array", r"(?s)(\[\s*\{.*?\}\s*\])")
    }
}

impl ParseStrategy for RegexCapture {
    fn name(&self) -> &'static str {
        self.name
    }

    fn attempt(&self, response: &str) -> Option<Vec<GeneratedCardDraft>> {
        let captured = self.pattern.captures(response)?.get(1)?;
        parse_card_array(captured.as_str())
    }
}

pub struct ResponseParser {
    strategies: Vec<Box<dyn ParseStrategy>>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(vec![
            Box::new(DirectJson),
            Box::new(RegexCapture::fenced_json()),
            Box::new(RegexCapture::fenced_block()),
            Box::new(RegexCapture::bare_array()),
        ])
    }
}

impl ResponseParser {
    pub fn new(strategies: Vec<Box<dyn ParseStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run strategies in order; first success wins.
    pub fn parse(&self, response: &str) -> Option<Vec<GeneratedCardDraft>> {
        for strategy in &self.strategies {
            if let Some(cards) = strategy.attempt(response) {
                debug!(
                    strategy = strategy.name(),
                    card_count = cards.len(),
                    "Parsed flashcards from model response"
                );
                return Some(cards);
            }
            debug!(strategy = strategy.name(), "Parse strategy did not match");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARRAY: &str = r#"[{"question": "Capital of France?", "answer": "Paris", "difficulty": 1}]"#;

    #[test]
    fn test_direct_json() {
        let cards = ResponseParser::default().parse(ARRAY).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].question, "Capital of France?");
        assert_eq!(cards[0].difficulty, Some(serde_json::json!(1)));
    }

    #[test]
    fn test_direct_json_tolerates_surrounding_whitespace() {
        let padded = format!("\n  {}  \n", ARRAY);
        assert!(DirectJson.attempt(&padded).is_some());
    }

    #[test]
    fn test_fenced_json_block() {
        let response = format!("Here are your cards:\n```json\n{}\n```\nEnjoy!", ARRAY);
        assert!(DirectJson.attempt(&response).is_none());
        assert!(RegexCapture::fenced_json().attempt(&response).is_some());
        assert_eq!(ResponseParser::default().parse(&response).unwrap().len(), 1);
    }

    #[test]
    fn test_generic_fenced_block() {
        let response = format!("```\n{}\n```", ARRAY);
        assert!(RegexCapture::fenced_json().attempt(&response).is_none());
        assert!(RegexCapture::fenced_block().attempt(&response).is_some());
    }

    #[test]
    fn test_bare_array_inside_prose() {
        let response = format!("Sure! {} Let me know if you need more.", ARRAY);
        let cards = RegexCapture::bare_array().attempt(&response).unwrap();
        assert_eq!(cards[0].answer, "Paris");
    }

    #[test]
    fn test_missing_difficulty_is_allowed() {
        let cards = ResponseParser::default()
            .parse(r#"[{"question": "Q?", "answer": "A"}]"#)
            .unwrap();
        assert!(cards[0].difficulty.is_none());
    }

    #[test]
    fn test_unparseable_capture_falls_through_to_next_strategy() {
        // The json fence holds something that is not a card array; the bare
        // array later in the text is fine.
        let response = format!("```json\n[1, 2,]\n```\nRetry: {}", ARRAY);
        let cards = ResponseParser::default().parse(&response).unwrap();
        assert_eq!(cards[0].answer, "Paris");
    }

    #[test]
    fn test_no_array_yields_none() {
        let parser = ResponseParser::default();
        assert!(parser.parse("I cannot help with that.").is_none());
        assert!(parser.parse(r#"{"question": "Q?", "answer": "A"}"#).is_none());
        assert!(parser.parse("").is_none());
    }

    #[test]
    fn test_strategy_order() {
        assert_eq!(
            ResponseParser::default().strategy_names(),
            vec!["direct_json", "fenced_json", "fenced_block", "bare_array"]
        );
    }
}
