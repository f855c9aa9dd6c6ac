use regex::Regex;
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::difficulty::{estimate_difficulty, validate_difficulty};
use crate::llm_service::LLMService;
use crate::models::{CardSource, Flashcard, GeneratedCardDraft, GenerationOutcome};

// Import logging macros
use crate::log_llm_operation;

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid sentence boundary pattern"));

/// Fragments this short (in characters) are not treated as sentences
const MIN_SENTENCE_CHARS: usize = 10;
/// A sentence needs more words than this to become a question
const MIN_SENTENCE_WORDS: usize = 5;
/// Question stems take half the sentence, never more than this many words
const MAX_STEM_WORDS: usize = 5;
const QUESTION_SUFFIX: &str = "...?";
const PLACEHOLDER_DIFFICULTY: u8 = 1;
const PLACEHOLDER_ANSWER: &str =
    "This is a default card, generated because the AI could not produce enough relevant cards.";

/// Turns text into exactly `n` flashcards, through the model when one is
/// configured and through local heuristics otherwise.
#[derive(Clone)]
pub struct FlashcardGenerator {
    llm_service: Option<LLMService>,
}

impl FlashcardGenerator {
    pub fn new(llm_service: Option<LLMService>) -> Self {
        Self { llm_service }
    }

    pub fn fallback_only() -> Self {
        Self { llm_service: None }
    }

    pub fn llm_service(&self) -> Option<&LLMService> {
        self.llm_service.as_ref()
    }

    pub async fn generate(&self, text: &str, num_cards: usize) -> GenerationOutcome {
        let Some(llm_service) = &self.llm_service else {
            info!(num_cards, "No LLM configured, using fallback flashcard generator");
            return fallback_outcome(text, num_cards);
        };

        log_llm_operation!(
            start,
            "generate_flashcards",
            provider = llm_service.provider_name(),
            card_count = num_cards
        );

        match llm_service.generate_flashcards(text, num_cards).await {
            Ok(drafts) => {
                let flashcards = finalize_drafts(drafts, text, num_cards);
                log_llm_operation!(
                    success,
                    "generate_flashcards",
                    provider = llm_service.provider_name(),
                    card_count = flashcards.len()
                );
                GenerationOutcome {
                    flashcards,
                    source: CardSource::Model,
                }
            }
            Err(e) => {
                log_llm_operation!(
                    error,
                    "generate_flashcards",
                    provider = llm_service.provider_name(),
                    error = e,
                    retry_count = 0
                );
                fallback_outcome(text, num_cards)
            }
        }
    }
}

fn fallback_outcome(text: &str, num_cards: usize) -> GenerationOutcome {
    GenerationOutcome {
        flashcards: generate_fallback_cards(text, num_cards),
        source: CardSource::Fallback,
    }
}

/// Validate model drafts and shape them into exactly `num_cards` cards.
pub fn finalize_drafts(drafts: Vec<GeneratedCardDraft>, text: &str, num_cards: usize) -> Vec<Flashcard> {
    let received = drafts.len();

    let mut flashcards: Vec<Flashcard> = drafts
        .into_iter()
        .filter(|draft| !draft.question.trim().is_empty() && !draft.answer.trim().is_empty())
        .take(num_cards)
        .map(|draft| {
            let difficulty = validate_difficulty(draft.difficulty.as_ref(), &draft.question, &draft.answer);
            Flashcard::new(draft.question, draft.answer, difficulty)
        })
        .collect();

    if flashcards.len() < num_cards {
        warn!(
            requested = num_cards,
            received,
            usable = flashcards.len(),
            "LLM returned too few usable flashcards, topping up from fallback"
        );
        let missing = num_cards - flashcards.len();
        flashcards.extend(
            generate_fallback_cards(text, num_cards)
                .into_iter()
                .skip(num_cards - missing),
        );
    }

    flashcards
}

/// Sentences usable as card material, in document order.
fn candidate_sentences(text: &str) -> Vec<&str> {
    SENTENCE_BOUNDARY
        .split(text)
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .filter(|s| s.split_whitespace().count() > MIN_SENTENCE_WORDS)
        .collect()
}

fn sentence_card(sentence: &str) -> Flashcard {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    let stem_len = (words.len() / 2).min(MAX_STEM_WORDS);
    let question = format!("{}{}", words[..stem_len].join(" "), QUESTION_SUFFIX);
    let difficulty = estimate_difficulty(&question, sentence);
    Flashcard::new(question, sentence.to_string(), difficulty)
}

fn placeholder_card(position: usize) -> Flashcard {
    Flashcard::new(
        format!("Question {} generated automatically", position),
        PLACEHOLDER_ANSWER.to_string(),
        PLACEHOLDER_DIFFICULTY,
    )
}

/// Build exactly `num_cards` cards from the text alone, no external calls.
pub fn generate_fallback_cards(text: &str, num_cards: usize) -> Vec<Flashcard> {
    let mut flashcards: Vec<Flashcard> = candidate_sentences(text)
        .into_iter()
        .take(num_cards)
        .map(sentence_card)
        .collect();

    while flashcards.len() < num_cards {
        flashcards.push(placeholder_card(flashcards.len() + 1));
    }

    flashcards
}
