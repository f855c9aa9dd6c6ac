use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Whole persisted document: set id -> set
pub type FlashcardDb = HashMap<Uuid, FlashcardSet>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub difficulty: u8, // 1..=5
    #[serde(rename = "lastReviewed", default)]
    pub last_reviewed: Option<DateTime<Utc>>,
    #[serde(rename = "nextReview", default)]
    pub next_review: Option<DateTime<Utc>>,
    #[serde(rename = "reviewCount", default)]
    pub review_count: u32,
    /// Client-defined fields written through the single-card update endpoint
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Flashcard {
    /// Fresh card with review bookkeeping at its defaults
    pub fn new(question: String, answer: String, difficulty: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            question,
            answer,
            difficulty,
            last_reviewed: None,
            next_review: None,
            review_count: 0,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardSet {
    pub title: String,
    pub source: String,
    pub creation_date: DateTime<Utc>,
    pub flashcards: Vec<Flashcard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardSetSummary {
    pub id: Uuid,
    pub title: String,
    pub source: String,
    pub creation_date: DateTime<Utc>,
    pub count: usize,
}

/// A set as returned by the API, carrying its id alongside the contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardSetView {
    pub id: Uuid,
    #[serde(flatten)]
    pub set: FlashcardSet,
}

/// Card proposed by the model, before validation and identity assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedCardDraft {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub difficulty: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub flashcards: Vec<Flashcard>,
    pub source: CardSource,
}

impl GenerationOutcome {
    pub fn used_fallback(&self) -> bool {
        self.source == CardSource::Fallback
    }
}

/// Card as accepted by a full set replacement; missing fields are filled in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub difficulty: Option<Value>,
    #[serde(rename = "lastReviewed", default)]
    pub last_reviewed: Option<DateTime<Utc>>,
    #[serde(rename = "nextReview", default)]
    pub next_review: Option<DateTime<Utc>>,
    #[serde(rename = "reviewCount", default)]
    pub review_count: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSetRequest {
    pub title: Option<String>,
    pub flashcards: Option<Vec<FlashcardInput>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub text: Option<String>,
    pub num_cards: Option<usize>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadParams {
    pub num_cards: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub set_id: Uuid,
    pub title: String,
    pub flashcards: Vec<Flashcard>,
    pub model_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSetResponse {
    pub set_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionCheckResult {
    pub message: String,
    pub raw_response: String,
    pub provider: String,
    pub model: String,
}
