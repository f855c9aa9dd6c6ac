use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::difficulty::{is_valid_difficulty, validate_difficulty};
use crate::errors::ApiError;
use crate::models::*;

// Import logging macros
use crate::log_store_operation;

/// Where the flashcard document lives. Loaded once, saved wholesale.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn load(&self) -> Result<FlashcardDb>;

    async fn save(&self, db: &FlashcardDb) -> Result<()>;

    fn describe(&self) -> String;
}

/// Pretty-printed JSON object of `set_id -> set` on disk
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StoreBackend for JsonFileBackend {
    async fn load(&self) -> Result<FlashcardDb> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(FlashcardDb::new());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        if content.trim().is_empty() {
            return Ok(FlashcardDb::new());
        }

        serde_json::from_str(&content).with_context(|| format!("Malformed flashcard file {}", self.path.display()))
    }

    async fn save(&self, db: &FlashcardDb) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(db)?;

        // readers only ever see a complete file
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

/// Volatile backend for tests and throwaway instances
#[derive(Default)]
pub struct MemoryBackend {
    snapshot: std::sync::Mutex<FlashcardDb>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(db: FlashcardDb) -> Self {
        Self {
            snapshot: std::sync::Mutex::new(db),
        }
    }

    /// Last saved state
    pub fn snapshot(&self) -> FlashcardDb {
        self.snapshot.lock().map(|db| db.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn load(&self) -> Result<FlashcardDb> {
        Ok(self.snapshot())
    }

    async fn save(&self, db: &FlashcardDb) -> Result<()> {
        let mut snapshot = self
            .snapshot
            .lock()
            .map_err(|_| anyhow::anyhow!("memory backend lock poisoned"))?;
        *snapshot = db.clone();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// In-memory flashcard sets mirrored to a [`StoreBackend`] after every change
#[derive(Clone)]
pub struct FlashcardStore {
    sets: Arc<Mutex<FlashcardDb>>,
    backend: Arc<dyn StoreBackend>,
}

impl FlashcardStore {
    pub async fn open(backend: Arc<dyn StoreBackend>) -> Result<Self> {
        let start = Instant::now();
        let sets = backend.load().await?;
        log_store_operation!(
            debug,
            "load",
            count = sets.len(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        log_store_operation!(info, "open", format!("loaded {} sets from {}", sets.len(), backend.describe()));

        Ok(Self {
            sets: Arc::new(Mutex::new(sets)),
            backend,
        })
    }

    pub async fn in_memory() -> Result<Self> {
        Self::open(Arc::new(MemoryBackend::new())).await
    }

    async fn persist(&self, sets: &FlashcardDb) -> Result<()> {
        let start = Instant::now();
        self.backend.save(sets).await.inspect_err(|e| {
            log_store_operation!(error, "save", error = e);
        })?;
        log_store_operation!(
            debug,
            "save",
            count = sets.len(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        Ok(())
    }

    /// Save `next` and only then make it the live map, so a failed save
    /// leaves memory matching the last persisted state.
    async fn commit(&self, sets: &mut FlashcardDb, next: FlashcardDb) -> Result<()> {
        self.persist(&next).await?;
        *sets = next;
        Ok(())
    }

    pub async fn create_set(&self, title: String, source: String, flashcards: Vec<Flashcard>) -> Result<(Uuid, FlashcardSet)> {
        let set = FlashcardSet {
            title,
            source,
            creation_date: Utc::now(),
            flashcards,
        };

        let mut sets = self.sets.lock().await;
        let mut id = Uuid::new_v4();
        while sets.contains_key(&id) {
            id = Uuid::new_v4();
        }
        let mut next = sets.clone();
        next.insert(id, set.clone());
        self.commit(&mut sets, next).await?;

        Ok((id, set))
    }

    /// Summaries ordered oldest first
    pub async fn list_sets(&self) -> Vec<FlashcardSetSummary> {
        let sets = self.sets.lock().await;
        let mut summaries: Vec<FlashcardSetSummary> = sets
            .iter()
            .map(|(id, set)| FlashcardSetSummary {
                id: *id,
                title: set.title.clone(),
                source: set.source.clone(),
                creation_date: set.creation_date,
                count: set.flashcards.len(),
            })
            .collect();
        summaries.sort_by(|a, b| a.creation_date.cmp(&b.creation_date).then(a.id.cmp(&b.id)));
        summaries
    }

    pub async fn get_set(&self, id: Uuid) -> Option<FlashcardSet> {
        self.sets.lock().await.get(&id).cloned()
    }

    /// Replace the title and/or the whole card list. `None` when the set is unknown.
    pub async fn update_set(
        &self,
        id: Uuid,
        title: Option<String>,
        flashcards: Option<Vec<FlashcardInput>>,
    ) -> Result<Option<FlashcardSet>> {
        let mut sets = self.sets.lock().await;
        let Some(mut updated) = sets.get(&id).cloned() else {
            return Ok(None);
        };

        if let Some(title) = title {
            updated.title = title;
        }
        if let Some(inputs) = flashcards {
            updated.flashcards = inputs.into_iter().map(card_from_input).collect();
        }

        let mut next = sets.clone();
        next.insert(id, updated.clone());
        self.commit(&mut sets, next).await?;
        Ok(Some(updated))
    }

    /// Merge arbitrary fields into the first card with `card_id`.
    ///
    /// `Ok(None)` when either id is unknown. The `id` key is ignored so a
    /// card keeps its identity; values that do not fit the card shape or an
    /// out-of-range difficulty are rejected without touching the store.
    pub async fn update_card(
        &self,
        set_id: Uuid,
        card_id: Uuid,
        fields: Map<String, Value>,
    ) -> Result<Option<Flashcard>, ApiError> {
        let mut sets = self.sets.lock().await;
        let mut next = sets.clone();
        let Some(card) = next
            .get_mut(&set_id)
            .and_then(|set| set.flashcards.iter_mut().find(|card| card.id == card_id))
        else {
            return Ok(None);
        };

        let updated = merge_card_fields(card, fields)?;
        *card = updated.clone();

        self.commit(&mut sets, next).await.map_err(ApiError::StoreError)?;
        Ok(Some(updated))
    }

    /// `false` when nothing was deleted
    pub async fn delete_set(&self, id: Uuid) -> Result<bool> {
        let mut sets = self.sets.lock().await;
        if !sets.contains_key(&id) {
            return Ok(false);
        }
        let mut next = sets.clone();
        next.remove(&id);
        self.commit(&mut sets, next).await?;
        Ok(true)
    }

    pub async fn set_count(&self) -> usize {
        self.sets.lock().await.len()
    }
}

fn card_from_input(input: FlashcardInput) -> Flashcard {
    let difficulty = validate_difficulty(input.difficulty.as_ref(), &input.question, &input.answer);
    Flashcard {
        id: input.id.unwrap_or_else(Uuid::new_v4),
        question: input.question,
        answer: input.answer,
        difficulty,
        last_reviewed: input.last_reviewed,
        next_review: input.next_review,
        review_count: input.review_count,
        extra: input.extra,
    }
}

fn merge_card_fields(card: &Flashcard, fields: Map<String, Value>) -> Result<Flashcard, ApiError> {
    if let Some(difficulty) = fields.get("difficulty") {
        if !difficulty.as_i64().is_some_and(is_valid_difficulty) {
            return Err(ApiError::ValidationError(format!(
                "difficulty must be an integer between 1 and 5, got {}",
                difficulty
            )));
        }
    }

    let mut merged = match serde_json::to_value(card).map_err(|e| ApiError::InternalError(e.to_string()))? {
        Value::Object(map) => map,
        _ => return Err(ApiError::InternalError("card did not serialize to an object".to_string())),
    };

    for (key, value) in fields {
        if key == "id" {
            continue;
        }
        merged.insert(key, value);
    }

    serde_json::from_value(Value::Object(merged))
        .map_err(|e| ApiError::ValidationError(format!("Invalid card fields: {}", e)))
}
