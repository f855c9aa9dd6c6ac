use flashcard_service::{Flashcard, FlashcardStore, JsonFileBackend};
use serde_json::{json, Map};
use std::sync::Arc;
use tempfile::TempDir;

fn sample_cards() -> Vec<Flashcard> {
    vec![
        Flashcard::new("Largest planet?".into(), "Jupiter".into(), 1),
        Flashcard::new("Closest star?".into(), "The Sun".into(), 2),
    ]
}

async fn open_store(dir: &TempDir) -> FlashcardStore {
    let backend = JsonFileBackend::new(dir.path().join("data").join("flashcards.json"));
    FlashcardStore::open(Arc::new(backend)).await.unwrap()
}

#[tokio::test]
async fn test_sets_survive_reopen() {
    let dir = TempDir::new().unwrap();

    let store = open_store(&dir).await;
    assert_eq!(store.set_count().await, 0);
    let (id, created) = store
        .create_set("Astronomy".into(), "space.txt".into(), sample_cards())
        .await
        .unwrap();

    let reopened = open_store(&dir).await;
    let loaded = reopened.get_set(id).await.unwrap();
    assert_eq!(loaded.title, "Astronomy");
    assert_eq!(loaded.source, "space.txt");
    assert_eq!(loaded.creation_date, created.creation_date);
    assert_eq!(loaded.flashcards.len(), 2);
    assert_eq!(loaded.flashcards[0].id, created.flashcards[0].id);
}

#[tokio::test]
async fn test_card_edits_and_deletes_are_persisted() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let (kept, created) = store
        .create_set("Astronomy".into(), "space.txt".into(), sample_cards())
        .await
        .unwrap();
    let (removed, _) = store
        .create_set("Scratch".into(), "Manual text".into(), Vec::new())
        .await
        .unwrap();

    let mut fields = Map::new();
    fields.insert("difficulty".into(), json!(5));
    fields.insert("source_page".into(), json!(12));
    store
        .update_card(kept, created.flashcards[1].id, fields)
        .await
        .unwrap()
        .unwrap();
    assert!(store.delete_set(removed).await.unwrap());

    let reopened = open_store(&dir).await;
    assert_eq!(reopened.set_count().await, 1);
    assert!(reopened.get_set(removed).await.is_none());
    let card = &reopened.get_set(kept).await.unwrap().flashcards[1];
    assert_eq!(card.difficulty, 5);
    assert_eq!(card.extra.get("source_page"), Some(&json!(12)));
}
