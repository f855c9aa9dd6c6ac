use axum::http::StatusCode;
use axum_test::TestServer;
use flashcard_service::{
    api::*,
    config::{GenerationConfig, UploadConfig},
    CardSource, FlashcardGenerator, FlashcardStore, LLMProviderType, LLMService,
};
use serde_json::{json, Value};

// Nothing listens on the discard port, so every request fails fast
const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

const PARIS: &str = "Paris is the capital of France. It has a population of 2 million.";

fn unreachable_service(provider: LLMProviderType) -> LLMService {
    LLMService::new_with_provider("test_key".to_string(), Some(UNREACHABLE_URL.to_string()), provider, None)
}

async fn create_test_server() -> TestServer {
    let app_state = AppState {
        store: FlashcardStore::in_memory().await.unwrap(),
        generator: FlashcardGenerator::new(Some(unreachable_service(LLMProviderType::Gemini))),
        generation: GenerationConfig::default(),
        upload: UploadConfig {
            upload_dir: std::env::temp_dir().join("flashcard-service-llm-tests"),
            allowed_extensions: vec!["txt".to_string()],
            max_upload_bytes: 1024 * 1024,
        },
    };

    TestServer::new(create_router(app_state)).unwrap()
}

#[tokio::test]
async fn test_generator_falls_back_when_provider_unreachable() {
    for provider in [LLMProviderType::Gemini, LLMProviderType::OpenAI] {
        let generator = FlashcardGenerator::new(Some(unreachable_service(provider)));

        let outcome = generator.generate(PARIS, 2).await;
        assert_eq!(outcome.source, CardSource::Fallback);
        assert!(outcome.used_fallback());
        assert_eq!(outcome.flashcards.len(), 2);
        assert_eq!(outcome.flashcards[0].answer, "Paris is the capital of France");
    }
}

#[tokio::test]
async fn test_generator_without_service_uses_fallback() {
    let generator = FlashcardGenerator::fallback_only();

    let outcome = generator.generate("", 4).await;
    assert!(outcome.used_fallback());
    assert_eq!(outcome.flashcards.len(), 4);
    assert!(outcome.flashcards.iter().all(|card| card.difficulty == 1));
}

#[tokio::test]
async fn test_generate_endpoint_survives_llm_failure() {
    let server = create_test_server().await;

    let response = server
        .post("/api/generate")
        .json(&json!({ "text": PARIS, "num_cards": 2 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["model_used"], false);
    assert_eq!(body["data"]["flashcards"].as_array().unwrap().len(), 2);

    let response = server.get("/api/flashcards").await;
    let body: Value = response.json();
    assert_eq!(body["data"][0]["count"], 2);
}

#[tokio::test]
async fn test_connection_check_reports_unreachable_provider() {
    let server = create_test_server().await;

    let response = server.get("/api/test-gemini").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("LLM test failed"));
}

#[tokio::test]
async fn test_service_errors_are_returned_to_caller() {
    let service = unreachable_service(LLMProviderType::Gemini);

    assert!(service.generate_flashcards(PARIS, 2).await.is_err());
    assert!(service.test_connection().await.is_err());
}
