use axum::http::StatusCode;
use axum_test::{
    multipart::{MultipartForm, Part},
    TestServer,
};
use flashcard_service::{
    api::*,
    config::{GenerationConfig, UploadConfig},
    ingestion::DEFAULT_ALLOWED_EXTENSIONS,
    FlashcardGenerator, FlashcardStore,
};
use serde_json::Value;
use tempfile::TempDir;

const NOTES: &str = "Photosynthesis converts light energy into chemical energy inside plants. \
Chlorophyll absorbs mostly blue and red wavelengths of visible light. \
Oxygen is released as a by-product of splitting water molecules.";

async fn create_test_server() -> (TestServer, TempDir) {
    let upload_dir = TempDir::new().unwrap();
    let app_state = AppState {
        store: FlashcardStore::in_memory().await.unwrap(),
        generator: FlashcardGenerator::fallback_only(),
        generation: GenerationConfig::default(),
        upload: UploadConfig {
            upload_dir: upload_dir.path().to_path_buf(),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_upload_bytes: 1024 * 1024,
        },
    };

    let app = create_router(app_state);
    (TestServer::new(app).unwrap(), upload_dir)
}

fn file_form(filename: &str, bytes: &[u8], mime_type: &str) -> MultipartForm {
    let part = Part::bytes(bytes.to_vec()).file_name(filename).mime_type(mime_type);
    MultipartForm::new().add_part("file", part)
}

#[tokio::test]
async fn test_upload_text_document() {
    let (server, upload_dir) = create_test_server().await;

    let response = server
        .post("/api/upload")
        .add_query_param("num_cards", 3)
        .multipart(file_form("biology notes.txt", NOTES.as_bytes(), "text/plain"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert_eq!(data["title"], "biology_notes");
    assert_eq!(data["model_used"], false);
    assert_eq!(data["text_length"], NOTES.chars().count());

    let cards = data["flashcards"].as_array().unwrap();
    assert_eq!(cards.len(), 3);
    assert_eq!(
        cards[0]["answer"],
        "Photosynthesis converts light energy into chemical energy inside plants"
    );

    assert!(upload_dir.path().join("biology_notes.txt").exists());

    let set_id = data["set_id"].as_str().unwrap();
    let response = server.get(&format!("/api/flashcards/{}", set_id)).await;
    let body: Value = response.json();
    assert_eq!(body["data"]["source"], "biology_notes.txt");
}

#[tokio::test]
async fn test_upload_uses_default_card_count() {
    let (server, _upload_dir) = create_test_server().await;

    let response = server
        .post("/api/upload")
        .multipart(file_form("notes.txt", NOTES.as_bytes(), "text/plain"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let cards = body["data"]["flashcards"].as_array().unwrap();
    assert_eq!(cards.len(), GenerationConfig::default().default_num_cards);
}

#[tokio::test]
async fn test_upload_image_uses_placeholder_text() {
    let (server, _upload_dir) = create_test_server().await;

    let response = server
        .post("/api/upload")
        .add_query_param("num_cards", 2)
        .multipart(file_form("diagram.png", &[0x89, 0x50, 0x4e, 0x47], "image/png"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["title"], "diagram");
    assert_eq!(body["data"]["flashcards"].as_array().unwrap().len(), 2);
    assert!(body["data"]["text_length"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_upload_unreadable_pdf_still_creates_set() {
    let (server, _upload_dir) = create_test_server().await;

    let response = server
        .post("/api/upload")
        .add_query_param("num_cards", 2)
        .multipart(file_form("broken.pdf", b"definitely not a pdf", "application/pdf"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["text_length"], 0);
    let cards = body["data"]["flashcards"].as_array().unwrap();
    assert_eq!(cards.len(), 2);
    assert!(cards.iter().all(|card| card["difficulty"] == 1));
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let (server, _upload_dir) = create_test_server().await;

    let form = MultipartForm::new().add_text("comment", "no file here");
    let response = server.post("/api/upload").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("No file in request"));
}

#[tokio::test]
async fn test_upload_with_empty_filename() {
    let (server, _upload_dir) = create_test_server().await;

    let response = server
        .post("/api/upload")
        .multipart(file_form("", NOTES.as_bytes(), "text/plain"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_disallowed_extension() {
    let (server, upload_dir) = create_test_server().await;

    let response = server
        .post("/api/upload")
        .multipart(file_form("script.exe", b"MZ", "application/octet-stream"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("File type not allowed"));
    assert!(!upload_dir.path().join("script.exe").exists());

    let response = server.get("/api/flashcards").await;
    let body: Value = response.json();
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_too_many_cards() {
    let (server, _upload_dir) = create_test_server().await;

    let response = server
        .post("/api/upload")
        .add_query_param("num_cards", 51)
        .multipart(file_form("notes.txt", NOTES.as_bytes(), "text/plain"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_malformed_card_count() {
    let (server, _upload_dir) = create_test_server().await;

    let response = server
        .post("/api/upload")
        .add_query_param("num_cards", -1)
        .multipart(file_form("notes.txt", NOTES.as_bytes(), "text/plain"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Invalid query"));
}
