use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::{GenerationConfig, UploadConfig},
    errors::{ApiError, ErrorContext, ErrorResponse},
    generator::FlashcardGenerator,
    ingestion::{self, DocumentKind},
    models::*,
    store::FlashcardStore,
};

// Import logging macros
use crate::{api_error, log_api_error, log_api_start, log_api_success, log_api_warn};

const DEFAULT_GENERATED_TITLE: &str = "Generated flashcards";
const MANUAL_TEXT_SOURCE: &str = "Manual text";

#[derive(Clone)]
pub struct AppState {
    pub store: FlashcardStore,
    pub generator: FlashcardGenerator,
    pub generation: GenerationConfig,
    pub upload: UploadConfig,
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ServiceInfo {
    pub status: String,
    pub message: String,
    pub version: String,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ErrorResponse>;

/// Ids that do not parse cannot exist, so they are reported as not found
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

fn set_not_found(operation: &str, set_id: &str) -> ErrorResponse {
    api_error!(not_found, operation, "Flashcard set", set_id)
}

/// Malformed or ill-typed JSON bodies become 400 validation errors in the usual envelope
fn json_body<T>(body: Result<Json<T>, JsonRejection>, operation: &str, resource_type: &str) -> Result<T, ErrorResponse> {
    body.map(|Json(value)| value).map_err(|rejection| {
        ApiError::ValidationError(format!("Invalid request body: {}", rejection.body_text()))
            .to_response_with_context(ErrorContext::new(operation, resource_type))
    })
}

fn resolve_num_cards(requested: Option<usize>, config: &GenerationConfig, operation: &str) -> Result<usize, ErrorResponse> {
    let num_cards = requested.unwrap_or(config.default_num_cards);
    if num_cards > config.max_num_cards {
        let message = format!("num_cards must be at most {}, got {}", config.max_num_cards, num_cards);
        return Err(api_error!(validation, operation, "flashcard set", message));
    }
    Ok(num_cards)
}

pub async fn index() -> Json<ApiResponse<ServiceInfo>> {
    Json(ApiResponse::success(ServiceInfo {
        status: "ok".to_string(),
        message: "Flashcard API operational".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

pub async fn test_llm_connection(State(state): State<AppState>) -> ApiResult<ConnectionCheckResult> {
    log_api_start!("test_llm_connection");

    let Some(llm_service) = state.generator.llm_service() else {
        let error = ApiError::LLMError("No API key configured".to_string());
        let (_, body) = error.to_response_with_context(ErrorContext::new("test_llm_connection", "llm"));
        return Err((StatusCode::INTERNAL_SERVER_ERROR, body));
    };

    match llm_service.test_connection().await {
        Ok(reply) => {
            log_api_success!("test_llm_connection", "LLM reachable");
            Ok(Json(ApiResponse::success(ConnectionCheckResult {
                message: format!("LLM test succeeded: {}", reply.trim()),
                raw_response: reply,
                provider: llm_service.provider_name().to_string(),
                model: llm_service.model_name().to_string(),
            })))
        }
        Err(e) => {
            log_api_error!("test_llm_connection", error = e, "LLM unreachable");
            let error = ApiError::LLMError(format!("LLM test failed: {}", e));
            let (_, body) = error.to_response_with_context(ErrorContext::new("test_llm_connection", "llm"));
            Err((StatusCode::INTERNAL_SERVER_ERROR, body))
        }
    }
}

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
        return Ok(Some(UploadedFile {
            filename,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

pub async fn upload_document(
    State(state): State<AppState>,
    params: Result<Query<UploadParams>, QueryRejection>,
    mut multipart: Multipart,
) -> ApiResult<GenerationResponse> {
    log_api_start!("upload_document");
    let context = || ErrorContext::new("upload_document", "file");

    let Query(params) = params.map_err(|rejection| {
        ApiError::ValidationError(format!("Invalid query: {}", rejection.body_text())).to_response_with_context(context())
    })?;

    let num_cards = resolve_num_cards(params.num_cards, &state.generation, "upload_document")?;

    let upload = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return Err(ApiError::BadRequest("No file in request".to_string()).to_response_with_context(context()));
        }
        Err(e) => return Err(e.to_response_with_context(context())),
    };

    if upload.filename.is_empty() {
        return Err(ApiError::BadRequest("No file selected".to_string()).to_response_with_context(context()));
    }

    if !ingestion::is_allowed_file(&upload.filename, &state.upload.allowed_extensions) {
        return Err(ApiError::ValidationError(format!("File type not allowed: {}", upload.filename))
            .to_response_with_context(context()));
    }

    let Some(filename) = ingestion::sanitize_filename(&upload.filename) else {
        return Err(ApiError::ValidationError(format!("Invalid file name: {}", upload.filename))
            .to_response_with_context(context()));
    };

    let Some(kind) = DocumentKind::from_filename(&filename) else {
        return Err(ApiError::ValidationError(format!("Unsupported document type: {}", filename))
            .to_response_with_context(context()));
    };

    info!(filename = %filename, size = upload.bytes.len(), ?kind, num_cards, "Received upload");

    if let Err(e) = ingestion::save_upload(&state.upload.upload_dir, &filename, &upload.bytes).await {
        return Err(ApiError::StoreError(e).to_response_with_context(context().with_id(&filename)));
    }

    let bytes = upload.bytes;
    let text = tokio::task::spawn_blocking(move || ingestion::extract_text(kind, &bytes))
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()).to_response_with_context(context()))?;
    let text_length = text.chars().count();
    debug!(filename = %filename, text_length, "Extracted document text");

    let outcome = state.generator.generate(&text, num_cards).await;
    if outcome.used_fallback() {
        log_api_warn!("upload_document", "flashcards produced by fallback generator");
    }

    let title = ingestion::file_stem(&filename).to_string();
    let (set_id, set) = state
        .store
        .create_set(title, filename.clone(), outcome.flashcards.clone())
        .await
        .map_err(|e| ApiError::StoreError(e).to_response_with_context(context().with_id(&filename)))?;

    log_api_success!("upload_document", set_id = set_id, "flashcard set created from upload");
    Ok(Json(ApiResponse::success(GenerationResponse {
        set_id,
        title: set.title,
        flashcards: set.flashcards,
        model_used: !outcome.used_fallback(),
        text_length: Some(text_length),
    })))
}

pub async fn generate_from_text(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<GenerationResponse> {
    log_api_start!("generate_from_text");
    let context = || ErrorContext::new("generate_from_text", "flashcard set");
    let request = json_body(body, "generate_from_text", "flashcard set")?;

    let Some(text) = request.text else {
        return Err(ApiError::ValidationError("No text provided".to_string()).to_response_with_context(context()));
    };
    let num_cards = resolve_num_cards(request.num_cards, &state.generation, "generate_from_text")?;
    let title = request
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_GENERATED_TITLE.to_string());

    let outcome = state.generator.generate(&text, num_cards).await;
    if outcome.used_fallback() {
        log_api_warn!("generate_from_text", "flashcards produced by fallback generator");
    }

    let (set_id, set) = state
        .store
        .create_set(title, MANUAL_TEXT_SOURCE.to_string(), outcome.flashcards.clone())
        .await
        .map_err(|e| ApiError::StoreError(e).to_response_with_context(context()))?;

    log_api_success!("generate_from_text", set_id = set_id, "flashcard set created from text");
    Ok(Json(ApiResponse::success(GenerationResponse {
        set_id,
        title: set.title,
        flashcards: set.flashcards,
        model_used: !outcome.used_fallback(),
        text_length: None,
    })))
}

pub async fn list_flashcard_sets(State(state): State<AppState>) -> ApiResult<Vec<FlashcardSetSummary>> {
    let summaries = state.store.list_sets().await;
    log_api_success!("list_flashcard_sets", count = summaries.len(), "flashcard sets listed");
    Ok(Json(ApiResponse::success(summaries)))
}

pub async fn get_flashcard_set(
    State(state): State<AppState>,
    Path(set_id): Path<String>,
) -> ApiResult<FlashcardSetView> {
    log_api_start!("get_flashcard_set", set_id = set_id);

    let found = match parse_id(&set_id) {
        Some(id) => state.store.get_set(id).await.map(|set| FlashcardSetView { id, set }),
        None => None,
    };

    match found {
        Some(view) => Ok(Json(ApiResponse::success(view))),
        None => {
            log_api_warn!("get_flashcard_set", set_id = set_id, "flashcard set not found");
            Err(set_not_found("get_flashcard_set", &set_id))
        }
    }
}

pub async fn update_flashcard_set(
    State(state): State<AppState>,
    Path(set_id): Path<String>,
    body: Result<Json<UpdateSetRequest>, JsonRejection>,
) -> ApiResult<UpdateSetResponse> {
    log_api_start!("update_flashcard_set", set_id = set_id);

    let Some(id) = parse_id(&set_id) else {
        return Err(set_not_found("update_flashcard_set", &set_id));
    };
    let request = json_body(body, "update_flashcard_set", "Flashcard set")?;

    match state.store.update_set(id, request.title, request.flashcards).await {
        Ok(Some(_)) => {
            log_api_success!("update_flashcard_set", set_id = id, "flashcard set updated");
            Ok(Json(ApiResponse::success(UpdateSetResponse { set_id: id })))
        }
        Ok(None) => Err(set_not_found("update_flashcard_set", &set_id)),
        Err(e) => Err(api_error!(store, "update_flashcard_set", "Flashcard set", e)),
    }
}

pub async fn update_flashcard(
    State(state): State<AppState>,
    Path((set_id, card_id)): Path<(String, String)>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Flashcard> {
    log_api_start!("update_flashcard", set_id = set_id, card_id = card_id);
    let context = || ErrorContext::new("update_flashcard", "Card").with_id(&card_id);

    let (Some(set_uuid), Some(card_uuid)) = (parse_id(&set_id), parse_id(&card_id)) else {
        return Err(ApiError::NotFound(format!("Card '{}' in set '{}' not found", card_id, set_id))
            .to_response_with_context(context()));
    };
    let fields = json_body(body, "update_flashcard", "Card")?;

    match state.store.update_card(set_uuid, card_uuid, fields).await {
        Ok(Some(card)) => {
            log_api_success!("update_flashcard", set_id = set_uuid, card_id = card_uuid, "card updated");
            Ok(Json(ApiResponse::success(card)))
        }
        Ok(None) => {
            log_api_warn!("update_flashcard", set_id = set_id, card_id = card_id, "set or card not found");
            Err(ApiError::NotFound(format!("Card '{}' in set '{}' not found", card_id, set_id))
                .to_response_with_context(context()))
        }
        Err(e) => Err(e.to_response_with_context(context())),
    }
}

pub async fn delete_flashcard_set(
    State(state): State<AppState>,
    Path(set_id): Path<String>,
) -> ApiResult<bool> {
    log_api_start!("delete_flashcard_set", set_id = set_id);

    let Some(id) = parse_id(&set_id) else {
        return Err(set_not_found("delete_flashcard_set", &set_id));
    };

    match state.store.delete_set(id).await {
        Ok(true) => {
            log_api_success!("delete_flashcard_set", set_id = id, "flashcard set deleted");
            Ok(Json(ApiResponse::success(true)))
        }
        Ok(false) => Err(set_not_found("delete_flashcard_set", &set_id)),
        Err(e) => {
            log_api_error!("delete_flashcard_set", set_id = id, error = e, "failed to persist deletion");
            Err(ApiError::StoreError(e)
                .to_response_with_context(ErrorContext::new("delete_flashcard_set", "Flashcard set").with_id(&set_id)))
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    if state.generator.llm_service().is_none() {
        warn!("Router created without an LLM; generation uses the local fallback only");
    }
    let body_limit = state.upload.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/api/test-gemini", get(test_llm_connection))
        // Generation routes
        .route("/api/upload", post(upload_document))
        .route("/api/generate", post(generate_from_text))
        // Flashcard set routes
        .route("/api/flashcards", get(list_flashcard_sets))
        .route(
            "/api/flashcards/:set_id",
            get(get_flashcard_set).put(update_flashcard_set).delete(delete_flashcard_set),
        )
        .route("/api/flashcards/:set_id/cards/:card_id", put(update_flashcard))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
