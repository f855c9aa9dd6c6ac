use anyhow::{Context, Result};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flashcard_service::{
    api::{create_router, AppState},
    config::{Config, LoggingConfig},
    generator::FlashcardGenerator,
    llm_service::LLMService,
    log_system_event,
    store::{FlashcardStore, JsonFileBackend},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = setup_logging(&config.logging)?;

    config.validate()?;
    config.log_configuration_summary();

    log_system_event!(startup, component = "server", "Starting flashcard service");

    let backend = Arc::new(JsonFileBackend::new(&config.store.flashcards_file));
    let store = FlashcardStore::open(backend)
        .await
        .with_context(|| format!("Failed to load {}", config.store.flashcards_file.display()))?;
    info!(sets = store.set_count().await, "Flashcard store ready");

    let llm_service = config.llm.api_key.clone().map(|api_key| {
        LLMService::new_with_provider(
            api_key,
            config.llm.base_url.clone(),
            config.llm.provider,
            config.llm.model.clone(),
        )
        .with_max_input_chars(config.generation.max_input_chars)
    });
    if let Some(service) = &llm_service {
        info!(provider = service.provider_name(), model = service.model_name(), "Initialized LLM service");
    }

    let state = AppState {
        store,
        generator: FlashcardGenerator::new(llm_service),
        generation: config.generation.clone(),
        upload: config.upload.clone(),
    };

    let app = create_router(state).layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let addr = config.server.address();
    log_system_event!(startup, component = "server", format!("Server starting on {}", addr));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use std::fs;
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Console output
    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
    });

    // File output with daily rotation, no ANSI colors
    let mut guard = None;
    let file_layer = if config.file_enabled {
        fs::create_dir_all(&config.log_directory)
            .with_context(|| format!("Could not create log directory {}", config.log_directory))?;
        let file_appender = tracing_appender::rolling::daily(&config.log_directory, "flashcard-service.log");
        let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        Some(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(non_blocking_file),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if config.file_enabled {
        info!(
            "Logging initialized - writing to {}/flashcard-service.log with daily rotation",
            config.log_directory
        );
    }

    Ok(guard)
}
