pub mod api;
pub mod config;
pub mod difficulty;
pub mod errors;
pub mod generator;
pub mod ingestion;
pub mod llm_providers;
pub mod llm_service;
pub mod logging;
pub mod models;
pub mod response_parser;
pub mod store;

pub use config::Config;
pub use errors::*;
pub use generator::FlashcardGenerator;
pub use llm_providers::{LLMProvider, LLMProviderFactory, LLMProviderType};
pub use llm_service::LLMService;
pub use models::*;
pub use response_parser::ResponseParser;
pub use store::{FlashcardStore, JsonFileBackend, MemoryBackend, StoreBackend};
