use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::ingestion::DEFAULT_ALLOWED_EXTENSIONS;
use crate::llm_providers::LLMProviderType;
use crate::llm_service::DEFAULT_MAX_INPUT_CHARS;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub llm: LLMConfig,
    pub generation: GenerationConfig,
    pub upload: UploadConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Flashcard persistence
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub flashcards_file: PathBuf,
}

/// Large Language Model service configuration
#[derive(Debug, Clone)]
pub struct LLMConfig {
    /// `None` keeps generation on the local fallback only
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub provider: LLMProviderType,
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub default_num_cards: usize,
    pub max_num_cards: usize,
    pub max_input_chars: usize,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub upload_dir: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub max_upload_bytes: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            store: StoreConfig::from_env(),
            llm: LLMConfig::from_env(),
            generation: GenerationConfig::from_env()?,
            upload: UploadConfig::from_env()?,
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env(),
        };

        log_system_event!(config, "Configuration loaded successfully");
        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    pub fn log_configuration_summary(&self) {
        info!(
            flashcards_file = %self.store.flashcards_file.display(),
            upload_dir = %self.upload.upload_dir.display(),
            allowed_extensions = ?self.upload.allowed_extensions,
            llm_provider = ?self.llm.provider,
            llm_model = ?self.llm.model,
            llm_api_key = %self.llm.api_key.as_deref().map(mask_sensitive_data).unwrap_or_else(|| "<unset>".to_string()),
            server_address = %self.server.address(),
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.generation.max_num_cards == 0 {
            return Err(anyhow!("MAX_NUM_CARDS must be greater than 0"));
        }

        if self.generation.default_num_cards > self.generation.max_num_cards {
            return Err(anyhow!(
                "DEFAULT_NUM_CARDS ({}) cannot exceed MAX_NUM_CARDS ({})",
                self.generation.default_num_cards,
                self.generation.max_num_cards
            ));
        }

        if self.generation.max_input_chars == 0 {
            return Err(anyhow!("MAX_INPUT_CHARS must be greater than 0"));
        }

        if self.upload.allowed_extensions.is_empty() {
            return Err(anyhow!("ALLOWED_EXTENSIONS must list at least one extension"));
        }

        if self.llm.api_key.is_none() {
            warn!("No LLM API key configured - flashcards will come from the local fallback generator");
        }

        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|level| self.logging.level.to_lowercase().starts_with(level))
        {
            warn!("Log level '{}' may not be understood, falling back to filter defaults", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl StoreConfig {
    fn from_env() -> Self {
        let flashcards_file = env::var("FLASHCARDS_FILE")
            .unwrap_or_else(|_| "data/flashcards.json".to_string())
            .into();

        StoreConfig { flashcards_file }
    }
}

impl LLMConfig {
    fn from_env() -> Self {
        let api_key = non_empty_var("LLM_API_KEY").or_else(|| non_empty_var("GEMINI_API_KEY"));
        let base_url = non_empty_var("LLM_BASE_URL");
        let provider = LLMProviderType::from_name(&env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string()));
        let model = non_empty_var("LLM_MODEL");

        LLMConfig {
            api_key,
            base_url,
            provider,
            model,
        }
    }
}

impl GenerationConfig {
    fn from_env() -> Result<Self> {
        Ok(GenerationConfig {
            default_num_cards: parse_var("DEFAULT_NUM_CARDS", 5)?,
            max_num_cards: parse_var("MAX_NUM_CARDS", 50)?,
            max_input_chars: parse_var("MAX_INPUT_CHARS", DEFAULT_MAX_INPUT_CHARS)?,
        })
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_num_cards: 5,
            max_num_cards: 50,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

impl UploadConfig {
    fn from_env() -> Result<Self> {
        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()).into();
        let allowed_extensions = match env::var("ALLOWED_EXTENSIONS") {
            Ok(list) => parse_extension_list(&list),
            Err(_) => DEFAULT_ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        };
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", 16 * 1024 * 1024)?;

        Ok(UploadConfig {
            upload_dir,
            allowed_extensions,
            max_upload_bytes,
        })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "5000".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str))?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl LoggingConfig {
    fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,flashcard_service=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .map(|v| parse_bool(&v, true))
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .map(|v| parse_bool(&v, true))
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var(name: &str, default: usize) -> Result<usize> {
    match non_empty_var(name) {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| anyhow!("Invalid {} value: '{}'. Must be a non-negative integer", name, raw)),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str, default: bool) -> bool {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Comma separated, dots optional, case-insensitive
pub fn parse_extension_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

/// Mask sensitive data in configuration for safe logging
pub fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}
