use anyhow::{anyhow, Result};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, info, warn};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Completion backends the flashcard generator can talk to
#[derive(Debug, Clone)]
pub enum LLMProvider {
    OpenAI(OpenAIProvider),
    Gemini(GeminiProvider),
}

impl LLMProvider {
    /// Single completion request with an optional system instruction
    pub async fn make_request(&self, system_message: Option<&str>, prompt: &str) -> Result<String> {
        match self {
            LLMProvider::OpenAI(provider) => provider.make_request(system_message, prompt).await,
            LLMProvider::Gemini(provider) => provider.make_request(system_message, prompt).await,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI(_) => "OpenAI",
            LLMProvider::Gemini(_) => "Gemini",
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            LLMProvider::OpenAI(provider) => &provider.endpoint.model,
            LLMProvider::Gemini(provider) => &provider.endpoint.model,
        }
    }
}

/// Connection details shared by every provider
#[derive(Debug, Clone)]
struct ProviderEndpoint {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ProviderEndpoint {
    fn new(api_key: String, base_url: Option<String>, model: Option<String>, default_base: &str, default_model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: normalize_base_url(base_url, default_base),
            model: model.unwrap_or_else(|| default_model.to_string()),
        }
    }

    /// Send a prepared request and decode the JSON reply.
    ///
    /// Error messages never include the request URL, which may carry the key.
    async fn send_json<T: DeserializeOwned>(&self, provider: &'static str, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("{} request failed: {}", provider, e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(provider, status = %status, error = %error_text, "LLM API request failed");
            return Err(anyhow!("{} API request failed ({}): {}", provider, status, error_text));
        }

        response
            .json()
            .await
            .map_err(|e| anyhow!("Invalid {} response: {}", provider, e.without_url()))
    }
}

fn normalize_base_url(base_url: Option<String>, default: &str) -> String {
    base_url
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

// ============================================================================
// OpenAI-compatible chat completions
// ============================================================================

#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    endpoint: ProviderEndpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAIProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            endpoint: ProviderEndpoint::new(api_key, base_url, model, OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL),
        }
    }

    fn build_request<'a>(&'a self, system_message: Option<&str>, prompt: &str) -> ChatRequest<'a> {
        let system = system_message.map(|content| ChatMessage {
            role: "system".to_string(),
            content: content.to_string(),
        });
        let user = ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        };

        ChatRequest {
            model: &self.endpoint.model,
            messages: system.into_iter().chain(std::iter::once(user)).collect(),
        }
    }

    pub async fn make_request(&self, system_message: Option<&str>, prompt: &str) -> Result<String> {
        let endpoint = &self.endpoint;
        info!(provider = "OpenAI", model = %endpoint.model, prompt_length = prompt.len(), "Making LLM request");

        let request = endpoint
            .client
            .post(format!("{}/chat/completions", endpoint.base_url))
            .bearer_auth(&endpoint.api_key)
            .json(&self.build_request(system_message, prompt));
        let response: ChatResponse = endpoint.send_json("OpenAI", request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("No choices in OpenAI response"))?;

        info!(provider = "OpenAI", response_length = content.len(), "Received LLM response");
        Ok(content)
    }
}

// ============================================================================
// Google Gemini generateContent
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    endpoint: ProviderEndpoint,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GenerationSettings,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![GeminiPart { text: text.to_string() }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

impl GeminiProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            endpoint: ProviderEndpoint::new(api_key, base_url, model, GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL),
        }
    }

    fn build_request(system_message: Option<&str>, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: system_message.map(|text| GeminiContent::text(None, text)),
            contents: vec![GeminiContent::text(Some("user"), prompt)],
            generation_config: GenerationSettings {
                temperature: 0.7,
                top_k: 40,
                top_p: 0.9,
                max_output_tokens: 4096,
            },
        }
    }

    pub async fn make_request(&self, system_message: Option<&str>, prompt: &str) -> Result<String> {
        let endpoint = &self.endpoint;
        info!(provider = "Gemini", model = %endpoint.model, prompt_length = prompt.len(), "Making LLM request");

        let request = endpoint
            .client
            .post(format!("{}/models/{}:generateContent", endpoint.base_url, endpoint.model))
            .query(&[("key", endpoint.api_key.as_str())])
            .json(&Self::build_request(system_message, prompt));
        let response: GenerateContentResponse = endpoint.send_json("Gemini", request).await?;

        let content = candidate_text(response)?;
        info!(provider = "Gemini", response_length = content.len(), "Received LLM response");
        Ok(content)
    }
}

/// Concatenated text parts of the first candidate
fn candidate_text(response: GenerateContentResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No candidates in Gemini response"))?;

    let parts = candidate.content.map(|content| content.parts).unwrap_or_default();
    if parts.is_empty() {
        return Err(anyhow!(
            "No parts in Gemini response (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ));
    }

    let text: String = parts.into_iter().map(|part| part.text).collect();
    if text.trim().is_empty() {
        warn!(provider = "Gemini", "Gemini returned an empty text response");
    }
    Ok(text)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProviderType {
    OpenAI,
    Gemini,
}

impl LLMProviderType {
    /// Map a user supplied provider name; unknown names default to Gemini
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "openai" | "chatgpt" | "gpt" => LLMProviderType::OpenAI,
            "gemini" | "google" => LLMProviderType::Gemini,
            other => {
                warn!("Unknown LLM provider '{}', defaulting to Gemini", other);
                LLMProviderType::Gemini
            }
        }
    }
}

/// Factory for creating LLM providers based on provider type
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    pub fn create_provider(
        provider_type: LLMProviderType,
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
    ) -> LLMProvider {
        match provider_type {
            LLMProviderType::OpenAI => LLMProvider::OpenAI(OpenAIProvider::new(api_key, base_url, model)),
            LLMProviderType::Gemini => LLMProvider::Gemini(GeminiProvider::new(api_key, base_url, model)),
        }
    }
}
