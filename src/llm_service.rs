use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::llm_providers::{LLMProvider, LLMProviderFactory, LLMProviderType};
use crate::models::GeneratedCardDraft;
use crate::response_parser::ResponseParser;

pub const DEFAULT_MAX_INPUT_CHARS: usize = 4000;

const SYSTEM_MESSAGE: &str = "You are an experienced educator who writes concise study flashcards. Always respond with valid JSON in the requested format.";

const GREETING_PROMPT: &str = "Say hello in one short sentence.";

#[derive(Clone)]
pub struct LLMService {
    provider: LLMProvider,
    parser: Arc<ResponseParser>,
    max_input_chars: usize,
}

impl LLMService {
    pub fn new_with_provider(
        api_key: String,
        base_url: Option<String>,
        provider_type: LLMProviderType,
        model: Option<String>,
    ) -> Self {
        let provider = LLMProviderFactory::create_provider(provider_type, api_key, base_url, model);

        Self {
            provider,
            parser: Arc::new(ResponseParser::default()),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    pub fn new_gemini(api_key: String, model: Option<String>) -> Self {
        Self::new_with_provider(api_key, None, LLMProviderType::Gemini, model)
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Ask the model for `num_cards` flashcards about `text`.
    ///
    /// One request, no retry. Errors when the call fails or none of the
    /// parse strategies recognise the reply; the caller decides what to do
    /// with that.
    pub async fn generate_flashcards(&self, text: &str, num_cards: usize) -> Result<Vec<GeneratedCardDraft>> {
        let excerpt = truncate_chars(text, self.max_input_chars);

        info!(
            provider = self.provider_name(),
            model = %self.model_name(),
            text_length = text.chars().count(),
            excerpt_length = excerpt.chars().count(),
            num_cards,
            "Generating flashcards with LLM"
        );

        let prompt = build_flashcard_prompt(excerpt, num_cards);
        let response_text = self.provider.make_request(Some(SYSTEM_MESSAGE), &prompt).await?;

        debug!(
            response_preview = %response_text.chars().take(200).collect::<String>(),
            "Raw LLM response for flashcard generation"
        );

        match self.parser.parse(&response_text) {
            Some(drafts) => {
                info!(draft_count = drafts.len(), "Successfully parsed flashcards from LLM response");
                Ok(drafts)
            }
            None => {
                error!(
                    response_preview = %response_text.chars().take(200).collect::<String>(),
                    "No parse strategy recognised the LLM response"
                );
                Err(anyhow::anyhow!("LLM response did not contain a flashcard array"))
            }
        }
    }

    /// Send a trivial prompt to check credentials and connectivity.
    pub async fn test_connection(&self) -> Result<String> {
        info!(provider = self.provider_name(), model = %self.model_name(), "Probing LLM connectivity");
        self.provider.make_request(None, GREETING_PROMPT).await
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

pub fn build_flashcard_prompt(text: &str, num_cards: usize) -> String {
    format!(
        r#"From the following text, create {num_cards} study flashcards in question/answer form.

TEXT TO ANALYSE:
{text}

INSTRUCTIONS:
1. Identify the key concepts and the important information in the text.
2. Create exactly {num_cards} cards with relevant questions and precise answers.
3. Questions must be clear and specific.
4. Answers must be concise but complete.
5. Give each card a difficulty from 1 to 5 where:
   - 1 = Very easy (basic knowledge)
   - 2 = Easy (simple recall)
   - 3 = Medium (understanding required)
   - 4 = Hard (applying concepts)
   - 5 = Very hard (complex analysis or synthesis)
6. Your answer must be a valid JSON array in the following format:

[
  {{
    "question": "Question 1?",
    "answer": "Answer 1",
    "difficulty": 2
  }},
  {{
    "question": "Question 2?",
    "answer": "Answer 2",
    "difficulty": 4
  }}
]

Reply ONLY with the JSON, with no explanatory text before or after."#
    )
}
