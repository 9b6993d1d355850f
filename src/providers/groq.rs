use crate::error::{ProviderError, ProviderResult};
use crate::io_struct::{ImagePayload, Message};
use crate::providers::ProviderHandler;
use crate::providers::common::{
    ChatCompletionRequest, WireMessage, execute_chat_request, with_system_prompt,
};
use async_trait::async_trait;

const API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const MODEL: &str = "llama-3.3-70b-specdec";
const DEFAULT_PERSONA: &str = "You are a helpful AI assistant powered by Llama.";
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 4096;
const TOP_P: f64 = 1.0;

/// Text-only handler for Llama 3.3 70B hosted on Groq
pub struct GroqHandler {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl GroqHandler {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        GroqHandler { client, api_key }
    }

    fn build_request(messages: &[Message]) -> ChatCompletionRequest {
        let messages = with_system_prompt(messages, DEFAULT_PERSONA)
            .iter()
            .map(WireMessage::from_message)
            .collect();
        ChatCompletionRequest {
            model: MODEL,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            top_p: TOP_P,
            stream: false,
        }
    }
}

#[async_trait]
impl ProviderHandler for GroqHandler {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn handle(
        &self,
        messages: &[Message],
        _image: Option<&ImagePayload>,
    ) -> ProviderResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential {
                provider: self.name(),
            })?;
        let request = Self::build_request(messages);
        log::info!(
            "groq: sending {} messages to {}",
            request.messages.len(),
            MODEL
        );
        log::debug!(
            "groq request: {}",
            serde_json::to_string(&request).unwrap_or_default()
        );
        execute_chat_request(
            self.name(),
            self.client.post(API_URL).bearer_auth(api_key).json(&request),
        )
        .await
    }
}
