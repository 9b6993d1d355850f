use crate::error::{ProviderError, ProviderResult};
use crate::io_struct::{ImagePayload, Message};
use crate::providers::ProviderHandler;
use crate::providers::common::{
    ChatCompletionRequest, WireMessage, execute_chat_request, with_system_prompt,
};
use async_trait::async_trait;

const API_URL: &str = "https://api.x.ai/v1/chat/completions";
const MODEL: &str = "grok-beta";
const DEFAULT_PERSONA: &str =
    "You are Grok, a chatbot inspired by the Hitchhiker's Guide to the Galaxy.";
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 2048;
const TOP_P: f64 = 1.0;

/// Text-only handler for Grok on the xAI API
pub struct XaiHandler {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl XaiHandler {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        XaiHandler { client, api_key }
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
impl ProviderHandler for XaiHandler {
    fn name(&self) -> &'static str {
        "xai"
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
            "xai: sending {} messages to {}",
            request.messages.len(),
            MODEL
        );
        log::debug!(
            "xai request: {}",
            serde_json::to_string(&request).unwrap_or_default()
        );
        execute_chat_request(
            self.name(),
            self.client.post(API_URL).bearer_auth(api_key).json(&request),
        )
        .await
    }
}
