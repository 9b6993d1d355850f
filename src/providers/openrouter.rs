use crate::error::{ProviderError, ProviderResult};
use crate::io_struct::{ImagePayload, Message};
use crate::providers::ProviderHandler;
use crate::providers::common::{
    execute_chat_request, flatten_prompt, with_system_prompt,
};
use async_trait::async_trait;
use serde_json::{Value, json};

const API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const MODEL: &str = "google/learnlm-1.5-pro-experimental:free";
const DEFAULT_PERSONA: &str = "You are LearnLM, a patient tutoring assistant.";
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 2048;
const TOP_P: f64 = 1.0;
const APP_TITLE: &str = "chat-relay";

/// Multimodal handler for LearnLM behind the OpenRouter gateway. The
/// history is flattened into a single prompt submitted as a structured
/// content list; an attached image becomes a data-URI part.
pub struct OpenRouterHandler {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl OpenRouterHandler {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        OpenRouterHandler { client, api_key }
    }

    fn build_request(messages: &[Message], image: Option<&ImagePayload>) -> Value {
        let prompt = flatten_prompt(&with_system_prompt(messages, DEFAULT_PERSONA));
        let mut content = vec![json!({ "type": "text", "text": prompt })];
        if let Some(image) = image {
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": image.data_uri() }
            }));
        }
        json!({
            "model": MODEL,
            "messages": [{ "role": "user", "content": content }],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
            "top_p": TOP_P,
        })
    }
}

#[async_trait]
impl ProviderHandler for OpenRouterHandler {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn handle(
        &self,
        messages: &[Message],
        image: Option<&ImagePayload>,
    ) -> ProviderResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential {
                provider: self.name(),
            })?;
        let request = Self::build_request(messages, image);
        log::info!(
            "openrouter: sending {} messages to {}, image: {}",
            messages.len(),
            MODEL,
            image.is_some()
        );
        log::debug!("openrouter request: {}", request);
        execute_chat_request(
            self.name(),
            self.client
                .post(API_URL)
                .bearer_auth(api_key)
                .header("X-Title", APP_TITLE)
                .json(&request),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_text_only_has_single_text_part() {
        let request = OpenRouterHandler::build_request(&[Message::user("hi")], None);
        let content = request["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
        assert!(content[0]["text"].as_str().unwrap().contains("User: hi"));
    }

    #[test]
    fn test_build_request_appends_data_uri_image_part() {
        let image = ImagePayload {
            data: b"abc".to_vec(),
            mime: "image/jpeg".to_string(),
        };
        let request =
            OpenRouterHandler::build_request(&[Message::user("describe this")], Some(&image));
        let content = request["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(
            content[1]["image_url"]["url"],
            "data:image/jpeg;base64,YWJj"
        );
    }

    #[test]
    fn test_build_request_policy_constants() {
        let request = OpenRouterHandler::build_request(&[Message::user("hi")], None);
        assert_eq!(request["model"], "google/learnlm-1.5-pro-experimental:free");
        assert_eq!(request["max_tokens"], 2048);
        assert_eq!(request["top_p"], 1.0);
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_call() {
        let handler = OpenRouterHandler::new(reqwest::Client::new(), None);
        let result = handler.handle(&[Message::user("hi")], None).await;
        assert!(matches!(
            result,
            Err(ProviderError::MissingCredential {
                provider: "openrouter"
            })
        ));
    }
}
