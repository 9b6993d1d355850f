//! Wire types and call plumbing shared by the provider handlers.

use crate::error::{ProviderError, ProviderResult};
use crate::io_struct::{Message, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

impl WireMessage {
    pub fn from_message(message: &Message) -> Self {
        WireMessage {
            role: message.role.as_str(),
            content: message.content.clone(),
        }
    }
}

/// Request body for chat-completions style providers. The sampling fields
/// are per-handler policy constants, never caller input.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: &'static str,
    pub messages: Vec<WireMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

/// Copy of the history with the handler's default persona injected at the
/// head when no system message is present anywhere in the sequence
pub fn with_system_prompt(messages: &[Message], persona: &str) -> Vec<Message> {
    if messages.iter().any(|m| m.role == Role::System) {
        return messages.to_vec();
    }
    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(Message::system(persona));
    out.extend_from_slice(messages);
    out
}

/// Render the history as one role-prefixed prompt, for providers that take
/// a single text block instead of a message list
pub fn flatten_prompt(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Send a prepared request and hand back the response body, mapping
/// transport failures and non-success statuses to `ProviderError`
pub async fn send_request(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> ProviderResult<String> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::transport(provider, e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::transport(provider, e))?;
    if !status.is_success() {
        log::error!("{} upstream error {}: {}", provider, status, body);
        return Err(ProviderError::UpstreamStatus {
            provider,
            status,
            body,
        });
    }
    log::debug!("{} response: {}", provider, body);
    Ok(body)
}

/// Extract `choices[0].message.content` from a chat-completions response
pub fn parse_chat_completion(provider: &'static str, body: &str) -> ProviderResult<String> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|_| ProviderError::InvalidResponseShape { provider })?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ProviderError::InvalidResponseShape { provider })
}

pub async fn execute_chat_request(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> ProviderResult<String> {
    let body = send_request(provider, request).await?;
    parse_chat_completion(provider, &body)
}
