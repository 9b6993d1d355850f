use crate::error::{ProviderError, ProviderResult};
use crate::io_struct::{ImagePayload, Message};
use crate::providers::ProviderHandler;
use crate::providers::common::{flatten_prompt, send_request, with_system_prompt};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

const API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent";
const DEFAULT_PERSONA: &str = "You are a helpful AI assistant with image understanding.";
const TEMPERATURE: f64 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 2048;
const TOP_P: f64 = 1.0;

/// Multimodal handler for Gemini 2.0 Flash. The history is flattened into a
/// single prompt; an attached image travels inline as base64.
pub struct GeminiHandler {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl GeminiHandler {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        GeminiHandler { client, api_key }
    }

    fn build_request(messages: &[Message], image: Option<&ImagePayload>) -> Value {
        let prompt = flatten_prompt(&with_system_prompt(messages, DEFAULT_PERSONA));
        let mut parts = vec![json!({ "text": prompt })];
        if let Some(image) = image {
            parts.push(json!({
                "inlineData": {
                    "mimeType": image.mime,
                    "data": image.to_base64(),
                }
            }));
        }
        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
                "topP": TOP_P,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

fn parse_generate_content(provider: &'static str, body: &str) -> ProviderResult<String> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|_| ProviderError::InvalidResponseShape { provider })?;
    let texts: Vec<String> = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if texts.is_empty() {
        return Err(ProviderError::InvalidResponseShape { provider });
    }
    Ok(texts.join(""))
}

#[async_trait]
impl ProviderHandler for GeminiHandler {
    fn name(&self) -> &'static str {
        "gemini"
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
            "gemini: sending {} messages, image: {}",
            messages.len(),
            image.is_some()
        );
        log::debug!("gemini request: {}", request);
        // key travels as a query parameter; keep it out of the logs
        let url = format!("{}?key={}", API_URL, api_key);
        let body = send_request(self.name(), self.client.post(url).json(&request)).await?;
        parse_generate_content(self.name(), &body)
    }
}
