//! Error types for request validation and provider calls.
//!
//! `RequestError` covers caller input problems and maps to 400;
//! `ProviderError` covers upstream failures and maps to 500. Both surface
//! as a JSON `{"error": ...}` body.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use std::fmt;

/// Caller input problems, recoverable by adjusting the request
#[derive(Debug)]
pub enum RequestError {
    /// The message field is empty or absent
    EmptyMessage,
    /// The requested model id has no handler
    UnknownModel { model: String },
    /// An image was supplied to a text-only model
    UnsupportedImage { model: String },
    /// The uploaded image exceeds the accepted size
    ImageTooLarge { limit: usize },
    /// The request body could not be decoded
    MalformedPayload { reason: String },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::EmptyMessage => {
                write!(f, "Message is required")
            }
            RequestError::UnknownModel { model } => {
                write!(f, "Invalid model selected: {}", model)
            }
            RequestError::UnsupportedImage { model } => {
                write!(f, "Model {} does not support images", model)
            }
            RequestError::ImageTooLarge { limit } => {
                write!(f, "Image exceeds the {} byte limit", limit)
            }
            RequestError::MalformedPayload { reason } => {
                write!(f, "Malformed request payload: {}", reason)
            }
        }
    }
}

impl std::error::Error for RequestError {}

impl ResponseError for RequestError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Upstream failures, surfaced to the caller unretried
#[derive(Debug)]
pub enum ProviderError {
    /// No credential was configured for the provider
    MissingCredential { provider: &'static str },
    /// The request never produced a response
    Transport { provider: &'static str, error: String },
    /// The provider answered with a non-success status
    UpstreamStatus {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
    /// The response was missing the expected completion field
    InvalidResponseShape { provider: &'static str },
}

impl ProviderError {
    pub fn transport(provider: &'static str, err: reqwest::Error) -> Self {
        ProviderError::Transport {
            provider,
            error: err.to_string(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::MissingCredential { provider } => {
                write!(f, "{}: API key is not configured", provider)
            }
            ProviderError::Transport { provider, error } => {
                write!(f, "{}: request failed: {}", provider, error)
            }
            ProviderError::UpstreamStatus {
                provider,
                status,
                body,
            } => {
                write!(f, "{}: upstream returned {}: {}", provider, status, body)
            }
            ProviderError::InvalidResponseShape { provider } => {
                write!(f, "{}: invalid response format", provider)
            }
        }
    }
}

impl std::error::Error for ProviderError {}

impl ResponseError for ProviderError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Union error returned by dispatch and the HTTP handlers
#[derive(Debug)]
pub enum RelayError {
    Request(RequestError),
    Provider(ProviderError),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Request(err) => err.fmt(f),
            RelayError::Provider(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<RequestError> for RelayError {
    fn from(err: RequestError) -> Self {
        RelayError::Request(err)
    }
}

impl From<ProviderError> for RelayError {
    fn from(err: ProviderError) -> Self {
        RelayError::Provider(err)
    }
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Request(err) => err.status_code(),
            RelayError::Provider(err) => err.status_code(),
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            RelayError::Request(err) => err.error_response(),
            RelayError::Provider(err) => err.error_response(),
        }
    }
}
