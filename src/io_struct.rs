use crate::error::RequestError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use serde::Deserialize;
use std::fmt::{Display, Formatter};

/// Largest accepted image attachment, in bytes
pub const IMAGE_MAX_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name used by chat-completions style providers
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Human-readable label used when flattening history into one prompt
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new() -> Self {
        let mut rng = rand::rng();
        let mut bytes = [0u8; 12];
        rng.fill_bytes(&mut bytes);
        let hex_string: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        Self(format!("msg_{}", hex_string))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One turn in a conversation. Appending a message whose id already exists
/// in the session replaces the stored copy instead of duplicating it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub image: Option<ImagePayload>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            id: MessageId::new(),
            role,
            content: content.into(),
            image: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Message::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::new(Role::Assistant, content)
    }

    pub fn with_image(mut self, image: Option<ImagePayload>) -> Self {
        self.image = image;
        self
    }
}

/// Decoded binary image attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub data: Vec<u8>,
    pub mime: String,
}

impl ImagePayload {
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.to_base64())
    }
}

/// Base64 image attachment as it arrives in a JSON request body
#[derive(Debug, Clone, Deserialize)]
pub struct ImageInput {
    pub data: String,
    pub mime: String,
}

impl ImageInput {
    pub fn decode(self) -> Result<ImagePayload, RequestError> {
        let data = BASE64
            .decode(self.data.as_bytes())
            .map_err(|e| RequestError::MalformedPayload {
                reason: format!("invalid base64 image: {}", e),
            })?;
        if data.len() > IMAGE_MAX_BYTES {
            return Err(RequestError::ImageTooLarge {
                limit: IMAGE_MAX_BYTES,
            });
        }
        Ok(ImagePayload {
            data,
            mime: self.mime,
        })
    }
}

/// JSON body of `POST /chat`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatReqInput {
    pub message: Option<String>,
    pub session_id: Option<String>,
    pub model: Option<String>,
    pub image: Option<ImageInput>,
}

impl ChatReqInput {
    pub fn into_turn(self) -> Result<ChatTurn, RequestError> {
        Ok(ChatTurn {
            message: self.message,
            session_id: self.session_id,
            model: self.model,
            image: self.image.map(ImageInput::decode).transpose()?,
        })
    }
}

/// Normalized chat request, produced from either the JSON or multipart body
#[derive(Debug, Default)]
pub struct ChatTurn {
    pub message: Option<String>,
    pub session_id: Option<String>,
    pub model: Option<String>,
    pub image: Option<ImagePayload>,
}
