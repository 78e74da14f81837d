use base64::engine::{general_purpose, Engine};
use serde::{Deserialize, Serialize};

/// One turn in the conversation
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: MessageRole,
    pub parts: Vec<Part>,
    /// Concrete model that produced this turn (model turns only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Model,
}

impl MessageRole {
    /// Role name used by both chat completion wire formats
    pub fn wire_name(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Model => "assistant",
        }
    }
}

/// Content part of a turn. Serializes as `{"text": ..}` or `{"inlineData": {..}}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(InlineData),
}

/// Base64 encoded binary attachment
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub data: String,
    pub mime_type: String,
}

impl InlineData {
    /// Encode raw bytes as an attachment
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            data: general_purpose::STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

impl Message {
    pub fn user(text: impl Into<String>, attachment: Option<InlineData>) -> Self {
        let mut parts = vec![Part::Text(text.into())];
        if let Some(data) = attachment {
            parts.push(Part::InlineData(data));
        }
        Self {
            role: MessageRole::User,
            parts,
            model_name: None,
        }
    }

    pub fn model(text: impl Into<String>, model_name: Option<String>) -> Self {
        Self {
            role: MessageRole::Model,
            parts: vec![Part::Text(text.into())],
            model_name,
        }
    }

    /// All text parts joined with newlines, as sent over the wire
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                Part::InlineData(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn attachments(&self) -> impl Iterator<Item = &InlineData> {
        self.parts.iter().filter_map(|part| match part {
            Part::InlineData(data) => Some(data),
            Part::Text(_) => None,
        })
    }

    /// Replace the text of the first text part, creating one if missing
    pub fn set_text(&mut self, text: &str) {
        for part in &mut self.parts {
            if let Part::Text(existing) = part {
                existing.clear();
                existing.push_str(text);
                return;
            }
        }
        self.parts.insert(0, Part::Text(text.to_string()));
    }
}

/// Request handed to a chat backend
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<Message>,
}

/// Common error types for all chat backends
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Errors raised while consuming a response stream
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Backend reported an error: {0}")]
    Backend(String),

    #[error("Stream callback failed: {0}")]
    Callback(String),
}
