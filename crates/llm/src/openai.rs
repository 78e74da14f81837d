use crate::accumulator::AccumulationMode;
use crate::decoder::StreamDecoder;
use crate::streaming::{process_stream, HttpChunkStream};
use crate::{types::*, utils, ChatBackend, TranscriptCallback};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
pub struct OpenAIChatMessage {
    pub role: String,
    pub content: serde_json::Value,
}

/// Client for the `/chat/completions` SSE protocol
pub struct OpenAIClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAIClient {
    pub fn default_base_url() -> String {
        "https://ollama.com/v1".to_string()
    }

    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn get_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub(crate) fn convert_message(message: &Message) -> OpenAIChatMessage {
        let text = message.text();
        let attachments: Vec<&InlineData> = message.attachments().collect();

        // Single text content uses the simple string format
        let content = if attachments.is_empty() {
            serde_json::json!(text)
        } else {
            let mut content_parts = Vec::new();
            if !text.is_empty() {
                content_parts.push(serde_json::json!({
                    "type": "text",
                    "text": text
                }));
            }
            content_parts.extend(attachments.iter().map(|attachment| {
                serde_json::json!({
                    "type": "image_url",
                    "image_url": { "url": attachment.data_url() }
                })
            }));
            serde_json::json!(content_parts)
        };

        OpenAIChatMessage {
            role: message.role.wire_name().to_string(),
            content,
        }
    }

    fn build_request(request: &ChatRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system_prompt) = &request.system_prompt {
            messages.push(OpenAIChatMessage {
                role: "system".to_string(),
                content: serde_json::json!(system_prompt),
            });
        }
        messages.extend(request.messages.iter().map(Self::convert_message));

        OpenAIRequest {
            model: request.model.clone(),
            messages,
            stream: true,
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAIClient {
    /// Completion deltas are incremental
    fn accumulation_mode(&self) -> AccumulationMode {
        AccumulationMode::Append
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
        on_update: &mut TranscriptCallback<'_>,
    ) -> Result<String> {
        let openai_request = Self::build_request(&request);
        debug!(
            "Sending streaming request to {} for model '{}'",
            self.get_url(),
            openai_request.model
        );

        let response = self
            .client
            .post(self.get_url())
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;
        let response = utils::check_response_error(response).await?;

        let mut stream = HttpChunkStream::new(response);
        process_stream(
            &mut stream,
            StreamDecoder::sse(),
            self.accumulation_mode(),
            on_update,
        )
        .await
    }
}
