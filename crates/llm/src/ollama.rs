use crate::accumulator::AccumulationMode;
use crate::decoder::StreamDecoder;
use crate::streaming::{process_stream, HttpChunkStream};
use crate::{types::*, utils, ChatBackend, TranscriptCallback};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelTag {
    name: String,
}

/// Client for the `/api/chat` NDJSON protocol, used both for a local daemon
/// and for the hosted cloud endpoint (which additionally needs a bearer key)
pub struct OllamaClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    mode: AccumulationMode,
}

impl OllamaClient {
    pub fn default_base_url() -> String {
        "http://localhost:11434".to_string()
    }

    pub fn cloud_base_url() -> String {
        "https://ollama.com".to_string()
    }

    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            mode: AccumulationMode::Append,
        }
    }

    /// Send `Authorization: Bearer <key>` with every request
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// For deployments that stream the full text on every line
    pub fn with_accumulation_mode(mut self, mode: AccumulationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }

    fn convert_message(message: &Message) -> OllamaMessage {
        let images: Vec<String> = message
            .attachments()
            .map(|attachment| attachment.data.clone())
            .collect();

        OllamaMessage {
            role: message.role.wire_name().to_string(),
            content: message.text(),
            images: if images.is_empty() {
                None
            } else {
                Some(images)
            },
        }
    }

    fn build_request(request: &ChatRequest) -> OllamaRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system_prompt) = &request.system_prompt {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system_prompt.clone(),
                images: None,
            });
        }
        messages.extend(request.messages.iter().map(Self::convert_message));

        OllamaRequest {
            model: request.model.clone(),
            messages,
            stream: true,
        }
    }

    /// List the model names this endpoint can serve (`GET /api/tags`)
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let mut request_builder = self.client.get(self.tags_url());
        if let Some(api_key) = &self.api_key {
            request_builder = request_builder.bearer_auth(api_key);
        }

        let response = request_builder
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;
        let response = utils::check_response_error(response).await?;

        let tags: OllamaTags = response
            .json()
            .await
            .map_err(|e| ApiError::Unknown(format!("Failed to parse model list: {e}")))?;

        Ok(tags.models.into_iter().map(|model| model.name).collect())
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    fn accumulation_mode(&self) -> AccumulationMode {
        self.mode
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
        on_update: &mut TranscriptCallback<'_>,
    ) -> Result<String> {
        let ollama_request = Self::build_request(&request);
        debug!(
            "Sending request to {} for model '{}' with {} messages",
            self.chat_url(),
            ollama_request.model,
            ollama_request.messages.len()
        );

        let mut request_builder = self.client.post(self.chat_url());
        if let Some(api_key) = &self.api_key {
            request_builder = request_builder.bearer_auth(api_key);
        }

        let response = request_builder
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;
        let response = utils::check_response_error(response).await?;

        let mut stream = HttpChunkStream::new(response);
        process_stream(&mut stream, StreamDecoder::ndjson(), self.mode, on_update).await
    }
}
