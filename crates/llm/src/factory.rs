use crate::accumulator::AccumulationMode;
use crate::{ChatBackend, OllamaClient, OpenAIClient};
use anyhow::{Context, Result};
use clap::ValueEnum;

/// Wire protocol spoken by a chat endpoint
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BackendProtocol {
    /// `POST /api/chat`, newline-delimited JSON
    Ndjson,
    /// `POST /v1/chat/completions`, server-sent events
    Sse,
}

/// Configuration for creating a chat backend
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub protocol: BackendProtocol,
    /// Host root, without the `/api` or `/v1` path
    pub base_url: String,
    pub api_key: Option<String>,
    /// Only honored by NDJSON backends
    pub accumulation: AccumulationMode,
}

pub fn create_backend(config: BackendConfig) -> Result<Box<dyn ChatBackend>> {
    let base_url = config.base_url.trim_end_matches('/').to_string();

    match config.protocol {
        BackendProtocol::Ndjson => {
            let mut client =
                OllamaClient::new(base_url).with_accumulation_mode(config.accumulation);
            if let Some(api_key) = config.api_key {
                client = client.with_api_key(api_key);
            }
            Ok(Box::new(client))
        }
        BackendProtocol::Sse => {
            let api_key = config
                .api_key
                .context("An API key is required for the SSE protocol")?;
            Ok(Box::new(OpenAIClient::new(
                api_key,
                format!("{base_url}/v1"),
            )))
        }
    }
}
