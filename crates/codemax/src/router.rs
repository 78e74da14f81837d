//! Cloud vs. local backend selection behind one streaming entry point

use crate::config::{ProviderConfig, SYSTEM_INSTRUCTION};
use anyhow::Result;
use llm::factory::{create_backend, BackendConfig, BackendProtocol};
use llm::{ChatBackend, ChatRequest, Message, OllamaClient, TranscriptCallback};
use tracing::{debug, error, info, warn};

/// Text of the model turn appended when a turn fails for any reason
pub const FAILURE_MESSAGE: &str = "System execution failure. Check model connectivity.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Cloud,
    Local,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Cloud => write!(f, "cloud"),
            BackendKind::Local => write!(f, "local"),
        }
    }
}

/// Result of the last capability probe against the local daemon
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalModels {
    names: Vec<String>,
    available: bool,
}

impl LocalModels {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            available: true,
        }
    }

    /// Probe failed or never ran
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn contains(&self, model: &str) -> bool {
        self.names.iter().any(|name| name == model)
    }
}

/// Local if the daemon reported `model`, cloud otherwise
pub fn select_backend(model: &str, local_models: &LocalModels) -> BackendKind {
    if local_models.contains(model) {
        BackendKind::Local
    } else {
        BackendKind::Cloud
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Final transcript
    Completed(String),
    /// Any failure; details are logged
    Failed,
}

pub struct ProviderRouter {
    local_models: LocalModels,
}

impl Default for ProviderRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self {
            local_models: LocalModels::unavailable(),
        }
    }

    pub fn local_models(&self) -> &LocalModels {
        &self.local_models
    }

    /// Ask the local daemon which models it serves. Failure is not an error:
    /// routing then falls back to the cloud for every model.
    pub async fn probe(&mut self, config: &ProviderConfig) -> &LocalModels {
        let client = OllamaClient::new(config.local_url.clone());
        self.local_models = match client.list_models().await {
            Ok(names) => {
                info!(
                    "Local daemon at {} serves {} models",
                    client.base_url(),
                    names.len()
                );
                LocalModels::new(names)
            }
            Err(e) => {
                warn!("Local daemon at {} is unavailable: {}", client.base_url(), e);
                LocalModels::unavailable()
            }
        };
        &self.local_models
    }

    pub fn select(&self, model: &str) -> BackendKind {
        select_backend(model, &self.local_models)
    }

    /// Build the backend for `kind`. Missing credentials fail here, before any
    /// network traffic.
    pub fn backend_for(
        &self,
        config: &ProviderConfig,
        kind: BackendKind,
    ) -> Result<Box<dyn ChatBackend>> {
        let backend_config = match kind {
            BackendKind::Local if !config.local_is_cloud() => BackendConfig {
                protocol: BackendProtocol::Ndjson,
                base_url: config.local_url.clone(),
                api_key: None,
                accumulation: config.accumulation_mode(),
            },
            _ => BackendConfig {
                protocol: config.cloud_protocol,
                base_url: config.cloud_url.clone(),
                api_key: Some(config.api_key()?.to_string()),
                accumulation: config.accumulation_mode(),
            },
        };
        debug!(
            "Using {:?} backend at {}",
            backend_config.protocol, backend_config.base_url
        );
        create_backend(backend_config)
    }

    /// Stream one model turn. Every failure is logged and collapsed into
    /// [`TurnOutcome::Failed`]; text already published through `on_update`
    /// is left to the caller.
    pub async fn stream_chat(
        &self,
        config: &ProviderConfig,
        history: Vec<Message>,
        model: &str,
        on_update: &mut TranscriptCallback<'_>,
    ) -> TurnOutcome {
        let kind = self.select(model);
        info!("Routing model '{}' to the {} backend", model, kind);

        match self
            .try_stream_chat(config, kind, history, model, on_update)
            .await
        {
            Ok(text) => TurnOutcome::Completed(text),
            Err(e) => {
                error!("Chat turn with model '{}' failed: {:#}", model, e);
                TurnOutcome::Failed
            }
        }
    }

    async fn try_stream_chat(
        &self,
        config: &ProviderConfig,
        kind: BackendKind,
        history: Vec<Message>,
        model: &str,
        on_update: &mut TranscriptCallback<'_>,
    ) -> Result<String> {
        let backend = self.backend_for(config, kind)?;
        let request = ChatRequest {
            model: model.to_string(),
            system_prompt: Some(SYSTEM_INSTRUCTION.to_string()),
            messages: history,
        };
        backend.stream_chat(request, on_update).await
    }
}
