use llm::factory::BackendProtocol;
use llm::{AccumulationMode, OllamaClient};

/// Environment variable holding the cloud API key
pub const API_KEY_ENV: &str = "OLLAMA_API_KEY";

/// Prepended as a `system` message to every chat request
pub const SYSTEM_INSTRUCTION: &str = "You are the Elite CodeMax Software Architect. \
Your output must consist ONLY of the requested source code. \
DO NOT provide any reasoning, explanations, conversational filler, or introductions. \
Return complete, production-ready, standalone HTML files including all necessary CSS and JavaScript. \
Never truncate code. Never hesitate. Never ask follow-up questions. \
If the user provides a prompt, translate it directly into the most efficient and visually stunning code possible. \
YOUR OUTPUT IS THE RAW SOURCE CODE ONLY.";

pub const DEFAULT_MODEL: &str = "CODEMAX_PRO";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No cloud API key configured (set OLLAMA_API_KEY)")]
    MissingApiKey,
}

/// A display alias offered in the model menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelAlias {
    pub id: &'static str,
    pub model: &'static str,
}

impl ModelAlias {
    /// Menu label, e.g. `CODEMAX PRO`
    pub fn label(&self) -> String {
        self.id.replacen('_', " ", 1)
    }
}

pub const MODEL_CATALOG: &[ModelAlias] = &[
    ModelAlias {
        id: "CODEMAX_13",
        model: "gpt-oss:120b-cloud",
    },
    ModelAlias {
        id: "CODEMAX_PRO",
        model: "gpt-oss:120b-cloud",
    },
    ModelAlias {
        id: "CODEMAX_BETA",
        model: "gpt-oss:120b-cloud",
    },
    ModelAlias {
        id: "POLYAMA_CLOUD",
        model: "gpt-oss:120b-cloud",
    },
    ModelAlias {
        id: "GEMMA_3",
        model: "gpt-oss:120b-cloud",
    },
];

/// Map a catalog alias (case-insensitive) to its concrete model name.
/// Anything else, such as a locally discovered model, is returned unchanged.
pub fn resolve_model(id: &str) -> String {
    MODEL_CATALOG
        .iter()
        .find(|alias| alias.id.eq_ignore_ascii_case(id))
        .map(|alias| alias.model.to_string())
        .unwrap_or_else(|| id.to_string())
}

/// Endpoints, credentials and model selection. Read on every send.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub local_url: String,
    pub cloud_url: String,
    pub cloud_protocol: BackendProtocol,
    pub api_key: Option<String>,
    /// Catalog alias or concrete model name
    pub model: String,
    /// The NDJSON endpoints stream the full text on every line
    pub cumulative_stream: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            local_url: OllamaClient::default_base_url(),
            cloud_url: OllamaClient::cloud_base_url(),
            cloud_protocol: BackendProtocol::Ndjson,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            cumulative_stream: false,
        }
    }
}

impl ProviderConfig {
    /// Defaults plus the API key from the environment (`.env` is loaded first)
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            api_key: normalize_api_key(std::env::var(API_KEY_ENV).ok()),
            ..Self::default()
        }
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    /// Whether the "local" URL actually points at the cloud host
    pub fn local_is_cloud(&self) -> bool {
        self.local_url.trim_end_matches('/') == self.cloud_url.trim_end_matches('/')
    }

    pub fn accumulation_mode(&self) -> AccumulationMode {
        if self.cumulative_stream {
            AccumulationMode::Replace
        } else {
            AccumulationMode::Append
        }
    }
}

/// Trimmed key, with an empty value treated as missing
pub fn normalize_api_key(raw: Option<String>) -> Option<String> {
    raw.map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}
