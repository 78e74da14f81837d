use crate::config::{ProviderConfig, DEFAULT_MODEL};
use clap::Parser;
use llm::factory::BackendProtocol;
use std::path::PathBuf;

/// Define the application arguments
#[derive(Parser, Debug)]
#[command(version, about = "Chat with a code model and preview the HTML it writes", long_about = None)]
pub struct Args {
    /// Send a single prompt and exit instead of starting the REPL
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Catalog alias (e.g. CODEMAX_PRO) or concrete model name
    #[arg(short = 'm', long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the local inference daemon
    #[arg(long, default_value = "http://localhost:11434")]
    pub local_url: String,

    /// Base URL of the hosted cloud endpoint
    #[arg(long, default_value = "https://ollama.com")]
    pub cloud_url: String,

    /// Wire protocol spoken by the cloud endpoint
    #[arg(long, value_enum, default_value = "ndjson")]
    pub cloud_protocol: BackendProtocol,

    /// The NDJSON endpoints stream the full text on every line instead of deltas
    #[arg(long)]
    pub cumulative_stream: bool,

    /// Directory for rendered previews (defaults to the user cache directory)
    #[arg(long)]
    pub preview_dir: Option<PathBuf>,

    /// Open every new preview in the system browser
    #[arg(long)]
    pub open_preview: bool,

    /// Skip probing the local daemon for models at startup
    #[arg(long)]
    pub no_probe: bool,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn parse() -> Self {
        <Args as Parser>::parse()
    }

    /// Combine the arguments with the environment-provided API key
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            local_url: self.local_url.clone(),
            cloud_url: self.cloud_url.clone(),
            cloud_protocol: self.cloud_protocol,
            model: self.model.clone(),
            cumulative_stream: self.cumulative_stream,
            ..ProviderConfig::from_env()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_args_parsing() {
        let args = Args::try_parse_from(["test"]).expect("Failed to parse default args");

        assert_eq!(args.prompt, None);
        assert_eq!(args.model, "CODEMAX_PRO");
        assert_eq!(args.local_url, "http://localhost:11434");
        assert_eq!(args.cloud_url, "https://ollama.com");
        assert_eq!(args.cloud_protocol, BackendProtocol::Ndjson);
        assert_eq!(args.verbose, 0);
        assert!(!args.cumulative_stream);
        assert!(!args.open_preview);
        assert!(!args.no_probe);
    }

    #[test]
    fn test_verbose_flag_counting() {
        let args = Args::try_parse_from(["test", "-vv"]).expect("Failed to parse verbose args");
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_one_shot_with_sse_cloud() {
        let args = Args::try_parse_from([
            "test",
            "--prompt",
            "a snake game",
            "--cloud-protocol",
            "sse",
            "--model",
            "llama3:8b",
            "--cumulative-stream",
        ])
        .expect("Failed to parse args");

        assert_eq!(args.prompt.as_deref(), Some("a snake game"));
        assert_eq!(args.cloud_protocol, BackendProtocol::Sse);

        let config = args.provider_config();
        assert_eq!(config.model, "llama3:8b");
        assert!(config.cumulative_stream);
        assert_eq!(config.cloud_protocol, BackendProtocol::Sse);
    }

    #[test]
    fn test_invalid_protocol_rejected() {
        assert!(Args::try_parse_from(["test", "--cloud-protocol", "grpc"]).is_err());
    }
}
