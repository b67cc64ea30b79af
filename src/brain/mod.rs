// Brain module - LLM gateway client (Anthropic Messages API)

pub mod builder;
pub mod client;
pub mod error;
pub mod types;

pub use builder::RequestBuilder;
pub use client::Brain;
pub use error::{BrainError, BrainInitError};
pub use types::{ContentBlock, Message, MessageRequest, MessageResponse, Role, ToolDefinition};

/// Brain configuration
#[derive(Debug, Clone)]
pub struct BrainConfig {
    /// API base URL
    pub endpoint: String,
    /// API key for authentication
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Maximum retry attempts
    pub max_retries: u32,
    /// Base retry delay in milliseconds
    pub base_retry_delay_ms: u64,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Maximum output tokens
    pub max_output_tokens: u32,
    /// Temperature (0.0-1.0, None = use model default)
    pub temperature: Option<f32>,
}

impl BrainConfig {
    pub fn from_env() -> Result<Self, BrainInitError> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| BrainInitError::ConfigMissing("ANTHROPIC_API_KEY".into()))?;

        let endpoint = std::env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com".to_string());

        let model = std::env::var("PILOT_MODEL")
            .unwrap_or_else(|_| "claude-3-5-sonnet-latest".to_string());

        let max_retries = std::env::var("PILOT_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        let base_retry_delay_ms = std::env::var("PILOT_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);

        let request_timeout_secs = std::env::var("PILOT_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        let max_output_tokens = std::env::var("PILOT_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4000);

        let temperature = match std::env::var("PILOT_TEMPERATURE") {
            Ok(v) => v.parse().ok(),
            Err(_) => Some(0.4),
        };

        Ok(Self {
            endpoint,
            api_key,
            model,
            max_retries,
            base_retry_delay_ms,
            request_timeout_secs,
            max_output_tokens,
            temperature,
        })
    }
}
