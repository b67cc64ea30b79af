// Brain client - HTTP communication with the Messages API

use super::{BrainConfig, BrainError, BrainInitError, MessageRequest, MessageResponse};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Brain client for LLM inference
#[derive(Clone)]
pub struct Brain {
    config: BrainConfig,
    client: Client,
}

impl Brain {
    /// Create a new Brain instance
    pub fn new(config: BrainConfig) -> Result<Self, BrainInitError> {
        info!(
            endpoint = %config.endpoint,
            model = %config.model,
            timeout_secs = config.request_timeout_secs,
            max_retries = config.max_retries,
            "initializing brain"
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Get model identifier
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Get max output tokens
    pub fn max_output_tokens(&self) -> u32 {
        self.config.max_output_tokens
    }

    /// Get sampling temperature
    pub fn temperature(&self) -> Option<f32> {
        self.config.temperature
    }

    /// Perform inference
    pub async fn infer(&self, request: MessageRequest) -> Result<MessageResponse, BrainError> {
        debug!(
            model = %request.model,
            messages_count = request.messages.len(),
            has_system = request.system.is_some(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            max_tokens = request.max_tokens,
            "starting inference"
        );

        let start = Instant::now();
        let mut retries = 0;
        let max_retries = self.config.max_retries;
        let base_delay = Duration::from_millis(self.config.base_retry_delay_ms);

        loop {
            match self.send_request(&request).await {
                Ok(response) => {
                    let (input_tokens, output_tokens) = response
                        .usage
                        .as_ref()
                        .map(|u| (u.input_tokens, u.output_tokens))
                        .unwrap_or((0, 0));

                    info!(
                        model = %response.model,
                        input_tokens = input_tokens,
                        output_tokens = output_tokens,
                        latency_ms = start.elapsed().as_millis() as u64,
                        retries = retries,
                        content_blocks = response.content.len(),
                        stop_reason = ?response.stop_reason,
                        "inference completed"
                    );
                    return Ok(response);
                }
                Err(e) if !e.is_retryable() => {
                    error!(error = %e, "inference failed");
                    return Err(e);
                }
                Err(e) => {
                    retries += 1;
                    if retries > max_retries {
                        error!(
                            retries = retries,
                            total_latency_ms = start.elapsed().as_millis() as u64,
                            error = %e,
                            "inference failed: exhausted retries"
                        );
                        return Err(BrainError::Exhausted {
                            retries: max_retries,
                            last_error: e.to_string(),
                        });
                    }

                    // Exponential backoff, capped at 30s
                    let multiplier = 2u64.saturating_pow(retries - 1);
                    let delay_ms = (base_delay.as_millis() as u64).saturating_mul(multiplier);
                    let delay = Duration::from_millis(delay_ms.min(30_000));

                    warn!(
                        retry = retries,
                        max_retries = max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "inference failed, retrying"
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn send_request(&self, request: &MessageRequest) -> Result<MessageResponse, BrainError> {
        let url = format!("{}/v1/messages", self.config.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.as_str())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        debug!(status = status.as_u16(), "received HTTP response");

        if status.is_success() {
            let body = response.text().await?;
            let preview: String = body.chars().take(200).collect();
            debug!(response_preview = %preview, "response body received");

            return Ok(serde_json::from_str(&body)?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => BrainError::AuthenticationFailed(body),
            429 => BrainError::RateLimited(body),
            400..=499 => BrainError::InvalidRequest(format!("HTTP {}: {}", status, body)),
            _ => BrainError::ModelError(format!("HTTP {}: {}", status, body)),
        })
    }
}
