//! OpenAI-compatible chat completion client
//!
//! Implements `LanguageModel` by calling `/chat/completions` on any
//! OpenAI-compatible endpoint (OpenAI, Ollama, vLLM, LM Studio, etc.).

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LlmSettings;
use crate::error::{Error, Result};
use crate::version;

use super::{ChatMessage, Completion, CompletionRequest, FinishReason, LanguageModel, TokenUsage};

// ─────────────────────────────────────────────────────────────────
// OpenAI API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "no_stop")]
    stop: &'a [String],
}

fn no_stop(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────

/// Chat completion client for OpenAI-compatible APIs
pub struct OpenAiChat {
    settings: LlmSettings,
    client: Client,
    total_requests: RwLock<u64>,
    total_usage: RwLock<TokenUsage>,
}

impl OpenAiChat {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(version::build_info().user_agent())
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %settings.base_url,
            model = %settings.model,
            "Language model client created"
        );

        Ok(Self {
            settings,
            client,
            total_requests: RwLock::new(0),
            total_usage: RwLock::new(TokenUsage::default()),
        })
    }

    /// Build the authorization header value (if API key is set)
    fn auth_header(&self) -> Option<String> {
        if self.settings.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.settings.api_key))
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    /// Number of successful requests made so far
    pub fn request_count(&self) -> u64 {
        *self.total_requests.read()
    }

    /// Send one request; no retries
    async fn send_once(&self, url: &str, body: &ChatCompletionRequest<'_>) -> Result<Completion> {
        let mut req = self.client.post(url).json(body);
        if let Some(ref auth) = self.auth_header() {
            req = req.header("Authorization", auth);
        }

        let response = req.send().await.map_err(|e| Error::from_http(url, e))?;
        let status = response.status();

        if status.as_u16() == 429 {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::RateLimited { url: url.to_string(), message });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api { status: status.as_u16(), message });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::MalformedResponse("No choices in API response".to_string()))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
            usage,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.settings.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let model = request.model.as_deref().unwrap_or(&self.settings.model);
        let body = ChatCompletionRequest {
            model,
            messages: &request.messages,
            temperature: request.temperature.or(Some(self.settings.temperature)),
            max_tokens: request.max_tokens.or(self.settings.max_tokens),
            stop: &request.stop,
        };

        let url = self.endpoint();
        let mut attempt = 0;

        loop {
            match self.send_once(&url, &body).await {
                Ok(completion) => {
                    *self.total_requests.write() += 1;
                    self.total_usage.write().add(completion.usage);
                    debug!(
                        model = %model,
                        prompt_tokens = completion.usage.prompt_tokens,
                        completion_tokens = completion.usage.completion_tokens,
                        "Completion received"
                    );
                    return Ok(completion);
                }
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    let backoff = backoff_delay(attempt);
                    warn!(attempt, ?backoff, error = %e, "Retryable API error");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn usage(&self) -> TokenUsage {
        *self.total_usage.read()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

/// Exponential backoff from 500ms, capped at 30s
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(500u64.saturating_mul(factor).min(30_000))
}
