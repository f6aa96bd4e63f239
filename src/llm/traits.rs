//! Language model trait definitions
//!
//! Defines the `LanguageModel` trait the agent loop talks to, and the
//! chat-shaped request/response types it exchanges.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

// ─────────────────────────────────────────────────────────────────
// Request / Response
// ─────────────────────────────────────────────────────────────────

/// A single completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// Conversation so far
    pub messages: Vec<ChatMessage>,

    /// Model override (None = provider default)
    pub model: Option<String>,

    /// Temperature override (None = provider default)
    pub temperature: Option<f32>,

    /// Completion length limit
    pub max_tokens: Option<u32>,

    /// Sequences that end generation early
    pub stop: Vec<String>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages, ..Default::default() }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }
}

/// Why generation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other,
}

impl FinishReason {
    pub fn from_api(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") | None => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            Some(_) => FinishReason::Other,
        }
    }
}

/// Token accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self { prompt_tokens, completion_tokens }
    }

    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// Result of a completion request
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: TokenUsage,
}

// ─────────────────────────────────────────────────────────────────
// LanguageModel Trait
// ─────────────────────────────────────────────────────────────────

/// A chat-completion capable language model.
///
/// Object-safe so a crew can hold `Arc<dyn LanguageModel>`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider name for logs (e.g., "openai")
    fn name(&self) -> &'static str;

    /// Model used when a request carries no override
    fn default_model(&self) -> &str;

    /// Run one completion
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;

    /// Tokens consumed since construction
    fn usage(&self) -> TokenUsage;
}
