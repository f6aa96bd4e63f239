//! Scripted language model for tests
//!
//! Replays canned replies in order and records every request it sees.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::{Completion, CompletionRequest, FinishReason, LanguageModel, TokenUsage};

/// Language model that answers from a fixed script
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
    failures: Vec<(usize, u16)>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
            failures: Vec::new(),
        }
    }

    /// Answer the n-th call (zero-based) with an API error instead of a reply
    pub fn failing_at(mut self, call: usize, status: u16) -> Self {
        self.failures.push((call, status));
        self
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Every message of the n-th request, joined by newlines
    pub fn prompt(&self, n: usize) -> String {
        self.requests.lock()[n]
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push(request);
            requests.len() - 1
        };
        if let Some(&(_, status)) = self.failures.iter().find(|(n, _)| *n == call) {
            return Err(Error::Api { status, message: "scripted failure".to_string() });
        }

        let text = self
            .replies
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Internal("scripted model ran out of replies".to_string()))?;

        Ok(Completion {
            text,
            finish_reason: FinishReason::Stop,
            usage: TokenUsage::new(1, 1),
        })
    }

    fn usage(&self) -> TokenUsage {
        let calls = self.call_count() as u32;
        TokenUsage::new(calls, calls)
    }
}
