//! Inference engine seam.
//!
//! The engine itself (download, tokenization, execution) is external; the
//! lifecycle manager only creates, uses and releases handles through these
//! traits.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::error::EngineError;
use crate::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

/// Progress report from an engine during handle acquisition.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineProgress {
    /// Completed fraction in `[0, 1]`.
    pub fraction: f64,
    /// Engine-provided status text; may be empty.
    pub text: String,
}

impl EngineProgress {
    pub fn new(fraction: f64, text: impl Into<String>) -> Self {
        Self {
            fraction,
            text: text.into(),
        }
    }
}

/// Callback receiving acquisition progress.
pub type ProgressFn = Arc<dyn Fn(EngineProgress) + Send + Sync>;

/// Chat message in OpenAI format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling settings for a completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Factory for engine handles.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Acquire a handle for `backend_id`, reporting progress as it goes.
    async fn create(
        &self,
        backend_id: &str,
        on_progress: ProgressFn,
    ) -> Result<Box<dyn EngineHandle>, EngineError>;
}

/// A resident model able to produce completions.
#[async_trait]
pub trait EngineHandle: Send + Sync {
    /// Produce a single completion for `messages`.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<String, EngineError>;

    /// Release the model's resources. The handle is dropped afterwards.
    async fn unload(&mut self) -> Result<(), EngineError>;
}
