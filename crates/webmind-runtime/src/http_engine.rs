//! Engine backed by an OpenAI-compatible HTTP server (llama-server style).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::engine::{
    ChatMessage, EngineHandle, EngineProgress, InferenceEngine, ProgressFn, SamplingParams,
};
use crate::error::EngineError;
use crate::DEFAULT_ENGINE_URL;

/// Health checks made before giving up on an unreachable server.
const DEFAULT_HEALTH_ATTEMPTS: u32 = 20;

/// Engine that talks to an already running inference server.
pub struct OpenAiCompatEngine {
    client: reqwest::Client,
    base_url: String,
    health_attempts: u32,
    poll_interval: Duration,
}

/// OpenAI-compatible chat completion request.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

/// OpenAI-compatible chat completion response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatEngine {
    /// Create an engine for the default URL.
    pub fn new() -> Self {
        Self::with_url(DEFAULT_ENGINE_URL)
    }

    /// Create an engine for a custom URL.
    pub fn with_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            health_attempts: DEFAULT_HEALTH_ATTEMPTS,
            poll_interval: Duration::from_millis(500),
        }
    }

    /// Create an engine for a custom port on localhost.
    pub fn with_port(port: u16) -> Self {
        Self::with_url(format!("http://127.0.0.1:{}", port))
    }

    /// Set how often and how many times readiness is polled.
    pub fn with_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.health_attempts = attempts.max(1);
        self.poll_interval = interval;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the server is running and healthy.
    pub async fn check_health(&self) -> Result<(), EngineError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    EngineError::ServerNotRunning(self.base_url.clone())
                } else {
                    EngineError::Http(e)
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(EngineError::ServerNotRunning(self.base_url.clone()))
        }
    }
}

impl Default for OpenAiCompatEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceEngine for OpenAiCompatEngine {
    async fn create(
        &self,
        backend_id: &str,
        on_progress: ProgressFn,
    ) -> Result<Box<dyn EngineHandle>, EngineError> {
        info!("Waiting for engine at {} to serve {}", self.base_url, backend_id);
        on_progress(EngineProgress::new(0.0, format!("Connecting to {}", self.base_url)));

        let mut attempt = 0;
        loop {
            match self.check_health().await {
                Ok(()) => break,
                Err(EngineError::ServerNotRunning(url)) => {
                    attempt += 1;
                    if attempt >= self.health_attempts {
                        return Err(EngineError::ServerNotRunning(url));
                    }
                    debug!("Engine not ready yet (attempt {})", attempt);
                    on_progress(EngineProgress::new(
                        attempt as f64 / self.health_attempts as f64,
                        "Waiting for engine...",
                    ));
                    sleep(self.poll_interval).await;
                }
                Err(e) => return Err(e),
            }
        }

        on_progress(EngineProgress::new(1.0, "Engine ready"));

        Ok(Box::new(OpenAiCompatHandle {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model: backend_id.to_string(),
        }))
    }
}

/// Handle for one model served by an OpenAI-compatible server.
pub struct OpenAiCompatHandle {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[async_trait]
impl EngineHandle for OpenAiCompatHandle {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<String, EngineError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream: false,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    EngineError::ServerNotRunning(self.base_url.clone())
                } else {
                    EngineError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::Api(format!("{}: {}", status, text)));
        }

        let completion: ChatCompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| EngineError::Api("No completion returned".to_string()))
    }

    async fn unload(&mut self) -> Result<(), EngineError> {
        // The server owns the weights; dropping the handle is enough.
        debug!("Releasing handle for {}", self.model);
        Ok(())
    }
}
