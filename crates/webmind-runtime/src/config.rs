//! Runtime configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::engine::SamplingParams;
use crate::paths;
use crate::{DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_ENGINE_URL, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

/// Configuration for the lifecycle manager and its collaborators.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Base URL of the OpenAI-compatible engine server
    pub engine_url: String,
    /// Where persisted state lives
    pub state_file: PathBuf,
    /// Upper bound on engine handle acquisition (download + init)
    pub acquire_timeout: Duration,
    /// Sampling temperature for conversations
    pub temperature: f32,
    /// Maximum completion length
    pub max_tokens: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            state_file: paths::state_file(),
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl RuntimeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let engine_url = std::env::var("WEBMIND_ENGINE_URL").unwrap_or(defaults.engine_url);

        let state_file = std::env::var("WEBMIND_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.state_file);

        let acquire_timeout = std::env::var("WEBMIND_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.acquire_timeout);

        let temperature = std::env::var("WEBMIND_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.temperature);

        let max_tokens = std::env::var("WEBMIND_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_tokens);

        Self {
            engine_url,
            state_file,
            acquire_timeout,
            temperature,
            max_tokens,
        }
    }

    /// Sampling parameters for conversations.
    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }
}

/// Builder for runtime configuration.
#[derive(Debug, Default)]
pub struct RuntimeConfigBuilder {
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder {
    pub fn engine_url(mut self, url: impl Into<String>) -> Self {
        self.config.engine_url = url.into();
        self
    }

    pub fn state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.state_file = path.into();
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire_timeout = timeout;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = tokens;
        self
    }

    pub fn build(self) -> RuntimeConfig {
        self.config
    }
}
