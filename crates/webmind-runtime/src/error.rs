//! Error types for lifecycle, engine and storage operations.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by an inference engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Engine returned an error response.
    #[error("API error: {0}")]
    Api(String),

    /// Engine server is not running or not reachable.
    #[error("Engine not running at {0}")]
    ServerNotRunning(String),

    /// Anything else the engine reports.
    #[error("{0}")]
    Other(String),
}

/// Errors from the persisted key-value state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The state file holds something other than a JSON object.
    #[error("State file {0} is not a JSON object")]
    NotAnObject(String),
}

/// Errors from model lifecycle transitions.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Requested model id is not in the registry.
    #[error("Unknown model: {0}")]
    UnknownProfile(String),

    /// Enable requested with nothing ever chosen.
    #[error("No model selected. Please select a model first.")]
    NoModelSelected,

    /// Conversation attempted while disabled or unloaded.
    #[error("Model not loaded or disabled")]
    ModelNotReady,

    /// Another load is still running.
    #[error("A model is already loading")]
    LoadInProgress,

    /// Engine handle creation failed.
    #[error("Failed to load model '{profile_id}': {source}")]
    Acquisition {
        profile_id: String,
        #[source]
        source: EngineError,
    },

    /// Engine handle creation did not finish in time.
    #[error("Timed out after {timeout:?} loading model '{profile_id}'")]
    AcquisitionTimeout {
        profile_id: String,
        timeout: Duration,
    },

    /// The resident handle could not be released.
    #[error("Failed to unload model '{profile_id}': {source}")]
    Release {
        profile_id: String,
        #[source]
        source: EngineError,
    },

    /// The engine failed to produce a completion.
    #[error("Completion failed: {0}")]
    Completion(#[source] EngineError),
}
