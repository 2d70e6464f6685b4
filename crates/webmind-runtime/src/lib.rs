//! Model lifecycle runtime for Webmind.
//!
//! Owns the single resident inference engine handle, persists which model
//! is selected and enabled, and broadcasts lifecycle events to observers.
//!
//! ```text
//! ┌─────────────┐   create/unload   ┌──────────────────┐
//! │  Lifecycle  │ ----------------> │ InferenceEngine  │
//! │   Manager   │ <---------------- │ (HTTP / custom)  │
//! └─────────────┘     progress      └──────────────────┘
//!        │
//!        ├── StateStore (currentModelId, modelEnabled, theme)
//!        └── Observers  (progress, loaded, error)
//! ```

mod config;
mod engine;
mod error;
mod http_engine;
mod lifecycle;
mod observer;
pub mod paths;
mod store;

use std::time::Duration;

pub use config::{RuntimeConfig, RuntimeConfigBuilder};
pub use engine::{
    ChatMessage, EngineHandle, EngineProgress, InferenceEngine, ProgressFn, SamplingParams,
};
pub use error::{EngineError, LifecycleError, StoreError};
pub use http_engine::{OpenAiCompatEngine, OpenAiCompatHandle};
pub use lifecycle::{LifecycleManager, LifecycleSnapshot, RestoreOutcome};
pub use observer::{LifecycleCallbacks, LifecycleEvent, LifecycleObserver, SubscriptionId};
pub use store::{
    read_theme, toggle_theme, write_enabled, JsonFileStore, MemoryStore, PersistedModelState,
    StateStore, ThemeMode, KEY_CURRENT_MODEL, KEY_MODEL_ENABLED, KEY_THEME,
};

/// Default URL of the local OpenAI-compatible engine server.
pub const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:8080";

/// Sampling temperature used for conversations.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Maximum completion length used for conversations.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// How long a single model acquisition may take before it is abandoned.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(600);
