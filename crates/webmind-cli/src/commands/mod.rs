//! CLI commands.

pub mod detect;
pub mod lifecycle;
pub mod models;
pub mod serve;
pub mod state;

use std::sync::Arc;

use webmind_models::ModelRegistry;
use webmind_runtime::{JsonFileStore, LifecycleManager, OpenAiCompatEngine, RuntimeConfig};

/// Store at the configured state file.
pub(crate) fn open_store(config: &RuntimeConfig) -> Arc<JsonFileStore> {
    Arc::new(JsonFileStore::new(&config.state_file))
}

/// Lifecycle manager over the configured engine server and state file.
pub(crate) fn open_manager(config: RuntimeConfig) -> Arc<LifecycleManager> {
    let engine = Arc::new(OpenAiCompatEngine::with_url(&config.engine_url));
    let store = open_store(&config);
    Arc::new(LifecycleManager::new(
        ModelRegistry::builtin(),
        engine,
        store,
        config,
    ))
}
