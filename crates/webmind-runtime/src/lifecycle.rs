//! Model lifecycle manager.
//!
//! Single owner of the engine handle. At most one handle is resident at a
//! time, and a new profile is only acquired after the previous handle has
//! been fully released.
//!
//! ```text
//!          load            acquired
//!  Idle ─────────> Loading ─────────> Ready (enabled) <──┐
//!   ^                 │                   │ toggle       │ toggle
//!   │     failure     │                   v              │
//!   └─────────────────┘              Ready (disabled) ───┘
//!   ^                                     │
//!   └──────────────── unload ─────────────┘
//! ```

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use webmind_models::{ModelProfile, ModelRegistry};

use crate::config::RuntimeConfig;
use crate::engine::{ChatMessage, EngineHandle, EngineProgress, InferenceEngine, ProgressFn};
use crate::error::LifecycleError;
use crate::observer::{
    LifecycleCallbacks, LifecycleEvent, LifecycleObserver, Observers, SubscriptionId,
};
use crate::store::{write_enabled, PersistedModelState, StateStore};

/// Immutable copy of the lifecycle state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleSnapshot {
    #[serde(rename = "currentModelId")]
    pub active_profile_id: Option<String>,
    pub is_loading: bool,
    #[serde(rename = "loadingProgress")]
    pub load_progress_percent: f64,
    pub is_enabled: bool,
    /// Whether an engine handle is currently held.
    pub is_resident: bool,
}

/// Result of trying to bring back the persisted model at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing was persisted as enabled.
    Skipped,
    Restored(String),
    /// Re-acquisition failed; the model stays disabled.
    Failed(String),
}

/// Owns the resident model and drives load/unload/enable transitions.
pub struct LifecycleManager {
    registry: ModelRegistry,
    engine: Arc<dyn InferenceEngine>,
    store: Arc<dyn StateStore>,
    config: RuntimeConfig,
    state: Arc<Mutex<LifecycleSnapshot>>,
    handle: tokio::sync::Mutex<Option<Box<dyn EngineHandle>>>,
    observers: Arc<Observers>,
}

impl LifecycleManager {
    pub fn new(
        registry: ModelRegistry,
        engine: Arc<dyn InferenceEngine>,
        store: Arc<dyn StateStore>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            registry,
            engine,
            store,
            config,
            state: Arc::new(Mutex::new(LifecycleSnapshot::default())),
            handle: tokio::sync::Mutex::new(None),
            observers: Arc::new(Observers::default()),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> LifecycleSnapshot {
        self.lock_state().clone()
    }

    pub fn is_model_loaded(&self) -> bool {
        let state = self.lock_state();
        state.is_resident && state.active_profile_id.is_some()
    }

    pub fn is_model_enabled(&self) -> bool {
        self.lock_state().is_enabled
    }

    /// Add an independent subscriber.
    pub fn subscribe(&self, observer: Arc<dyn LifecycleObserver>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Register per-kind callbacks. Kinds present in `callbacks` replace
    /// the previously registered handler for that kind.
    pub fn set_observers(&self, callbacks: LifecycleCallbacks) {
        self.observers.set_callbacks(callbacks);
    }

    /// Make `profile_id` the resident, enabled model.
    ///
    /// Rejects the call while another load is running.
    pub async fn load(&self, profile_id: &str) -> Result<(), LifecycleError> {
        let profile = self
            .registry
            .get(profile_id)
            .cloned()
            .ok_or_else(|| LifecycleError::UnknownProfile(profile_id.to_string()))?;

        // Enabled flag and progress to put back if the previous handle
        // cannot be released. `None` when the profile is already resident.
        let previous = {
            let mut state = self.lock_state();
            if state.is_loading {
                return Err(LifecycleError::LoadInProgress);
            }

            if state.is_resident && state.active_profile_id.as_deref() == Some(profile_id) {
                state.is_enabled = true;
                None
            } else {
                let previous = (state.is_enabled, state.load_progress_percent);
                state.is_loading = true;
                state.load_progress_percent = 0.0;
                Some(previous)
            }
        };

        let Some((was_enabled, previous_progress)) = previous else {
            info!("Model already loaded, enabling it: {}", profile_id);
            self.persist_enabled(true).await;
            self.observers.emit(&LifecycleEvent::Loaded {
                profile_id: profile_id.to_string(),
            });
            return Ok(());
        };

        match self.swap_handle(&profile).await {
            Ok(()) => {
                self.persist(PersistedModelState {
                    current_model_id: Some(profile.id.to_string()),
                    model_enabled: true,
                })
                .await;

                info!("Model loaded successfully: {}", profile.display_name);
                self.observers.emit(&LifecycleEvent::Loaded {
                    profile_id: profile.id.to_string(),
                });
                Ok(())
            }
            Err(e) => {
                {
                    let mut state = self.lock_state();
                    state.is_loading = false;
                    if matches!(e, LifecycleError::Release { .. }) {
                        // The previous model is still resident and untouched.
                        state.is_enabled = was_enabled;
                        state.load_progress_percent = previous_progress;
                    } else {
                        state.is_enabled = false;
                    }
                }

                error!("Model load failed: {}", e);
                self.observers.emit(&LifecycleEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Release the previous handle, then acquire one for `profile`.
    async fn swap_handle(&self, profile: &ModelProfile) -> Result<(), LifecycleError> {
        let mut slot = self.handle.lock().await;

        if let Some(mut previous) = slot.take() {
            let previous_id = self.lock_state().active_profile_id.clone().unwrap_or_default();
            info!("Unloading previous model {}", previous_id);

            if let Err(source) = previous.unload().await {
                // Still resident; keep owning it.
                *slot = Some(previous);
                return Err(LifecycleError::Release {
                    profile_id: previous_id,
                    source,
                });
            }
            self.lock_state().is_resident = false;
        }

        info!("Loading model: {}", profile.display_name);

        let gate = ProgressGate::new(Arc::clone(&self.state), Arc::clone(&self.observers));
        let on_progress = gate.reporter(profile.display_name);
        let acquired = timeout(
            self.config.acquire_timeout,
            self.engine.create(profile.backend_id, on_progress),
        )
        .await;
        gate.close();

        let handle = match acquired {
            Ok(Ok(handle)) => handle,
            Ok(Err(source)) => {
                return Err(LifecycleError::Acquisition {
                    profile_id: profile.id.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(LifecycleError::AcquisitionTimeout {
                    profile_id: profile.id.to_string(),
                    timeout: self.config.acquire_timeout,
                })
            }
        };

        *slot = Some(handle);

        let mut state = self.lock_state();
        state.active_profile_id = Some(profile.id.to_string());
        state.is_resident = true;
        state.is_enabled = true;
        state.is_loading = false;
        state.load_progress_percent = 100.0;
        Ok(())
    }

    /// Release the resident model and clear the selection.
    ///
    /// No-op when nothing is resident.
    pub async fn unload(&self) -> Result<(), LifecycleError> {
        self.ensure_idle()?;

        let mut slot = self.handle.lock().await;
        let Some(mut handle) = slot.take() else {
            debug!("Unload requested with no resident model");
            return Ok(());
        };

        let profile_id = self.lock_state().active_profile_id.clone().unwrap_or_default();
        info!("Unloading model {}", profile_id);

        if let Err(source) = handle.unload().await {
            *slot = Some(handle);
            error!("Error unloading model {}: {}", profile_id, source);
            return Err(LifecycleError::Release { profile_id, source });
        }
        drop(slot);

        {
            let mut state = self.lock_state();
            state.active_profile_id = None;
            state.is_resident = false;
            state.is_enabled = false;
            state.load_progress_percent = 0.0;
        }

        self.persist(PersistedModelState::default()).await;
        info!("Model unloaded successfully");
        Ok(())
    }

    /// Flip whether the model may serve requests.
    ///
    /// Disabling keeps the handle resident. Enabling loads the selected (or
    /// persisted) profile when it is not resident. Returns the new enabled
    /// state.
    pub async fn toggle_enabled(&self) -> Result<bool, LifecycleError> {
        enum Next {
            Disabled,
            Enabled,
            Load(String),
            LoadPersisted,
        }

        let next = {
            let mut state = self.lock_state();
            if state.is_loading {
                return Err(LifecycleError::LoadInProgress);
            }

            if state.is_enabled {
                state.is_enabled = false;
                Next::Disabled
            } else {
                match (state.active_profile_id.clone(), state.is_resident) {
                    (None, _) => Next::LoadPersisted,
                    (Some(id), false) => Next::Load(id),
                    (Some(_), true) => {
                        state.is_enabled = true;
                        Next::Enabled
                    }
                }
            }
        };

        match next {
            Next::Disabled => {
                info!("Disabling model (keeping in memory)");
                self.persist_enabled(false).await;
                Ok(false)
            }
            Next::Enabled => {
                info!("Model already loaded, enabling");
                self.persist_enabled(true).await;
                Ok(true)
            }
            Next::Load(id) => {
                info!("Loading selected model: {}", id);
                self.load(&id).await.map(|()| true)
            }
            Next::LoadPersisted => {
                let persisted = match PersistedModelState::read(self.store.as_ref()).await {
                    Ok(persisted) => persisted,
                    Err(e) => {
                        warn!("Could not read persisted model state: {}", e);
                        PersistedModelState::default()
                    }
                };

                match persisted.current_model_id {
                    Some(id) => {
                        info!("Loading persisted model: {}", id);
                        self.load(&id).await.map(|()| true)
                    }
                    None => Err(LifecycleError::NoModelSelected),
                }
            }
        }
    }

    /// Send one user message to the resident model.
    pub async fn converse(&self, message: &str) -> Result<String, LifecycleError> {
        if !self.is_ready() {
            return Err(LifecycleError::ModelNotReady);
        }

        let slot = self.handle.lock().await;
        // Re-check: a transition may have finished while waiting for the slot.
        let handle = match slot.as_ref() {
            Some(handle) if self.is_ready() => handle,
            _ => return Err(LifecycleError::ModelNotReady),
        };

        let messages = [ChatMessage::user(message)];
        handle
            .complete(&messages, &self.config.sampling())
            .await
            .map_err(|e| {
                error!("Chat error: {}", e);
                LifecycleError::Completion(e)
            })
    }

    /// Re-acquire the persisted model at startup.
    ///
    /// Failures are logged and broadcast; they never propagate.
    pub async fn restore(&self) -> RestoreOutcome {
        let persisted = match PersistedModelState::read(self.store.as_ref()).await {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("Could not read persisted model state: {}", e);
                return RestoreOutcome::Skipped;
            }
        };

        let Some(profile_id) = persisted.should_restore() else {
            debug!("No enabled model to restore");
            return RestoreOutcome::Skipped;
        };

        info!("Restoring model: {}", profile_id);
        match self.load(profile_id).await {
            Ok(()) => RestoreOutcome::Restored(profile_id.to_string()),
            Err(e) => {
                error!("Failed to restore model: {}", e);
                if matches!(e, LifecycleError::UnknownProfile(_) | LifecycleError::LoadInProgress) {
                    // load() only broadcasts acquisition failures.
                    self.observers.emit(&LifecycleEvent::Error {
                        message: e.to_string(),
                    });
                }
                RestoreOutcome::Failed(e.to_string())
            }
        }
    }

    /// Release the handle at process teardown. Persisted state is left as is
    /// so the next start can restore it.
    pub async fn shutdown(&self) {
        let mut slot = self.handle.lock().await;
        if let Some(mut handle) = slot.take() {
            if let Err(e) = handle.unload().await {
                warn!("Error releasing model during shutdown: {}", e);
            }
            let mut state = self.lock_state();
            state.is_resident = false;
            state.is_enabled = false;
        }
    }

    fn is_ready(&self) -> bool {
        let state = self.lock_state();
        state.is_resident && state.is_enabled && !state.is_loading
    }

    fn ensure_idle(&self) -> Result<(), LifecycleError> {
        if self.lock_state().is_loading {
            Err(LifecycleError::LoadInProgress)
        } else {
            Ok(())
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LifecycleSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn persist(&self, persisted: PersistedModelState) {
        if let Err(e) = persisted.write(self.store.as_ref()).await {
            warn!("Failed to persist model state: {}", e);
        }
    }

    async fn persist_enabled(&self, enabled: bool) {
        if let Err(e) = write_enabled(self.store.as_ref(), enabled).await {
            warn!("Failed to persist enabled flag: {}", e);
        }
    }
}

/// Turns engine progress into non-decreasing percentages for one load.
///
/// Reports arriving after the gate is closed are dropped.
struct ProgressGate {
    inner: Arc<Mutex<GateState>>,
    state: Arc<Mutex<LifecycleSnapshot>>,
    observers: Arc<Observers>,
}

struct GateState {
    last_percent: f64,
    open: bool,
}

impl ProgressGate {
    fn new(state: Arc<Mutex<LifecycleSnapshot>>, observers: Arc<Observers>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GateState {
                last_percent: 0.0,
                open: true,
            })),
            state,
            observers,
        }
    }

    fn reporter(&self, display_name: &'static str) -> ProgressFn {
        let inner = Arc::clone(&self.inner);
        let state = Arc::clone(&self.state);
        let observers = Arc::clone(&self.observers);

        Arc::new(move |progress: EngineProgress| {
            // Held while emitting so concurrent reports stay ordered.
            let mut gate = inner.lock().unwrap_or_else(PoisonError::into_inner);
            if !gate.open {
                return;
            }

            let percent = (progress.fraction * 100.0)
                .clamp(0.0, 100.0)
                .max(gate.last_percent);
            gate.last_percent = percent;

            state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .load_progress_percent = percent;

            let message = if progress.text.is_empty() {
                format!("Loading {}...", display_name)
            } else {
                progress.text
            };
            debug!("Model loading: {:.0}% - {}", percent, message);
            observers.emit(&LifecycleEvent::Progress { percent, message });
        })
    }

    fn close(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counters {
        created: usize,
        resident: usize,
        max_resident: usize,
        log: Vec<String>,
    }

    #[derive(Default)]
    struct MockEngine {
        counters: Arc<Mutex<Counters>>,
        fail_next: AtomicBool,
        fail_release: Arc<AtomicBool>,
        progress: Vec<f64>,
        delay: Option<Duration>,
        leaked: Mutex<Option<ProgressFn>>,
    }

    impl MockEngine {
        fn with_progress(progress: Vec<f64>) -> Self {
            Self {
                progress,
                ..Self::default()
            }
        }

        fn counters(&self) -> std::sync::MutexGuard<'_, Counters> {
            self.counters.lock().unwrap()
        }
    }

    #[async_trait]
    impl InferenceEngine for MockEngine {
        async fn create(
            &self,
            backend_id: &str,
            on_progress: ProgressFn,
        ) -> Result<Box<dyn EngineHandle>, EngineError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            for fraction in &self.progress {
                on_progress(EngineProgress::new(*fraction, ""));
            }
            *self.leaked.lock().unwrap() = Some(Arc::clone(&on_progress));

            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(EngineError::Other(format!("no weights for {}", backend_id)));
            }

            let mut counters = self.counters();
            counters.created += 1;
            counters.resident += 1;
            counters.max_resident = counters.max_resident.max(counters.resident);
            counters.log.push(format!("create {}", backend_id));

            Ok(Box::new(MockHandle {
                backend_id: backend_id.to_string(),
                counters: Arc::clone(&self.counters),
                fail_release: Arc::clone(&self.fail_release),
            }))
        }
    }

    struct MockHandle {
        backend_id: String,
        counters: Arc<Mutex<Counters>>,
        fail_release: Arc<AtomicBool>,
    }

    #[async_trait]
    impl EngineHandle for MockHandle {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            params: &crate::engine::SamplingParams,
        ) -> Result<String, EngineError> {
            Ok(format!(
                "{} ({} tokens): {}",
                self.backend_id, params.max_tokens, messages[0].content
            ))
        }

        async fn unload(&mut self) -> Result<(), EngineError> {
            if self.fail_release.load(Ordering::SeqCst) {
                return Err(EngineError::Other("device lost".to_string()));
            }
            let mut counters = self.counters.lock().unwrap();
            counters.resident -= 1;
            counters.log.push(format!("release {}", self.backend_id));
            Ok(())
        }
    }

    fn setup(engine: MockEngine) -> (Arc<MockEngine>, Arc<MemoryStore>, LifecycleManager) {
        setup_with(engine, MemoryStore::new(), RuntimeConfig::default())
    }

    fn setup_with(
        engine: MockEngine,
        store: MemoryStore,
        config: RuntimeConfig,
    ) -> (Arc<MockEngine>, Arc<MemoryStore>, LifecycleManager) {
        let engine = Arc::new(engine);
        let store = Arc::new(store);
        let manager = LifecycleManager::new(
            ModelRegistry::builtin(),
            engine.clone(),
            store.clone(),
            config,
        );
        (engine, store, manager)
    }

    fn record_events(manager: &LifecycleManager) -> Arc<Mutex<Vec<LifecycleEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        manager.subscribe(Arc::new(move |e: &LifecycleEvent| {
            sink.lock().unwrap().push(e.clone())
        }));
        events
    }

    fn progress_of(events: &[LifecycleEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                LifecycleEvent::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_load_makes_model_ready_and_persists() {
        let (engine, store, manager) = setup(MockEngine::default());
        let events = record_events(&manager);

        manager.load("gemma-2-2b").await.unwrap();

        let state = manager.state();
        assert_eq!(state.active_profile_id.as_deref(), Some("gemma-2-2b"));
        assert!(state.is_enabled);
        assert!(state.is_resident);
        assert!(!state.is_loading);
        assert_eq!(state.load_progress_percent, 100.0);
        assert!(manager.is_model_loaded());
        assert_eq!(engine.counters().created, 1);

        let persisted = PersistedModelState::read(store.as_ref()).await.unwrap();
        assert_eq!(persisted.should_restore(), Some("gemma-2-2b"));

        let events = events.lock().unwrap();
        assert_eq!(
            events.last(),
            Some(&LifecycleEvent::Loaded {
                profile_id: "gemma-2-2b".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_profile_changes_nothing() {
        let (engine, _store, manager) = setup(MockEngine::default());
        manager.load("gemma-2-2b").await.unwrap();
        let before = manager.state();

        let err = manager.load("nonexistent").await.unwrap_err();
        assert!(matches!(err, LifecycleError::UnknownProfile(ref id) if id == "nonexistent"));
        assert_eq!(err.to_string(), "Unknown model: nonexistent");
        assert_eq!(manager.state(), before);
        assert_eq!(engine.counters().created, 1);
    }

    #[tokio::test]
    async fn test_switch_releases_previous_before_acquiring() {
        let (engine, _store, manager) = setup(MockEngine::default());

        manager.load("gemma-2-2b").await.unwrap();
        manager.load("phi-3.5-mini").await.unwrap();

        let counters = engine.counters();
        assert_eq!(counters.max_resident, 1);
        assert_eq!(counters.resident, 1);
        let gemma = ModelRegistry::builtin().get("gemma-2-2b").unwrap().backend_id;
        let phi = ModelRegistry::builtin().get("phi-3.5-mini").unwrap().backend_id;
        assert_eq!(
            counters.log,
            vec![
                format!("create {}", gemma),
                format!("release {}", gemma),
                format!("create {}", phi),
            ]
        );
        drop(counters);

        assert_eq!(
            manager.state().active_profile_id.as_deref(),
            Some("phi-3.5-mini")
        );
    }

    #[tokio::test]
    async fn test_reload_of_resident_profile_only_enables() {
        let (engine, store, manager) = setup(MockEngine::with_progress(vec![0.5, 1.0]));
        manager.load("gemma-2-2b").await.unwrap();
        manager.toggle_enabled().await.unwrap();
        assert!(!manager.is_model_enabled());

        let events = record_events(&manager);
        manager.load("gemma-2-2b").await.unwrap();

        assert!(manager.is_model_enabled());
        assert_eq!(engine.counters().created, 1);
        let events = events.lock().unwrap();
        assert!(progress_of(&events).is_empty());
        assert_eq!(events.len(), 1);
        assert_eq!(store.get(KEY_ENABLED).await.unwrap(), Some(json!(true)));
    }

    const KEY_ENABLED: &str = crate::store::KEY_MODEL_ENABLED;

    #[tokio::test]
    async fn test_acquisition_failure_clears_flags_and_reports() {
        let engine = MockEngine::default();
        engine.fail_next.store(true, Ordering::SeqCst);
        let (_engine, store, manager) = setup(engine);
        let events = record_events(&manager);

        let err = manager.load("mistral-7b").await.unwrap_err();
        assert!(matches!(err, LifecycleError::Acquisition { .. }));
        assert!(err.to_string().contains("no weights for"));

        let state = manager.state();
        assert!(!state.is_loading);
        assert!(!state.is_enabled);
        assert!(!state.is_resident);
        assert!(matches!(
            events.lock().unwrap().last(),
            Some(LifecycleEvent::Error { .. })
        ));
        assert_eq!(
            PersistedModelState::read(store.as_ref()).await.unwrap(),
            PersistedModelState::default()
        );

        // The manager is usable again afterwards.
        manager.load("mistral-7b").await.unwrap();
        assert!(manager.is_model_loaded());
    }

    #[tokio::test]
    async fn test_release_failure_keeps_previous_handle() {
        let (engine, store, manager) = setup(MockEngine::default());
        manager.load("gemma-2-2b").await.unwrap();

        engine.fail_release.store(true, Ordering::SeqCst);
        let err = manager.load("phi-3.5-mini").await.unwrap_err();
        assert!(matches!(err, LifecycleError::Release { ref profile_id, .. } if profile_id == "gemma-2-2b"));

        let counters = engine.counters();
        assert_eq!(counters.created, 1);
        assert_eq!(counters.resident, 1);
        drop(counters);
        let state = manager.state();
        assert!(state.is_resident);
        assert!(state.is_enabled);
        assert!(!state.is_loading);
        assert_eq!(state.load_progress_percent, 100.0);
        assert_eq!(state.active_profile_id.as_deref(), Some("gemma-2-2b"));
        assert_eq!(store.get(KEY_ENABLED).await.unwrap(), Some(json!(true)));

        let reply = manager.converse("hi").await.unwrap();
        assert!(reply.ends_with(": hi"));
    }

    #[tokio::test]
    async fn test_toggle_reloads_selected_model_after_shutdown() {
        let (engine, store, manager) = setup(MockEngine::with_progress(vec![0.5]));
        manager.load("gemma-2-2b").await.unwrap();
        manager.shutdown().await;

        let state = manager.state();
        assert_eq!(state.active_profile_id.as_deref(), Some("gemma-2-2b"));
        assert!(!state.is_resident);
        assert!(!state.is_enabled);

        let events = record_events(&manager);
        assert!(manager.toggle_enabled().await.unwrap());

        assert_eq!(engine.counters().created, 2);
        assert!(manager.is_model_loaded());
        assert!(manager.is_model_enabled());
        assert_eq!(store.get(KEY_ENABLED).await.unwrap(), Some(json!(true)));

        let events = events.lock().unwrap();
        assert_eq!(progress_of(&events), vec![50.0]);
        assert!(matches!(
            events.last(),
            Some(LifecycleEvent::Loaded { profile_id }) if profile_id == "gemma-2-2b"
        ));
    }

    #[tokio::test]
    async fn test_progress_is_monotone() {
        let (_engine, _store, manager) =
            setup(MockEngine::with_progress(vec![0.1, 0.4, 0.3, 0.9, 2.0]));
        let events = record_events(&manager);

        manager.load("qwen2.5-1.5b").await.unwrap();

        let events = events.lock().unwrap();
        let percents = progress_of(&events);
        assert_eq!(percents, vec![10.0, 40.0, 40.0, 90.0, 100.0]);

        let messages: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                LifecycleEvent::Progress { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect();
        assert!(messages.iter().all(|m| m.starts_with("Loading ")));
    }

    #[tokio::test]
    async fn test_late_progress_is_ignored() {
        let (engine, _store, manager) = setup(MockEngine::with_progress(vec![0.5]));
        manager.load("gemma-2-2b").await.unwrap();

        let events = record_events(&manager);
        let leaked = engine.leaked.lock().unwrap().take().unwrap();
        leaked(EngineProgress::new(0.7, "straggler"));

        assert!(events.lock().unwrap().is_empty());
        assert_eq!(manager.state().load_progress_percent, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_timeout() {
        let engine = MockEngine {
            delay: Some(Duration::from_secs(3600)),
            ..MockEngine::default()
        };
        let config = RuntimeConfig::builder()
            .acquire_timeout(Duration::from_secs(5))
            .build();
        let (_engine, _store, manager) = setup_with(engine, MemoryStore::new(), config);

        let err = manager.load("llama-3.2-3b").await.unwrap_err();
        assert!(matches!(err, LifecycleError::AcquisitionTimeout { .. }));
        assert!(!manager.state().is_loading);
        assert!(!manager.is_model_loaded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_load_is_rejected() {
        let engine = MockEngine {
            delay: Some(Duration::from_secs(1)),
            ..MockEngine::default()
        };
        let (engine, _store, manager) = setup(engine);
        let manager = Arc::new(manager);

        let first = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.load("gemma-2-2b").await })
        };
        tokio::task::yield_now().await;
        while !manager.state().is_loading {
            tokio::task::yield_now().await;
        }

        assert!(matches!(
            manager.load("phi-3.5-mini").await,
            Err(LifecycleError::LoadInProgress)
        ));
        assert!(matches!(
            manager.toggle_enabled().await,
            Err(LifecycleError::LoadInProgress)
        ));
        assert!(matches!(
            manager.unload().await,
            Err(LifecycleError::LoadInProgress)
        ));

        first.await.unwrap().unwrap();
        assert_eq!(engine.counters().created, 1);
        assert_eq!(
            manager.state().active_profile_id.as_deref(),
            Some("gemma-2-2b")
        );
    }

    #[tokio::test]
    async fn test_toggle_keeps_handle_and_emits_no_progress() {
        let (engine, store, manager) = setup(MockEngine::with_progress(vec![0.5]));
        manager.load("phi-3.5-mini").await.unwrap();
        let events = record_events(&manager);

        assert!(!manager.toggle_enabled().await.unwrap());
        assert!(manager.state().is_resident);
        assert!(!manager.is_model_enabled());
        assert_eq!(store.get(KEY_ENABLED).await.unwrap(), Some(json!(false)));

        assert!(manager.toggle_enabled().await.unwrap());
        assert!(manager.is_model_enabled());
        assert_eq!(engine.counters().created, 1);
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_without_selection() {
        let (_engine, _store, manager) = setup(MockEngine::default());
        assert!(matches!(
            manager.toggle_enabled().await,
            Err(LifecycleError::NoModelSelected)
        ));
    }

    #[tokio::test]
    async fn test_toggle_loads_persisted_selection() {
        let store = MemoryStore::with_entries([
            (crate::store::KEY_CURRENT_MODEL, json!("mistral-7b")),
            (KEY_ENABLED, json!(false)),
        ]);
        let (engine, _store, manager) =
            setup_with(MockEngine::default(), store, RuntimeConfig::default());

        assert!(manager.toggle_enabled().await.unwrap());
        assert_eq!(
            manager.state().active_profile_id.as_deref(),
            Some("mistral-7b")
        );
        assert_eq!(engine.counters().created, 1);
    }

    #[tokio::test]
    async fn test_converse_requires_ready_model() {
        let (_engine, _store, manager) = setup(MockEngine::default());
        assert!(matches!(
            manager.converse("hi").await,
            Err(LifecycleError::ModelNotReady)
        ));

        manager.load("gemma-2-2b").await.unwrap();
        let reply = manager.converse("hi").await.unwrap();
        assert!(reply.ends_with("(1000 tokens): hi"));

        manager.toggle_enabled().await.unwrap();
        let err = manager.converse("hi").await.unwrap_err();
        assert_eq!(err.to_string(), "Model not loaded or disabled");
    }

    #[tokio::test]
    async fn test_unload_clears_state_and_persists() {
        let (engine, store, manager) = setup(MockEngine::default());
        manager.unload().await.unwrap();

        manager.load("gemma-2-2b").await.unwrap();
        manager.unload().await.unwrap();

        assert_eq!(manager.state(), LifecycleSnapshot::default());
        assert_eq!(engine.counters().resident, 0);
        assert_eq!(
            PersistedModelState::read(store.as_ref()).await.unwrap(),
            PersistedModelState::default()
        );
    }

    #[tokio::test]
    async fn test_restore_persisted_model() {
        let store = MemoryStore::with_entries([
            (crate::store::KEY_CURRENT_MODEL, json!("gemma-2-2b")),
            (KEY_ENABLED, json!(true)),
        ]);
        let (_engine, _store, manager) =
            setup_with(MockEngine::default(), store, RuntimeConfig::default());

        assert_eq!(
            manager.restore().await,
            RestoreOutcome::Restored("gemma-2-2b".to_string())
        );
        assert!(manager.is_model_loaded());
        assert!(manager.is_model_enabled());
    }

    #[tokio::test]
    async fn test_restore_skips_disabled_and_reports_unknown() {
        let store = MemoryStore::with_entries([
            (crate::store::KEY_CURRENT_MODEL, json!("gemma-2-2b")),
            (KEY_ENABLED, json!(false)),
        ]);
        let (engine, _store, manager) =
            setup_with(MockEngine::default(), store, RuntimeConfig::default());
        assert_eq!(manager.restore().await, RestoreOutcome::Skipped);
        assert_eq!(engine.counters().created, 0);

        let store = MemoryStore::with_entries([
            (crate::store::KEY_CURRENT_MODEL, json!("retired-model")),
            (KEY_ENABLED, json!(true)),
        ]);
        let (_engine, _store, manager) =
            setup_with(MockEngine::default(), store, RuntimeConfig::default());
        let events = record_events(&manager);

        assert!(matches!(manager.restore().await, RestoreOutcome::Failed(_)));
        assert!(matches!(
            events.lock().unwrap().as_slice(),
            [LifecycleEvent::Error { .. }]
        ));
    }

    #[tokio::test]
    async fn test_callbacks_receive_loaded() {
        let (_engine, _store, manager) = setup(MockEngine::default());
        let loaded = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&loaded);
        manager.set_observers(
            LifecycleCallbacks::new().on_loaded(move |id| *sink.lock().unwrap() = Some(id.to_string())),
        );

        manager.load("qwen2.5-coder-7b").await.unwrap();
        assert_eq!(
            loaded.lock().unwrap().as_deref(),
            Some("qwen2.5-coder-7b")
        );
    }

    #[test]
    fn test_snapshot_wire_names() {
        let snapshot = LifecycleSnapshot {
            active_profile_id: Some("gemma-2-2b".to_string()),
            is_loading: false,
            load_progress_percent: 100.0,
            is_enabled: true,
            is_resident: true,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["currentModelId"], "gemma-2-2b");
        assert_eq!(json["loadingProgress"], 100.0);
        assert_eq!(json["isEnabled"], true);
        assert_eq!(json["isLoading"], false);
    }
}
