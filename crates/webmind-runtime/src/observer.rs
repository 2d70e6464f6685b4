//! Lifecycle event fan-out.
//!
//! Two registration styles are supported: independent subscribers that are
//! added and removed individually, and a single set of per-kind callbacks
//! that later registrations overwrite kind by kind.

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

/// Something that happened to the resident model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LifecycleEvent {
    /// Acquisition progress, non-decreasing within one load.
    Progress { percent: f64, message: String },
    /// A profile became resident and enabled.
    Loaded { profile_id: String },
    /// A lifecycle transition failed.
    Error { message: String },
}

/// Receives lifecycle events.
///
/// Called synchronously from the lifecycle manager; implementations should
/// hand work off rather than block.
pub trait LifecycleObserver: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent);
}

impl<F> LifecycleObserver for F
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent) {
        self(event)
    }
}

/// Identifies a subscriber for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type ProgressCallback = Arc<dyn Fn(f64, &str) + Send + Sync>;
type LoadedCallback = Arc<dyn Fn(&str) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// One optional handler per event kind.
#[derive(Clone, Default)]
pub struct LifecycleCallbacks {
    on_progress: Option<ProgressCallback>,
    on_loaded: Option<LoadedCallback>,
    on_error: Option<ErrorCallback>,
}

impl LifecycleCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, f: impl Fn(f64, &str) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn on_loaded(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_loaded = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Overwrite the handlers present in `other`, keep the rest.
    fn merge(&mut self, other: LifecycleCallbacks) {
        if other.on_progress.is_some() {
            self.on_progress = other.on_progress;
        }
        if other.on_loaded.is_some() {
            self.on_loaded = other.on_loaded;
        }
        if other.on_error.is_some() {
            self.on_error = other.on_error;
        }
    }

    fn dispatch(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Progress { percent, message } => {
                if let Some(f) = &self.on_progress {
                    f(*percent, message);
                }
            }
            LifecycleEvent::Loaded { profile_id } => {
                if let Some(f) = &self.on_loaded {
                    f(profile_id);
                }
            }
            LifecycleEvent::Error { message } => {
                if let Some(f) = &self.on_error {
                    f(message);
                }
            }
        }
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Arc<dyn LifecycleObserver>)>,
    callbacks: LifecycleCallbacks,
}

/// Subscriber list shared between the manager and progress callbacks.
#[derive(Default)]
pub(crate) struct Observers {
    inner: Mutex<Registry>,
}

impl Observers {
    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(&self, observer: Arc<dyn LifecycleObserver>) -> SubscriptionId {
        let mut registry = self.registry();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.subscribers.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry();
        let before = registry.subscribers.len();
        registry.subscribers.retain(|(sid, _)| *sid != id);
        registry.subscribers.len() != before
    }

    pub(crate) fn set_callbacks(&self, callbacks: LifecycleCallbacks) {
        self.registry().callbacks.merge(callbacks);
    }

    pub(crate) fn emit(&self, event: &LifecycleEvent) {
        // Observers may call back into the manager, so never hold the lock.
        let (subscribers, callbacks) = {
            let registry = self.registry();
            let subscribers: Vec<_> = registry
                .subscribers
                .iter()
                .map(|(_, o)| Arc::clone(o))
                .collect();
            (subscribers, registry.callbacks.clone())
        };

        callbacks.dispatch(event);
        for observer in subscribers {
            observer.on_event(event);
        }
    }
}
