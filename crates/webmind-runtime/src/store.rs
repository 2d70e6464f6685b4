//! Persisted key-value state shared by the background process and UI
//! surfaces.
//!
//! Keys are plain JSON values; writes merge into the key space with
//! last-write-wins semantics and no transactions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

use crate::error::StoreError;

/// Key holding the selected profile id.
pub const KEY_CURRENT_MODEL: &str = "currentModelId";

/// Key holding whether the selected model may serve requests.
pub const KEY_MODEL_ENABLED: &str = "modelEnabled";

/// Key holding the UI theme.
pub const KEY_THEME: &str = "theme";

/// A JSON key space that survives process restarts.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read one key. `null` values read as absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Merge `entries` into the key space.
    async fn set(&self, entries: Map<String, Value>) -> Result<(), StoreError>;
}

/// In-memory store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`.
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let values = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).filter(|v| !v.is_null()).cloned())
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.extend(entries);
        Ok(())
    }
}

/// Store backed by a single JSON object file.
///
/// Writes go to a temporary sibling file that is renamed over the existing one.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotAnObject(self.path.display().to_string())),
        }
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut all = self.read_all().await?;
        Ok(all.remove(key).filter(|v| !v.is_null()))
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut all = self.read_all().await?;
        all.extend(entries);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&Value::Object(all))?;
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

/// The persisted subset of the lifecycle state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedModelState {
    pub current_model_id: Option<String>,
    pub model_enabled: bool,
}

impl PersistedModelState {
    pub async fn read(store: &dyn StateStore) -> Result<Self, StoreError> {
        let current_model_id = store
            .get(KEY_CURRENT_MODEL)
            .await?
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|id| !id.is_empty());

        let model_enabled = store
            .get(KEY_MODEL_ENABLED)
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Ok(Self {
            current_model_id,
            model_enabled,
        })
    }

    pub async fn write(&self, store: &dyn StateStore) -> Result<(), StoreError> {
        let mut entries = Map::new();
        entries.insert(
            KEY_CURRENT_MODEL.to_string(),
            self.current_model_id
                .clone()
                .map_or(Value::Null, Value::String),
        );
        entries.insert(
            KEY_MODEL_ENABLED.to_string(),
            Value::Bool(self.model_enabled),
        );
        store.set(entries).await
    }

    /// Whether startup should try to bring the model back.
    pub fn should_restore(&self) -> Option<&str> {
        self.current_model_id
            .as_deref()
            .filter(|_| self.model_enabled)
    }
}

/// Write only the enabled flag.
pub async fn write_enabled(store: &dyn StateStore, enabled: bool) -> Result<(), StoreError> {
    let mut entries = Map::new();
    entries.insert(KEY_MODEL_ENABLED.to_string(), Value::Bool(enabled));
    store.set(entries).await
}

/// UI color scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeMode::Light => f.write_str("light"),
            ThemeMode::Dark => f.write_str("dark"),
        }
    }
}

/// Read the saved theme; anything unrecognized reads as light.
pub async fn read_theme(store: &dyn StateStore) -> Result<ThemeMode, StoreError> {
    let theme = match store.get(KEY_THEME).await? {
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|_| {
            warn!("Ignoring unknown theme {}", value);
            ThemeMode::default()
        }),
        None => ThemeMode::default(),
    };
    Ok(theme)
}

/// Flip the saved theme and return the new one.
pub async fn toggle_theme(store: &dyn StateStore) -> Result<ThemeMode, StoreError> {
    let next = read_theme(store).await?.toggled();
    let mut entries = Map::new();
    entries.insert(KEY_THEME.to_string(), serde_json::to_value(next)?);
    store.set(entries).await?;
    Ok(next)
}
