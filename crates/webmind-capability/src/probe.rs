//! Hardware query seam.

use async_trait::async_trait;
use thiserror::Error;

use crate::signals::{GraphicsSignal, HardwareSignals};

/// A hardware query that could not be answered.
///
/// Never reaches callers of the estimator.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("unsupported query: {0}")]
    Unsupported(String),
    #[error("hardware query failed: {0}")]
    Failed(String),
}

/// Source of hardware signals.
#[async_trait]
pub trait HardwareProbe: Send + Sync {
    /// Reported system memory in GB, if the platform exposes it.
    async fn system_memory_gb(&self) -> Result<Option<f64>, ProbeError>;

    /// Graphics adapter details.
    async fn graphics(&self) -> Result<GraphicsSignal, ProbeError>;
}

/// Probe answering from a fixed signal record.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    signals: HardwareSignals,
}

impl StaticProbe {
    pub fn new(signals: HardwareSignals) -> Self {
        Self { signals }
    }

    pub fn signals(&self) -> &HardwareSignals {
        &self.signals
    }
}

#[async_trait]
impl HardwareProbe for StaticProbe {
    async fn system_memory_gb(&self) -> Result<Option<f64>, ProbeError> {
        Ok(self.signals.system_memory_gb)
    }

    async fn graphics(&self) -> Result<GraphicsSignal, ProbeError> {
        Ok(self.signals.graphics.clone())
    }
}
