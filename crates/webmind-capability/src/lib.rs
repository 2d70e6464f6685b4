//! # Webmind Capability Estimation
//!
//! Estimates how much graphics memory the host can spare for inference and
//! which model profiles are safe to run on it.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  HardwareProbe  │ --> │   Heuristics    │ --> │  Capabilities   │
//! │ (memory, GPU)   │     │ (rule tables)   │     │ (tier, models)  │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! Detection never fails: probe errors degrade to a medium-tier default.
//!
//! ## Usage
//!
//! ```ignore
//! use webmind_capability::{CapabilityEstimator, StaticProbe};
//!
//! let estimator = CapabilityEstimator::new(probe, ModelRegistry::builtin());
//! let caps = estimator.estimate().await;
//! println!("{} ({} GB)", caps.tier, caps.estimated_memory_gb);
//! ```

mod estimator;
mod heuristics;
mod probe;
mod signals;

pub use estimator::{
    assess, recommend, runnable_profiles, CapabilityEstimator, SystemCapabilities, Tier,
    MEMORY_SAFETY_FRACTION,
};
pub use heuristics::{classify_tier, estimate_memory, Candidate, MemoryEstimate};
pub use probe::{HardwareProbe, ProbeError, StaticProbe};
pub use signals::{AdapterInfo, GraphicsSignal, HardwareSignals};

/// Lower bound of any memory estimate, in GB.
pub const MIN_ESTIMATE_GB: f64 = 2.0;

/// Upper bound of any memory estimate, in GB.
pub const MAX_ESTIMATE_GB: f64 = 16.0;

/// Estimate used when detection cannot run.
pub const DEFAULT_ESTIMATE_GB: f64 = 4.0;
