//! Capability estimation entry point.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use webmind_models::ModelRegistry;

use crate::heuristics::{classify_tier, estimate_memory};
use crate::probe::{HardwareProbe, ProbeError};
use crate::signals::{AdapterInfo, GraphicsSignal, HardwareSignals};
use crate::{DEFAULT_ESTIMATE_GB, MIN_ESTIMATE_GB};

/// Fraction of the estimate a model may use; the rest is runtime overhead.
pub const MEMORY_SAFETY_FRACTION: f64 = 0.75;

// Estimates carry one decimal, so products like 6.4 * 0.75 must not miss
// 4.8 by a rounding error.
const FIT_TOLERANCE: f64 = 1e-9;

/// Coarse inference capacity of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    /// Numeric thresholds used when no vendor hint applies.
    pub fn from_memory(memory_gb: f64) -> Self {
        if memory_gb >= 5.0 {
            Tier::High
        } else if memory_gb >= 3.0 {
            Tier::Medium
        } else {
            Tier::Low
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Low => "low",
            Tier::Medium => "medium",
            Tier::High => "high",
        };
        f.write_str(name)
    }
}

/// What the host can run. Recomputed every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemCapabilities {
    pub estimated_memory_gb: f64,
    pub tier: Tier,
    pub recommended_profile_id: String,
    /// Never empty.
    pub runnable_profile_ids: Vec<String>,
    pub device_description: String,
    pub estimation_method: String,
}

/// Runs the probe and turns its signals into [`SystemCapabilities`].
pub struct CapabilityEstimator<P> {
    probe: P,
    registry: ModelRegistry,
}

impl<P: HardwareProbe> CapabilityEstimator<P> {
    pub fn new(probe: P, registry: ModelRegistry) -> Self {
        Self { probe, registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Estimate the host's capabilities.
    ///
    /// Never fails: probe errors fall back to a medium-tier default.
    pub async fn estimate(&self) -> SystemCapabilities {
        let caps = match self.gather().await {
            Ok(signals) => assess(&signals, &self.registry),
            Err(e) => {
                warn!("Could not detect hardware capabilities: {}", e);
                finish(
                    &self.registry,
                    Assessment {
                        memory_gb: DEFAULT_ESTIMATE_GB,
                        tier: Tier::Medium,
                        device_description: UNKNOWN_DEVICE.to_string(),
                        method: "error-fallback".to_string(),
                    },
                )
            }
        };

        info!(
            "Capabilities: {} GB, tier {}, recommended {}",
            caps.estimated_memory_gb, caps.tier, caps.recommended_profile_id
        );
        caps
    }

    async fn gather(&self) -> Result<HardwareSignals, ProbeError> {
        let system_memory_gb = self.probe.system_memory_gb().await?;
        let graphics = self.probe.graphics().await?;
        Ok(HardwareSignals {
            system_memory_gb,
            graphics,
        })
    }
}

const UNKNOWN_DEVICE: &str = "Unknown GPU";

struct Assessment {
    memory_gb: f64,
    tier: Tier,
    device_description: String,
    method: String,
}

/// Pure assessment of a signal record.
pub fn assess(signals: &HardwareSignals, registry: &ModelRegistry) -> SystemCapabilities {
    let assessment = match &signals.graphics {
        GraphicsSignal::Unavailable => Assessment {
            memory_gb: MIN_ESTIMATE_GB,
            tier: Tier::Low,
            device_description: "WebGPU not supported".to_string(),
            method: "no-webgpu".to_string(),
        },
        GraphicsSignal::NoAdapter => Assessment {
            memory_gb: DEFAULT_ESTIMATE_GB,
            tier: Tier::Medium,
            device_description: UNKNOWN_DEVICE.to_string(),
            method: "fallback".to_string(),
        },
        GraphicsSignal::Adapter(adapter) => {
            let estimate = estimate_memory(signals.system_memory_gb, adapter);
            Assessment {
                tier: classify_tier(estimate.memory_gb, adapter),
                memory_gb: estimate.memory_gb,
                device_description: describe_device(adapter),
                method: estimate.method,
            }
        }
    };

    finish(registry, assessment)
}

fn finish(registry: &ModelRegistry, assessment: Assessment) -> SystemCapabilities {
    let runnable_profile_ids = runnable_profiles(registry, assessment.memory_gb);
    let recommended_profile_id = recommend(registry, &runnable_profile_ids);

    SystemCapabilities {
        estimated_memory_gb: assessment.memory_gb,
        tier: assessment.tier,
        recommended_profile_id,
        runnable_profile_ids,
        device_description: assessment.device_description,
        estimation_method: assessment.method,
    }
}

/// Profiles that fit in the safe share of `memory_gb`, in catalog order.
///
/// Falls back to the smallest profile when nothing fits.
pub fn runnable_profiles(registry: &ModelRegistry, memory_gb: f64) -> Vec<String> {
    let budget = memory_gb * MEMORY_SAFETY_FRACTION + FIT_TOLERANCE;
    let mut ids: Vec<String> = registry
        .all()
        .iter()
        .filter(|p| p.memory_required_gb <= budget)
        .map(|p| p.id.to_string())
        .collect();

    if ids.is_empty() {
        let smallest = registry.smallest();
        warn!(
            "No models met memory requirements, allowing smallest model {}",
            smallest.id
        );
        ids.push(smallest.id.to_string());
    }

    ids
}

/// The largest runnable profile.
pub fn recommend(registry: &ModelRegistry, runnable: &[String]) -> String {
    registry
        .by_preference()
        .into_iter()
        .find(|p| runnable.iter().any(|id| id == p.id))
        .unwrap_or_else(|| registry.smallest())
        .id
        .to_string()
}

fn describe_device(adapter: &AdapterInfo) -> String {
    let vendor = adapter.vendor_lower();

    if adapter.is_unified_memory() {
        let arch = adapter.architecture_lower();
        let arch = if arch.is_empty() { "Metal" } else { &arch };
        return format!("Apple GPU ({})", arch);
    }

    let brand = [("nvidia", "NVIDIA"), ("amd", "AMD"), ("intel", "Intel")]
        .into_iter()
        .find(|(needle, _)| vendor.contains(needle));
    if let Some((_, brand)) = brand {
        let device = adapter.device_lower();
        let device = if device.is_empty() { "GPU" } else { &device };
        return format!("{} {}", brand, device);
    }

    // Unbranded adapters keep the reported spelling.

    let parts: Vec<&str> = [
        &adapter.vendor,
        &adapter.device,
        &adapter.architecture,
        &adapter.description,
    ]
    .into_iter()
    .filter_map(|p| p.as_deref())
    .filter(|p| !p.is_empty())
    .collect();

    if parts.is_empty() {
        "GPU detected".to_string()
    } else {
        parts.join(" ")
    }
}
