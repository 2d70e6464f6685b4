//! Rule tables turning hardware signals into a memory estimate.
//!
//! Every present signal yields candidate estimates with a confidence
//! weight. The two most confident candidates are averaged by weight, then
//! rounded to one decimal and clamped to the supported range.

use serde::Serialize;
use tracing::debug;

use crate::estimator::Tier;
use crate::signals::AdapterInfo;
use crate::{MAX_ESTIMATE_GB, MIN_ESTIMATE_GB};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Systems at or below this much RAM get the conservative unified share.
const SMALL_SYSTEM_GB: f64 = 8.0;

/// One heuristic guess at usable graphics memory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub memory_gb: f64,
    pub confidence: u32,
    pub method: &'static str,
}

/// Result of combining the candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryEstimate {
    /// Final estimate, rounded and clamped.
    pub memory_gb: f64,
    /// Which candidates contributed, for diagnostics.
    pub method: String,
    /// Every candidate considered, most confident first.
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GpuFamily {
    Unified,
    Intel,
}

impl GpuFamily {
    fn of(vendor: &str, architecture: &str) -> Option<Self> {
        if vendor.contains("apple") || architecture.contains("metal") {
            Some(GpuFamily::Unified)
        } else if vendor.contains("intel") {
            Some(GpuFamily::Intel)
        } else {
            None
        }
    }
}

/// Share of a reported size that is usable for inference.
///
/// `family: None` matches any adapter; `max_source_gb` limits the rule to
/// sources at or below that size.
struct ShareRule {
    family: Option<GpuFamily>,
    max_source_gb: Option<f64>,
    fraction: f64,
    cap_gb: f64,
    confidence: u32,
    method: &'static str,
}

impl ShareRule {
    fn matches(&self, family: Option<GpuFamily>, source_gb: f64) -> bool {
        let family_ok = self.family.is_none() || self.family == family;
        let size_ok = self.max_source_gb.map_or(true, |max| source_gb <= max);
        family_ok && size_ok
    }

    fn apply(&self, source_gb: f64) -> Candidate {
        Candidate {
            memory_gb: (source_gb * self.fraction).min(self.cap_gb),
            confidence: self.confidence,
            method: self.method,
        }
    }
}

const SYSTEM_MEMORY_RULES: &[ShareRule] = &[
    ShareRule {
        family: Some(GpuFamily::Unified),
        max_source_gb: Some(SMALL_SYSTEM_GB),
        fraction: 0.65,
        cap_gb: 6.0,
        confidence: 10,
        method: "deviceMemory (Apple unified)",
    },
    ShareRule {
        family: Some(GpuFamily::Unified),
        max_source_gb: None,
        fraction: 0.7,
        cap_gb: 16.0,
        confidence: 10,
        method: "deviceMemory (Apple unified)",
    },
    ShareRule {
        family: Some(GpuFamily::Intel),
        max_source_gb: None,
        fraction: 0.35,
        cap_gb: 8.0,
        confidence: 7,
        method: "deviceMemory (Intel integrated)",
    },
    ShareRule {
        family: None,
        max_source_gb: None,
        fraction: 0.25,
        cap_gb: 12.0,
        confidence: 5,
        method: "deviceMemory (discrete estimate)",
    },
];

// The buffer limit is a soft cap on unified GPUs, so it is scaled up there.
const MAX_BUFFER_RULES: &[ShareRule] = &[
    ShareRule {
        family: Some(GpuFamily::Unified),
        max_source_gb: None,
        fraction: 1.5,
        cap_gb: 12.0,
        confidence: 5,
        method: "maxBufferSize (Apple adjusted)",
    },
    ShareRule {
        family: None,
        max_source_gb: None,
        fraction: 1.0,
        cap_gb: 16.0,
        confidence: 8,
        method: "maxBufferSize (direct)",
    },
];

/// Fixed guess keyed on a substring of the architecture string.
struct ArchitectureRule {
    needles: &'static [&'static str],
    small_system: (f64, &'static str),
    large_system: (f64, &'static str),
    confidence: u32,
}

const ARCHITECTURE_RULES: &[ArchitectureRule] = &[
    // metal-3 is reported for several chip generations, so RAM decides.
    ArchitectureRule {
        needles: &["metal-3", "metal-2"],
        small_system: (5.0, "architecture (Metal 8GB)"),
        large_system: (7.0, "architecture (Metal 16GB+)"),
        confidence: 4,
    },
    ArchitectureRule {
        needles: &["metal"],
        small_system: (4.0, "architecture (Metal legacy)"),
        large_system: (4.0, "architecture (Metal legacy)"),
        confidence: 3,
    },
];

/// Fixed guess keyed on a substring of the vendor string.
struct VendorRule {
    needle: &'static str,
    memory_gb: f64,
    confidence: u32,
    method: &'static str,
}

const VENDOR_RULES: &[VendorRule] = &[
    VendorRule {
        needle: "nvidia",
        memory_gb: 6.0,
        confidence: 3,
        method: "vendor (NVIDIA default)",
    },
    VendorRule {
        needle: "amd",
        memory_gb: 6.0,
        confidence: 3,
        method: "vendor (AMD default)",
    },
    VendorRule {
        needle: "intel",
        memory_gb: 4.0,
        confidence: 4,
        method: "vendor (Intel default)",
    },
];

const FALLBACK_CANDIDATE: Candidate = Candidate {
    memory_gb: 4.0,
    confidence: 2,
    method: "fallback (no data)",
};

/// Estimate usable graphics memory for a detected adapter.
///
/// Zero or negative sizes and empty strings count as absent signals.
pub fn estimate_memory(system_memory_gb: Option<f64>, adapter: &AdapterInfo) -> MemoryEstimate {
    let vendor = adapter.vendor_lower();
    let architecture = adapter.architecture_lower();
    let family = GpuFamily::of(&vendor, &architecture);
    let system_memory_gb = system_memory_gb.filter(|gb| *gb > 0.0);

    let mut candidates = Vec::new();

    if let Some(memory) = system_memory_gb {
        if let Some(rule) = SYSTEM_MEMORY_RULES
            .iter()
            .find(|r| r.matches(family, memory))
        {
            candidates.push(rule.apply(memory));
        }
    }

    if let Some(buffer_gb) = adapter
        .max_buffer_size
        .filter(|bytes| *bytes > 0)
        .map(|bytes| bytes as f64 / BYTES_PER_GB)
    {
        if let Some(rule) = MAX_BUFFER_RULES
            .iter()
            .find(|r| r.matches(family, buffer_gb))
        {
            candidates.push(rule.apply(buffer_gb));
        }
    }

    if !architecture.is_empty() {
        let small_system = system_memory_gb.map_or(false, |gb| gb <= SMALL_SYSTEM_GB);
        if let Some(rule) = ARCHITECTURE_RULES
            .iter()
            .find(|r| r.needles.iter().any(|n| architecture.contains(n)))
        {
            let (memory_gb, method) = if small_system {
                rule.small_system
            } else {
                rule.large_system
            };
            candidates.push(Candidate {
                memory_gb,
                confidence: rule.confidence,
                method,
            });
        }
    }

    if !vendor.is_empty() && !vendor.contains("apple") {
        if let Some(rule) = VENDOR_RULES.iter().find(|r| vendor.contains(r.needle)) {
            candidates.push(Candidate {
                memory_gb: rule.memory_gb,
                confidence: rule.confidence,
                method: rule.method,
            });
        }
    }

    if candidates.is_empty() {
        candidates.push(FALLBACK_CANDIDATE);
    }

    combine(candidates)
}

fn combine(mut candidates: Vec<Candidate>) -> MemoryEstimate {
    // Stable: equal confidences keep signal order.
    candidates.sort_by(|a, b| b.confidence.cmp(&a.confidence));

    let top = &candidates[..candidates.len().min(2)];
    let total_confidence: u32 = top.iter().map(|c| c.confidence).sum();
    let weighted = top
        .iter()
        .map(|c| c.memory_gb * c.confidence as f64)
        .sum::<f64>()
        / total_confidence as f64;

    let memory_gb = round_tenth(weighted).clamp(MIN_ESTIMATE_GB, MAX_ESTIMATE_GB);
    let method = top
        .iter()
        .map(|c| format!("{} ({}GB, conf:{})", c.method, c.memory_gb, c.confidence))
        .collect::<Vec<_>>()
        .join(" + ");

    debug!(
        weighted,
        memory_gb,
        considered = candidates.len(),
        "memory estimate: {}",
        method
    );

    MemoryEstimate {
        memory_gb,
        method,
        candidates,
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Classify the host into a tier.
///
/// Vendor and architecture hints take precedence over the numeric
/// thresholds.
pub fn classify_tier(memory_gb: f64, adapter: &AdapterInfo) -> Tier {
    let vendor = adapter.vendor_lower();
    let architecture = adapter.architecture_lower();
    let unified = vendor.contains("apple") || architecture.contains("metal");
    let discrete = vendor.contains("nvidia") || vendor.contains("amd");

    if unified && architecture.contains("metal-3") {
        return Tier::High;
    }

    if unified && architecture.contains("metal-2") {
        return if memory_gb >= 6.0 {
            Tier::High
        } else {
            Tier::Medium
        };
    }

    if discrete && memory_gb >= 6.0 {
        return Tier::High;
    }

    Tier::from_memory(memory_gb)
}
