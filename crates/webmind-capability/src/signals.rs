//! Raw hardware signals fed into the estimator.

use serde::{Deserialize, Serialize};

/// Everything the probe could learn about the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareSignals {
    /// Reported system memory in GB.
    pub system_memory_gb: Option<f64>,
    pub graphics: GraphicsSignal,
}

/// What the graphics API reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GraphicsSignal {
    /// No graphics API at all.
    Unavailable,
    /// The API exists but returned no adapter.
    #[default]
    NoAdapter,
    Adapter(AdapterInfo),
}

/// Graphics adapter details. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterInfo {
    pub vendor: Option<String>,
    pub device: Option<String>,
    pub architecture: Option<String>,
    pub description: Option<String>,
    /// Maximum buffer allocation size, in bytes.
    pub max_buffer_size: Option<u64>,
}

impl AdapterInfo {
    /// Lower-cased vendor, empty when unknown.
    pub fn vendor_lower(&self) -> String {
        lower(&self.vendor)
    }

    pub fn device_lower(&self) -> String {
        lower(&self.device)
    }

    /// Lower-cased architecture, empty when unknown.
    pub fn architecture_lower(&self) -> String {
        lower(&self.architecture)
    }

    /// Whether the adapter looks like a unified-memory (Apple) GPU.
    pub fn is_unified_memory(&self) -> bool {
        self.vendor_lower().contains("apple") || self.architecture_lower().contains("metal")
    }
}

fn lower(value: &Option<String>) -> String {
    value.as_deref().unwrap_or_default().trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unified_memory_detection() {
        let apple = AdapterInfo {
            vendor: Some("Apple".into()),
            ..Default::default()
        };
        assert!(apple.is_unified_memory());

        let metal = AdapterInfo {
            architecture: Some("METAL-3".into()),
            ..Default::default()
        };
        assert!(metal.is_unified_memory());

        let nvidia = AdapterInfo {
            vendor: Some("nvidia".into()),
            architecture: Some("ampere".into()),
            ..Default::default()
        };
        assert!(!nvidia.is_unified_memory());
    }

    #[test]
    fn test_signals_json_shape() {
        let signals = HardwareSignals {
            system_memory_gb: Some(8.0),
            graphics: GraphicsSignal::Adapter(AdapterInfo {
                vendor: Some("intel".into()),
                max_buffer_size: Some(2_147_483_648),
                ..Default::default()
            }),
        };

        let json = serde_json::to_value(&signals).unwrap();
        assert_eq!(json["systemMemoryGb"], 8.0);
        assert_eq!(json["graphics"]["kind"], "adapter");
        assert_eq!(json["graphics"]["maxBufferSize"], 2_147_483_648u64);

        let parsed: HardwareSignals =
            serde_json::from_str(r#"{"systemMemoryGb":null,"graphics":{"kind":"unavailable"}}"#)
                .unwrap();
        assert_eq!(parsed.graphics, GraphicsSignal::Unavailable);
    }
}
