//! Model profile definitions.

use serde::Serialize;
use std::fmt;

/// Coarse size class of a model profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileTier {
    Small,
    Medium,
    Large,
}

impl fmt::Display for ProfileTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfileTier::Small => "small",
            ProfileTier::Medium => "medium",
            ProfileTier::Large => "large",
        };
        f.write_str(name)
    }
}

/// A downloadable model configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelProfile {
    /// Unique registry key.
    pub id: &'static str,
    /// Human readable name.
    pub display_name: &'static str,
    /// Model reference understood by the inference engine.
    pub backend_id: &'static str,
    /// Download size, for display.
    pub size_on_disk: &'static str,
    /// Graphics memory needed to run the model.
    pub memory_required_gb: f64,
    pub tier: ProfileTier,
    pub specialty: &'static str,
    pub features: &'static [&'static str],
    pub description: &'static str,
}
