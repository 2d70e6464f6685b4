//! # Webmind Model Registry
//!
//! Static catalog of the model profiles the extension can download and run.
//! Profiles are immutable at runtime; the capability estimator filters them
//! and the lifecycle manager resolves ids against them.
//!
//! ```
//! use webmind_models::ModelRegistry;
//!
//! let registry = ModelRegistry::builtin();
//! let gemma = registry.get("gemma-2-2b").unwrap();
//! assert_eq!(gemma.backend_id, "gemma-2-2b-it-q4f16_1-MLC");
//! ```

mod catalog;
mod profile;

pub use catalog::BUILTIN_PROFILES;
pub use profile::{ModelProfile, ProfileTier};

use std::collections::HashSet;
use thiserror::Error;

/// Errors raised when building a custom registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a model registry needs at least one profile")]
    Empty,
    #[error("duplicate model profile id: {0}")]
    DuplicateId(String),
}

/// Lookup over a fixed set of model profiles.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    profiles: Vec<ModelProfile>,
}

impl ModelRegistry {
    /// The catalog shipped with the extension.
    pub fn builtin() -> Self {
        Self {
            profiles: BUILTIN_PROFILES.to_vec(),
        }
    }

    /// Build a registry from a custom list of profiles.
    pub fn new(profiles: Vec<ModelProfile>) -> Result<Self, RegistryError> {
        if profiles.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for profile in &profiles {
            if !seen.insert(profile.id) {
                return Err(RegistryError::DuplicateId(profile.id.to_string()));
            }
        }

        Ok(Self { profiles })
    }

    /// Look up a profile by id.
    pub fn get(&self, id: &str) -> Option<&ModelProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Check whether `id` names a known profile.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// All profiles, in catalog order.
    pub fn all(&self) -> &[ModelProfile] {
        &self.profiles
    }

    /// The profile with the lowest memory requirement.
    pub fn smallest(&self) -> &ModelProfile {
        // `new` and `builtin` guarantee at least one profile.
        self.profiles
            .iter()
            .min_by(|a, b| a.memory_required_gb.total_cmp(&b.memory_required_gb))
            .unwrap_or(&self.profiles[0])
    }

    /// Profiles ordered from the largest memory requirement to the smallest.
    ///
    /// Ties keep catalog order.
    pub fn by_preference(&self) -> Vec<&ModelProfile> {
        let mut ordered: Vec<&ModelProfile> = self.profiles.iter().collect();
        ordered.sort_by(|a, b| b.memory_required_gb.total_cmp(&a.memory_required_gb));
        ordered
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
