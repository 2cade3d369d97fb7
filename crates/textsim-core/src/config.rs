//! Layered algorithm configuration
//!
//! Resolution order, most specific last:
//!
//! 1. `AlgorithmConfig::default()`
//! 2. the global configuration
//! 3. the per-algorithm override, if one is registered
//! 4. the configuration passed with the call
//!
//! A layer only overrides the fields it sets. Preprocessing and normalization
//! are unset when `None`; see [`AlgorithmConfig::merged_with`].

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::SimilarityError;
use crate::types::{AlgorithmConfig, AlgorithmType};

/// Global configuration plus per-algorithm overrides.
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    global: RwLock<AlgorithmConfig>,
    overrides: RwLock<AHashMap<AlgorithmType, AlgorithmConfig>>,
}

impl ConfigurationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global_configuration(&self) -> AlgorithmConfig {
        self.global.read().clone()
    }

    /// Replace the global layer. Invalid configurations are rejected and the
    /// previous one stays in effect.
    pub fn set_global_configuration(&self, config: AlgorithmConfig) -> Result<(), SimilarityError> {
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "rejected global configuration");
            return Err(e);
        }
        *self.global.write() = config;
        Ok(())
    }

    /// The override for `algorithm`, or the default configuration for it.
    pub fn algorithm_config(&self, algorithm: AlgorithmType) -> AlgorithmConfig {
        self.overrides
            .read()
            .get(&algorithm)
            .cloned()
            .unwrap_or_else(|| AlgorithmConfig::new(algorithm))
    }

    /// Register an override for `algorithm`.
    ///
    /// The override is checked on top of the current global layer, so it may
    /// leave out parameters the global configuration already supplies.
    pub fn set_algorithm_config(
        &self,
        algorithm: AlgorithmType,
        mut config: AlgorithmConfig,
    ) -> Result<(), SimilarityError> {
        config.algorithm = algorithm;
        let mut effective = self.global_configuration().merged_with(&config);
        effective.algorithm = algorithm;
        if let Err(e) = effective.validate() {
            tracing::warn!(%algorithm, error = %e, "rejected algorithm configuration");
            return Err(e);
        }
        self.overrides.write().insert(algorithm, config);
        Ok(())
    }

    /// Drop the override for `algorithm`. Returns whether one existed.
    pub fn clear_algorithm_config(&self, algorithm: AlgorithmType) -> bool {
        self.overrides.write().remove(&algorithm).is_some()
    }

    pub fn has_algorithm_config(&self, algorithm: AlgorithmType) -> bool {
        self.overrides.read().contains_key(&algorithm)
    }

    /// Forget the global layer and every override.
    pub fn reset_to_defaults(&self) {
        *self.global.write() = AlgorithmConfig::default();
        self.overrides.write().clear();
        tracing::debug!("configuration reset to defaults");
    }

    /// Resolve the effective configuration for one call.
    ///
    /// The result always selects `algorithm`, whatever the layers say.
    pub fn merge(&self, algorithm: AlgorithmType, call: Option<&AlgorithmConfig>) -> AlgorithmConfig {
        let mut merged = AlgorithmConfig::default().merged_with(&self.global_configuration());

        let override_layer = self.overrides.read().get(&algorithm).cloned();
        if let Some(layer) = override_layer {
            merged = merged.merged_with(&layer);
        }
        if let Some(layer) = call {
            merged = merged.merged_with(layer);
        }

        merged.algorithm = algorithm;
        merged
    }
}
