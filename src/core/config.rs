//! Population builder configuration
//!
//! Every knob that influences how a population is assembled lives here, so a
//! build is fully described by its config, its input records and its location
//! classes.

use serde::Deserialize;

use crate::core::error::{PopError, Result};

/// How identifiers for agents and locations are allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdStrategy {
    /// 0, 1, 2, ... in creation order
    #[default]
    Sequential,
    /// Drawn uniformly from `0..space`, redrawn on collision
    ///
    /// Hides creation order in the identifiers. The number of redraws is
    /// capped by `MakerConfig::max_id_attempts`.
    Random { space: u64 },
}

/// Configuration for population building
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MakerConfig {
    /// Seed of the engine's random generator
    ///
    /// Same seed + same input ordering = same population.
    pub seed: u64,

    /// Membership weight used when a location policy does not provide one
    pub default_weight: f64,

    /// Identifier allocation scheme
    pub id_strategy: IdStrategy,

    /// Retry budget for random identifier allocation
    pub max_id_attempts: usize,

    /// Shuffle the agent pool before each location class is processed
    pub shuffle_agents: bool,
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            seed: 999,
            default_weight: 1.0,
            id_strategy: IdStrategy::Sequential,
            max_id_attempts: 1000,
            shuffle_agents: true,
        }
    }
}

impl MakerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Parse a config from TOML text; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MakerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if !self.default_weight.is_finite() || self.default_weight < 0.0 {
            return Err(PopError::config(format!(
                "default_weight ({}) must be a finite, non-negative number",
                self.default_weight
            )));
        }

        if self.max_id_attempts == 0 {
            return Err(PopError::config("max_id_attempts must be at least 1"));
        }

        if let IdStrategy::Random { space } = self.id_strategy {
            if space == 0 {
                return Err(PopError::config("random id space must not be empty"));
            }
        }

        Ok(())
    }
}
