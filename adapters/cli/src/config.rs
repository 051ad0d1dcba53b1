use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use pulse_runner_system_orchestrator::OrchestratorConfig;
use pulse_runner_system_parameters::{DEFAULT_BASE_SPEED, DEFAULT_GRAVITY_SCALE};
use serde::Deserialize;

const DEFAULT_SEED: u64 = 0x5075_6c73_6552_756e;

/// Runner settings loaded from a TOML file. Every field has a default.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RunnerConfig {
    pub(crate) gameplay: GameplayConfig,
    pub(crate) cache: CacheConfig,
    pub(crate) generation: GenerationConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameplayConfig {
    pub(crate) base_speed: f32,
    pub(crate) gravity_scale: f32,
    pub(crate) transition_ms: u64,
    pub(crate) seed: u64,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            base_speed: DEFAULT_BASE_SPEED,
            gravity_scale: DEFAULT_GRAVITY_SCALE,
            transition_ms: 2_000,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CacheConfig {
    pub(crate) capacity: usize,
    pub(crate) ttl_secs: u64,
    pub(crate) sweep_interval_secs: u64,
    pub(crate) generation_budget_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            ttl_secs: 600,
            sweep_interval_secs: 60,
            generation_budget_secs: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GenerationConfig {
    pub(crate) enabled: bool,
    pub(crate) latency_ms: u64,
    pub(crate) failure_rate: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            latency_ms: 250,
            failure_rate: 0.0,
        }
    }
}

impl RunnerConfig {
    /// Reads and validates a configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse runner config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let gameplay = &self.gameplay;
        if !(gameplay.base_speed.is_finite() && gameplay.base_speed > 0.0) {
            bail!("gameplay.base_speed must be positive (received {})", gameplay.base_speed);
        }
        if !(gameplay.gravity_scale.is_finite() && gameplay.gravity_scale > 0.0) {
            bail!(
                "gameplay.gravity_scale must be positive (received {})",
                gameplay.gravity_scale
            );
        }
        if !(0.0..=1.0).contains(&self.generation.failure_rate) {
            bail!(
                "generation.failure_rate must lie in 0..=1 (received {})",
                self.generation.failure_rate
            );
        }
        Ok(())
    }

    pub(crate) fn transition(&self) -> Duration {
        Duration::from_millis(self.gameplay.transition_ms)
    }

    pub(crate) fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            capacity: self.cache.capacity,
            ttl: Duration::from_secs(self.cache.ttl_secs),
            sweep_interval: Duration::from_secs(self.cache.sweep_interval_secs),
            generation_budget: Duration::from_secs(self.cache.generation_budget_secs),
        }
    }
}
