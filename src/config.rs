use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::net::Weight;
use crate::sim::SelectionPolicy;

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub net: NetConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct NetConfig {
    /// Token count at which an uncapacitated place is reported as unbounded.
    #[serde(default = "default_unbounded_threshold")]
    pub unbounded_threshold: Weight,
    #[serde(default)]
    pub reject_duplicate_arcs: bool,
    /// Lets `set_tokens` push a place above its capacity.
    #[serde(default)]
    pub allow_manual_overfill: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            unbounded_threshold: default_unbounded_threshold(),
            reject_duplicate_arcs: false,
            allow_manual_overfill: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulationConfig {
    #[serde(default)]
    pub policy: SelectionPolicy,
    /// Fixed seed for reproducible runs; `None` seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Consecutive firings allowed without the clock advancing. The next one stops
    /// the run with `ZeroTimeLimit`, even in a finite net of immediate transitions
    /// that would otherwise reach a deadlock. `0` disables the guard.
    #[serde(default = "default_max_zero_time_firings")]
    pub max_zero_time_firings: usize,
    #[serde(default)]
    pub min_timed_delay: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::default(),
            seed: None,
            history_limit: default_history_limit(),
            max_zero_time_firings: default_max_zero_time_firings(),
            min_timed_delay: 0.0,
        }
    }
}

impl EngineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        if !(config.simulation.min_timed_delay.is_finite() && config.simulation.min_timed_delay >= 0.0) {
            anyhow::bail!(
                "min_timed_delay must be a non-negative number, got {}",
                config.simulation.min_timed_delay
            );
        }
        Ok(config)
    }
}

// Matches the editor's illustrative ceiling.
fn default_unbounded_threshold() -> Weight {
    1000
}

fn default_history_limit() -> usize {
    1000
}

fn default_max_zero_time_firings() -> usize {
    10_000
}
