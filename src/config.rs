//! Tunable interaction rules and logging settings.

use serde::{Deserialize, Serialize};

fn default_taming_chance() -> f64 {
    0.30
}

fn default_tamed_rounds() -> u32 {
    5
}

fn default_coordination_step() -> f64 {
    0.1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_summary_interval() -> u64 {
    10
}

/// Constants of the combat and taming pass that are not species statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionRules {
    /// Probability a Human tames an adjacent untamed predator.
    #[serde(default = "default_taming_chance")]
    pub taming_chance: f64,
    /// Rounds a successful taming lasts.
    #[serde(default = "default_tamed_rounds")]
    pub tamed_rounds: u32,
    /// Bonus per adjacent ally, scaled by the attacker's coordination.
    #[serde(default = "default_coordination_step")]
    pub coordination_step: f64,
}

impl Default for InteractionRules {
    fn default() -> Self {
        Self {
            taming_chance: default_taming_chance(),
            tamed_rounds: default_tamed_rounds(),
            coordination_step: default_coordination_step(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Rounds between population summaries at info level; 0 disables them.
    #[serde(default = "default_summary_interval")]
    pub summary_interval_rounds: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            summary_interval_rounds: default_summary_interval(),
        }
    }
}
