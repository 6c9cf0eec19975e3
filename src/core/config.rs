use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("max_commands_per_tick must be at least 1")]
    ZeroCommandBudget,
    #[error("default_letter_delay must be a finite, non-negative number of seconds")]
    InvalidLetterDelay,
}

fn default_seed() -> String {
    "sparkdown".to_string()
}

fn default_max_commands() -> usize {
    1000
}

fn default_letter_delay() -> f64 {
    0.025
}

fn default_emit_events() -> bool {
    true
}

/// Tunables for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Prefix of every per-command random key.
    #[serde(default = "default_seed")]
    pub random_seed: String,
    /// Commands one block may run in a single tick before it is suspended
    /// until the next one.
    #[serde(default = "default_max_commands")]
    pub max_commands_per_tick: usize,
    /// Seconds per revealed character for displays without their own delay.
    #[serde(default = "default_letter_delay")]
    pub default_letter_delay: f64,
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            random_seed: default_seed(),
            max_commands_per_tick: default_max_commands(),
            default_letter_delay: default_letter_delay(),
            emit_events: default_emit_events(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_commands_per_tick == 0 {
            return Err(ConfigError::ZeroCommandBudget);
        }
        if !self.default_letter_delay.is_finite() || self.default_letter_delay < 0.0 {
            return Err(ConfigError::InvalidLetterDelay);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ron_uses_defaults() {
        let config = EngineConfig::parse_ron("()").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_ron_overrides() {
        let config = EngineConfig::parse_ron(r#"(random_seed: "abc", emit_events: false)"#).unwrap();
        assert_eq!(config.random_seed, "abc");
        assert!(!config.emit_events);
        assert_eq!(config.max_commands_per_tick, 1000);
    }

    #[test]
    fn zero_budget_rejected() {
        let err = EngineConfig::parse_ron("(max_commands_per_tick: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCommandBudget));
    }

    #[test]
    fn negative_letter_delay_rejected() {
        let err = EngineConfig::parse_ron("(default_letter_delay: -1.0)").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLetterDelay));
    }
}
