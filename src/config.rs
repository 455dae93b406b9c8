// Governance Configuration
//
// Defines the operational knobs of the adaptation engine: cycle
// scheduling, signal retention, and history caps. Rule and gate
// thresholds are deliberately NOT configurable; they are deterministic
// constants owned by the modules that apply them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main governance engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Enable/disable the scheduled adaptation cycle entirely
    pub enabled: bool,

    /// Adaptation cycle scheduling
    pub cycle: CycleSchedule,

    /// Signal log retention
    pub signals: SignalRetention,

    /// Maximum audit-log entries kept in memory (oldest evicted)
    pub history_cap: usize,

    /// Maximum drift snapshots kept (oldest evicted)
    pub drift_cap: usize,
}

/// Scheduling for the periodic adaptation cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSchedule {
    /// Interval between cycle runs (in seconds)
    #[serde(with = "serde_duration")]
    pub interval: Duration,

    /// Maximum duration for a single cycle run (in seconds)
    #[serde(with = "serde_duration")]
    pub max_duration: Duration,
}

/// Retention policy for the behavioral signal log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRetention {
    /// Maximum entries held; the oldest is evicted on overflow
    pub max_entries: usize,

    /// Maximum signal age in days; older entries are pruned by maintenance
    pub max_age_days: u32,
}

// Custom serde module for Duration (serialize/deserialize as seconds)
mod serde_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cycle: CycleSchedule {
                interval: Duration::from_secs(604800), // 7 days
                max_duration: Duration::from_secs(300), // 5 minutes
            },
            signals: SignalRetention {
                max_entries: 500,
                max_age_days: 90,
            },
            history_cap: 500,
            drift_cap: 90,
        }
    }
}

impl GovernanceConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: GovernanceConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Interval must be at least 1 hour: the cycle reasons over weekly
        // windows and tighter scheduling just burns the transparency budget
        if self.cycle.interval < Duration::from_secs(3600) {
            return Err(ConfigError::ValidationError(
                "cycle.interval must be at least 1 hour".to_string(),
            ));
        }

        if self.cycle.max_duration < Duration::from_secs(1)
            || self.cycle.max_duration > Duration::from_secs(1800)
        {
            return Err(ConfigError::ValidationError(
                "cycle.max_duration must be between 1 second and 30 minutes".to_string(),
            ));
        }

        if self.signals.max_entries == 0 || self.signals.max_entries > 10_000 {
            return Err(ConfigError::ValidationError(
                "signals.max_entries must be between 1 and 10000".to_string(),
            ));
        }

        if self.signals.max_age_days == 0 || self.signals.max_age_days > 365 {
            return Err(ConfigError::ValidationError(
                "signals.max_age_days must be between 1 and 365".to_string(),
            ));
        }

        if self.history_cap < 10 {
            return Err(ConfigError::ValidationError(
                "history_cap must be at least 10".to_string(),
            ));
        }

        if self.drift_cap < 28 {
            return Err(ConfigError::ValidationError(
                "drift_cap must be at least 28 (four weekly windows)".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GovernanceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.signals.max_entries, 500);
        assert_eq!(config.signals.max_age_days, 90);
        assert_eq!(config.drift_cap, 90);
    }

    #[test]
    fn test_validate_interval_too_short() {
        let mut config = GovernanceConfig::default();
        config.cycle.interval = Duration::from_secs(60);

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("interval must be at least 1 hour"));
    }

    #[test]
    fn test_validate_retention_bounds() {
        let mut config = GovernanceConfig::default();
        config.signals.max_entries = 0;
        assert!(config.validate().is_err());

        let mut config = GovernanceConfig::default();
        config.signals.max_age_days = 400;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_drift_cap_floor() {
        let mut config = GovernanceConfig::default();
        config.drift_cap = 10;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("drift_cap"));
    }

    #[test]
    fn test_from_toml() {
        let toml_str = r#"
            enabled = true
            history_cap = 500
            drift_cap = 90

            [cycle]
            interval = 604800
            max_duration = 300

            [signals]
            max_entries = 500
            max_age_days = 90
        "#;

        let config = GovernanceConfig::from_toml(toml_str).unwrap();
        assert!(config.enabled);
        assert_eq!(config.cycle.interval, Duration::from_secs(604800));
        assert_eq!(config.signals.max_entries, 500);
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = GovernanceConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: GovernanceConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.enabled, deserialized.enabled);
        assert_eq!(config.cycle.interval, deserialized.cycle.interval);
        assert_eq!(config.history_cap, deserialized.history_cap);
    }
}
