//! Service thresholds for attendance compliance.
//!
//! # Responsibility
//! - Hold the numeric thresholds and durations the engines validate against.
//! - Load overrides from a TOML file, falling back to built-in defaults.
//!
//! # Invariants
//! - `max_distance_warning_m < max_distance_error_m` (the compliance
//!   evaluator assumes it).
//! - All durations are positive.
//! - Config is supplied at process start and immutable thereafter.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration load or validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config file: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config file: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Immutable thresholds consumed by the session and task engines.
///
/// Durations are stored as whole seconds so the struct stays trivially
/// serializable; accessors expose them as `chrono::Duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Distance beyond which a clock-in is flagged, in meters.
    pub max_distance_warning_m: f64,
    /// Distance beyond which a clock-in is rejected, in meters.
    pub max_distance_error_m: f64,
    /// How early before the scheduled start a clock-in is allowed.
    pub max_early_clock_in_secs: i64,
    /// How late after the scheduled end a clock-in is allowed.
    pub max_late_clock_in_secs: i64,
    /// Minimum elapsed time between clock-in and clock-out.
    pub min_visit_duration_secs: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_distance_warning_m: 500.0,
            max_distance_error_m: 2000.0,
            max_early_clock_in_secs: 15 * 60,
            max_late_clock_in_secs: 30 * 60,
            min_visit_duration_secs: 10 * 60,
        }
    }
}

impl ServiceConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Checks the cross-field invariants the engines rely on.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.max_distance_warning_m.is_finite() || self.max_distance_warning_m <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_distance_warning_m must be a positive number, got {}",
                self.max_distance_warning_m
            )));
        }
        if !self.max_distance_error_m.is_finite() || self.max_distance_error_m <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_distance_error_m must be a positive number, got {}",
                self.max_distance_error_m
            )));
        }
        if self.max_distance_warning_m >= self.max_distance_error_m {
            return Err(ConfigError::Invalid(format!(
                "max_distance_warning_m ({}) must be below max_distance_error_m ({})",
                self.max_distance_warning_m, self.max_distance_error_m
            )));
        }

        for (name, value) in [
            ("max_early_clock_in_secs", self.max_early_clock_in_secs),
            ("max_late_clock_in_secs", self.max_late_clock_in_secs),
            ("min_visit_duration_secs", self.min_visit_duration_secs),
        ] {
            if value <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        Ok(())
    }

    pub fn max_early_clock_in(&self) -> Duration {
        Duration::seconds(self.max_early_clock_in_secs)
    }

    pub fn max_late_clock_in(&self) -> Duration {
        Duration::seconds(self.max_late_clock_in_secs)
    }

    pub fn min_visit_duration(&self) -> Duration {
        Duration::seconds(self.min_visit_duration_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ServiceConfig};
    use chrono::Duration;

    #[test]
    fn defaults_are_valid() {
        let config = ServiceConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_early_clock_in(), Duration::minutes(15));
        assert_eq!(config.max_late_clock_in(), Duration::minutes(30));
        assert_eq!(config.min_visit_duration(), Duration::minutes(10));
    }

    #[test]
    fn toml_overrides_and_defaults_merge() {
        let config = ServiceConfig::from_toml_str(
            "max_distance_warning_m = 100.0\nmin_visit_duration_secs = 300\n",
        )
        .unwrap();
        assert_eq!(config.max_distance_warning_m, 100.0);
        assert_eq!(config.min_visit_duration_secs, 300);
        assert_eq!(config.max_distance_error_m, 2000.0);
    }

    #[test]
    fn warning_threshold_must_stay_below_error_threshold() {
        let err = ServiceConfig::from_toml_str(
            "max_distance_warning_m = 2000.0\nmax_distance_error_m = 500.0\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn non_positive_durations_are_rejected() {
        let err = ServiceConfig::from_toml_str("min_visit_duration_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("min_visit_duration_secs")));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = ServiceConfig::from_toml_str("max_distance_warning_m = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
