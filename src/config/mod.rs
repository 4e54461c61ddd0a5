//! Configuration for assembled dataflow graphs
//!
//! hybridflow itself never reads files; binaries that wire a graph use
//! [`FlowConfig`] to keep filter intervals, controller gains and setpoints
//! out of the code.
//!
//! # File formats
//!
//! The format is chosen by extension:
//! - `.toml` - TOML
//! - anything else - JSON
//!
//! # Example
//!
//! ```ignore
//! use hybridflow::config::FlowConfig;
//!
//! let config = FlowConfig::load_or_default("thermostat.toml");
//! let setpoint = config.bang_bang.setpoint();
//! let ema_tau = config.filter.ema_time_constant();
//! ```

use crate::control::{PidGains, Setpoint};
use crate::error::{FlowError, Result, ResultExt};
use crate::types::Range;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Current configuration file version
pub const CONFIG_VERSION: u32 = 1;

/// Default EMA time constant in milliseconds
pub const DEFAULT_EMA_TIME_CONSTANT_MS: u64 = 500;

/// Default throttle window in milliseconds
pub const DEFAULT_THROTTLE_INTERVAL_MS: u64 = 100;

/// Default debounce interval in milliseconds
pub const DEFAULT_DEBOUNCE_INTERVAL_MS: u64 = 50;

/// Default timed latch duration in milliseconds
pub const DEFAULT_LATCH_DURATION_MS: u64 = 1000;

/// On-disk encoding of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a path's extension
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

// ==================== Flow Config ====================

/// Top-level configuration of a dataflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Version for future migration support
    #[serde(default = "default_version")]
    pub version: u32,

    /// Filter and windowing intervals
    #[serde(default)]
    pub filter: FilterSettings,

    /// PID controller settings
    #[serde(default)]
    pub pid: PidSettings,

    /// Bang-bang controller settings
    #[serde(default)]
    pub bang_bang: BangBangSettings,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            filter: FilterSettings::default(),
            pid: PidSettings::default(),
            bang_bang: BangBangSettings::default(),
        }
    }
}

impl FlowConfig {
    /// Load a configuration file, JSON or TOML by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(FlowError::from)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::parse(&content, ConfigFormat::from_path(path))
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded flow config");
        Ok(config)
    }

    /// Load a configuration file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path.as_ref()).unwrap_or_else(|e| {
            tracing::warn!("Failed to load flow config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Parse configuration text in the given format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| FlowError::Serialization(format!("Invalid JSON config: {}", e))),
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| FlowError::Serialization(format!("Invalid TOML config: {}", e))),
        }
    }

    /// Render configuration text in the given format
    pub fn render(&self, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| FlowError::Serialization(format!("Failed to serialize config: {}", e))),
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| FlowError::Serialization(format!("Failed to serialize config: {}", e))),
        }
    }

    /// Save to `path`, JSON or TOML by extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = self.render(ConfigFormat::from_path(path))?;
        std::fs::write(path, content)
            .map_err(FlowError::from)
            .context(format!("Failed to write {}", path.display()))
    }

    /// Reject settings no controller could run with
    pub fn validate(&self) -> Result<()> {
        if self.version > CONFIG_VERSION {
            return Err(FlowError::Config(format!(
                "Unsupported config version {} (newest known is {})",
                self.version, CONFIG_VERSION
            )));
        }
        self.pid.validate()?;
        self.bang_bang.validate()
    }
}

// ==================== Filter Settings ====================

/// Intervals of the time-windowed operators, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default = "default_ema_time_constant_ms")]
    pub ema_time_constant_ms: u64,

    #[serde(default = "default_throttle_interval_ms")]
    pub throttle_interval_ms: u64,

    #[serde(default = "default_debounce_interval_ms")]
    pub debounce_interval_ms: u64,

    #[serde(default = "default_latch_duration_ms")]
    pub latch_duration_ms: u64,
}

fn default_ema_time_constant_ms() -> u64 {
    DEFAULT_EMA_TIME_CONSTANT_MS
}

fn default_throttle_interval_ms() -> u64 {
    DEFAULT_THROTTLE_INTERVAL_MS
}

fn default_debounce_interval_ms() -> u64 {
    DEFAULT_DEBOUNCE_INTERVAL_MS
}

fn default_latch_duration_ms() -> u64 {
    DEFAULT_LATCH_DURATION_MS
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            ema_time_constant_ms: DEFAULT_EMA_TIME_CONSTANT_MS,
            throttle_interval_ms: DEFAULT_THROTTLE_INTERVAL_MS,
            debounce_interval_ms: DEFAULT_DEBOUNCE_INTERVAL_MS,
            latch_duration_ms: DEFAULT_LATCH_DURATION_MS,
        }
    }
}

impl FilterSettings {
    pub fn ema_time_constant(&self) -> Duration {
        Duration::from_millis(self.ema_time_constant_ms)
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_interval_ms)
    }

    pub fn latch_duration(&self) -> Duration {
        Duration::from_millis(self.latch_duration_ms)
    }
}

// ==================== Controller Settings ====================

/// PID gains and optional output clamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidSettings {
    #[serde(default = "default_gains")]
    pub gains: PidGains,

    /// Output range; the integrator freezes while the output is clamped
    #[serde(default)]
    pub output_limits: Option<Range<f64>>,
}

fn default_gains() -> PidGains {
    PidGains::new(1.0, 0.0, 0.0)
}

impl Default for PidSettings {
    fn default() -> Self {
        Self {
            gains: default_gains(),
            output_limits: None,
        }
    }
}

impl PidSettings {
    fn validate(&self) -> Result<()> {
        let PidGains { kp, ki, kd } = self.gains;
        for (name, gain) in [("kp", kp), ("ki", ki), ("kd", kd)] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(FlowError::Config(format!(
                    "PID gain {} must be a non-negative number, got {}",
                    name, gain
                )));
            }
        }
        if let Some(limits) = &self.output_limits {
            if !limits.is_ordered() {
                return Err(FlowError::Config(format!(
                    "PID output limits are inverted: min {} > max {}",
                    limits.min, limits.max
                )));
            }
        }
        Ok(())
    }
}

/// Bang-bang target and dead band half-width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BangBangSettings {
    #[serde(default)]
    pub target: f64,

    #[serde(default = "default_hysteresis")]
    pub hysteresis: f64,
}

fn default_hysteresis() -> f64 {
    0.5
}

impl Default for BangBangSettings {
    fn default() -> Self {
        Self {
            target: 0.0,
            hysteresis: default_hysteresis(),
        }
    }
}

impl BangBangSettings {
    pub fn setpoint(&self) -> Setpoint {
        Setpoint::new(self.target, self.hysteresis)
    }

    fn validate(&self) -> Result<()> {
        if !self.hysteresis.is_finite() || self.hysteresis < 0.0 {
            return Err(FlowError::Config(format!(
                "Hysteresis must be a non-negative number, got {}",
                self.hysteresis
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FlowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.filter.ema_time_constant(), Duration::from_millis(500));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path("a/b.toml"), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("b.TOML"), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("b.json"), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path("noext"), ConfigFormat::Json);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FlowConfig::parse(
            r#"
            [bang_bang]
            target = 21.0

            [pid.gains]
            kp = 2.0
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.bang_bang.setpoint(), Setpoint::new(21.0, 0.5));
        assert_eq!(config.pid.gains, PidGains::new(2.0, 0.0, 0.0));
        assert_eq!(config.filter, FilterSettings::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = FlowConfig::default();
        config.pid.gains.ki = -1.0;
        assert!(config.validate().is_err());

        let mut config = FlowConfig::default();
        config.pid.output_limits = Some(Range::new(10.0, -10.0));
        assert!(config.validate().is_err());

        let mut config = FlowConfig::default();
        config.bang_bang.hysteresis = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = FlowConfig::default();
        config.version = CONFIG_VERSION + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = FlowConfig::default();
        config.pid.output_limits = Some(Range::new(0.0, 100.0));
        let json = config.render(ConfigFormat::Json).unwrap();
        assert_eq!(FlowConfig::parse(&json, ConfigFormat::Json).unwrap(), config);
    }
}
