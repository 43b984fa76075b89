//! Device configuration types.
//!
//! This module contains configuration types for the simulated devices:
//! - `DeviceConfig` - The `[device]` section of the simulator config
//! - `UnitConfig` - One interlocked motion unit (selector bank + motor)
//! - `MotorConfig` - Motor defaults (velocity, resolution, limits, ...)

use crate::config::ConfigError;
use crate::consts::{DEFAULT_PREFIX, DEFAULT_TICK_RATE_HZ, MAX_SELECTORS_PER_UNIT, MAX_UNITS};
use crate::device::types::FineRange;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_tick_rate_hz() -> f64 {
    DEFAULT_TICK_RATE_HZ
}

fn default_velocity() -> f64 {
    0.1
}

fn default_precision() -> u16 {
    3
}

fn default_acceleration() -> f64 {
    1.0
}

fn default_resolution() -> f64 {
    1e-6
}

fn default_user_limits() -> [f64; 2] {
    [0.0, 100.0]
}

/// The `[device]` section.
///
/// A flat table: each device kind reads the sections it needs and the
/// factory rejects a configuration that lacks them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Registry key of the device kind ("selene", "pmac", "gaspump").
    pub kind: String,

    /// Channel-name prefix prepended to every field name.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Motion tick rate in Hz.
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: f64,

    /// Interlocked motion units (selene).
    #[serde(default)]
    pub units: Vec<UnitConfig>,

    /// Single free-running motor (pmac).
    #[serde(default)]
    pub motor: Option<MotorConfig>,

    /// Set-point channel names (gaspump).
    #[serde(default)]
    pub channels: Vec<String>,
}

impl DeviceConfig {
    /// Validate the kind-independent parts of the section.
    ///
    /// # Validation Rules
    /// 1. `kind` not empty
    /// 2. `tick_rate_hz` finite, > 0 and giving a representable non-zero dwell
    /// 3. `units.len()` <= MAX_UNITS, unit indices unique, each unit valid
    /// 4. `motor` valid if present
    /// 5. channel names non-empty and unique
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kind.is_empty() {
            return Err(ConfigError::ValidationError(
                "device kind cannot be empty".to_string(),
            ));
        }

        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "tick_rate_hz must be > 0 (got {})",
                self.tick_rate_hz
            )));
        }
        if self.checked_dwell().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "tick_rate_hz {} gives no usable dwell interval",
                self.tick_rate_hz
            )));
        }

        if self.units.len() > MAX_UNITS {
            return Err(ConfigError::ValidationError(format!(
                "Too many units: {} (max {})",
                self.units.len(),
                MAX_UNITS
            )));
        }

        let mut indices = HashSet::new();
        for unit in &self.units {
            unit.validate()?;
            if !indices.insert(unit.index) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate unit index: {}",
                    unit.index
                )));
            }
        }

        if let Some(motor) = &self.motor {
            motor.validate("motor")?;
        }

        let mut names = HashSet::new();
        for channel in &self.channels {
            if channel.is_empty() {
                return Err(ConfigError::ValidationError(
                    "channel name cannot be empty".to_string(),
                ));
            }
            if !names.insert(channel) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate channel name: {channel}"
                )));
            }
        }

        Ok(())
    }

    /// Tick interval derived from `tick_rate_hz`.
    ///
    /// Zero for a rate that `validate` rejects; `MotionSimulator::new`
    /// refuses a zero dwell.
    pub fn dwell(&self) -> Duration {
        self.checked_dwell().unwrap_or(Duration::ZERO)
    }

    fn checked_dwell(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(1.0 / self.tick_rate_hz)
            .ok()
            .filter(|dwell| !dwell.is_zero())
    }

    /// Units section, required to be non-empty.
    pub fn require_units(&self) -> Result<&[UnitConfig], ConfigError> {
        if self.units.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "device kind '{}' requires at least one [[device.units]] entry",
                self.kind
            )));
        }
        Ok(&self.units)
    }

    /// Motor section, required to be present.
    pub fn require_motor(&self) -> Result<&MotorConfig, ConfigError> {
        self.motor.as_ref().ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "device kind '{}' requires a [device.motor] section",
                self.kind
            ))
        })
    }

    /// Channel list, required to be non-empty.
    pub fn require_channels(&self) -> Result<&[String], ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "device kind '{}' requires a non-empty channels list",
                self.kind
            )));
        }
        Ok(&self.channels)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            kind: "selene".to_string(),
            prefix: default_prefix(),
            tick_rate_hz: default_tick_rate_hz(),
            units: Vec::new(),
            motor: None,
            channels: Vec::new(),
        }
    }
}

/// One motion unit: a bank of mutually-interlocked selectors gating one motor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Unit number used in field names (`MCU{index}`), starting at 1.
    pub index: u8,

    /// Number of selector channels in this unit's interlock group.
    pub selectors: usize,

    /// Motor defaults.
    #[serde(default)]
    pub motor: MotorConfig,

    /// Initial fine-adjustment range.
    #[serde(default)]
    pub range: FineRange,
}

impl UnitConfig {
    /// Validate the unit configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index == 0 {
            return Err(ConfigError::ValidationError(
                "unit index must start at 1".to_string(),
            ));
        }
        if self.selectors == 0 || self.selectors > MAX_SELECTORS_PER_UNIT {
            return Err(ConfigError::ValidationError(format!(
                "unit {}: selectors must be in 1..={} (got {})",
                self.index, MAX_SELECTORS_PER_UNIT, self.selectors
            )));
        }
        self.motor.validate(&format!("MCU{}", self.index))
    }
}

/// Motor defaults applied at composition time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorConfig {
    /// Velocity in user units per second (> 0).
    #[serde(default = "default_velocity")]
    pub velocity: f64,

    /// Display precision (decimal places).
    #[serde(default = "default_precision")]
    pub precision: u16,

    /// Seconds to reach velocity. Stored and reported only.
    #[serde(default = "default_acceleration")]
    pub acceleration: f64,

    /// Motor step size in user units (> 0).
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// `[low, high]` user limits. Equal values disable the limit check.
    #[serde(default = "default_user_limits")]
    pub user_limits: [f64; 2],

    /// Initial readback and target position.
    #[serde(default)]
    pub initial_position: f64,
}

impl MotorConfig {
    /// Validate the motor configuration.
    ///
    /// # Validation Rules
    /// 1. `velocity` finite and > 0
    /// 2. `resolution` finite and > 0
    /// 3. `acceleration` finite and >= 0
    /// 4. limits finite and `low <= high`
    /// 5. `initial_position` finite
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if !self.velocity.is_finite() || self.velocity <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "Motor '{}': velocity must be > 0 (got {})",
                name, self.velocity
            )));
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "Motor '{}': resolution must be > 0 (got {})",
                name, self.resolution
            )));
        }
        if !self.acceleration.is_finite() || self.acceleration < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "Motor '{}': acceleration must be >= 0 (got {})",
                name, self.acceleration
            )));
        }
        let [low, high] = self.user_limits;
        if !low.is_finite() || !high.is_finite() || low > high {
            return Err(ConfigError::ValidationError(format!(
                "Motor '{}': user_limits must satisfy low <= high (got [{}, {}])",
                name, low, high
            )));
        }
        if !self.initial_position.is_finite() {
            return Err(ConfigError::ValidationError(format!(
                "Motor '{}': initial_position must be finite",
                name
            )));
        }
        Ok(())
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            velocity: default_velocity(),
            precision: default_precision(),
            acceleration: default_acceleration(),
            resolution: default_resolution(),
            user_limits: default_user_limits(),
            initial_position: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(index: u8) -> UnitConfig {
        UnitConfig {
            index,
            selectors: 18,
            motor: MotorConfig::default(),
            range: FineRange::Narrow,
        }
    }

    #[test]
    fn test_motor_defaults_match_simulator_defaults() {
        let motor = MotorConfig::default();
        assert_eq!(motor.velocity, 0.1);
        assert_eq!(motor.precision, 3);
        assert_eq!(motor.acceleration, 1.0);
        assert_eq!(motor.resolution, 1e-6);
        assert_eq!(motor.user_limits, [0.0, 100.0]);
        assert!(motor.validate("m").is_ok());
    }

    #[test]
    fn test_motor_rejects_non_positive_velocity() {
        for velocity in [0.0, -1.0, f64::NAN] {
            let motor = MotorConfig {
                velocity,
                ..Default::default()
            };
            assert!(matches!(
                motor.validate("m"),
                Err(ConfigError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn test_motor_rejects_non_positive_resolution() {
        let motor = MotorConfig {
            resolution: 0.0,
            ..Default::default()
        };
        let err = motor.validate("m").unwrap_err();
        assert!(err.to_string().contains("resolution"));
    }

    #[test]
    fn test_motor_rejects_inverted_limits() {
        let motor = MotorConfig {
            user_limits: [10.0, 0.0],
            ..Default::default()
        };
        assert!(motor.validate("m").is_err());
    }

    #[test]
    fn test_device_rejects_zero_tick_rate() {
        let config = DeviceConfig {
            tick_rate_hz: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_device_rejects_unrepresentable_dwell() {
        for tick_rate_hz in [1e-300, 1e-25, 1e300] {
            let config = DeviceConfig {
                tick_rate_hz,
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("dwell"), "{tick_rate_hz}: {err}");
            assert_eq!(config.dwell(), Duration::ZERO);
        }

        let slow = DeviceConfig {
            tick_rate_hz: 0.5,
            ..Default::default()
        };
        assert!(slow.validate().is_ok());
        assert_eq!(slow.dwell(), Duration::from_secs(2));
    }

    #[test]
    fn test_device_rejects_duplicate_unit_index() {
        let config = DeviceConfig {
            units: vec![unit(1), unit(1)],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate unit index"));
    }

    #[test]
    fn test_device_rejects_unit_zero() {
        let config = DeviceConfig {
            units: vec![unit(0)],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dwell_from_tick_rate() {
        let config = DeviceConfig::default();
        assert_eq!(config.dwell(), Duration::from_millis(100));
    }

    #[test]
    fn test_require_sections() {
        let config = DeviceConfig::default();
        assert!(config.require_units().is_err());
        assert!(config.require_motor().is_err());
        assert!(config.require_channels().is_err());

        let config = DeviceConfig {
            units: vec![unit(1)],
            ..Default::default()
        };
        assert_eq!(config.require_units().unwrap().len(), 1);
    }
}
