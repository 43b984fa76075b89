//! Device trait and error types.
//!
//! This module defines:
//! - `SimDevice` trait - Interface the boundary uses to read/write fields
//! - `Tickable` trait - A unit the scheduler advances once per dwell
//! - `SimError` / `RejectReason` - Error taxonomy
//! - `DeviceFactory` type alias - Factory function type

use crate::config::ConfigError;
use crate::device::config::DeviceConfig;
use crate::device::types::FieldValue;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a write was refused. The device state is unchanged in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// An interlock forbids the requested state.
    Interlock,
    /// The field is a readback.
    ReadOnly,
    /// The target lies outside the user limits.
    LimitViolation,
    /// The value has the wrong type or is out of its valid domain.
    InvalidValue,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RejectReason::Interlock => "interlock",
            RejectReason::ReadOnly => "read-only field",
            RejectReason::LimitViolation => "limit violation",
            RejectReason::InvalidValue => "invalid value",
        })
    }
}

/// Error types for device operations.
#[derive(Debug, Clone, Error)]
pub enum SimError {
    /// A write was refused; the boundary decides whether to report it.
    #[error("Write to '{field}' rejected: {reason}")]
    Rejected {
        /// Field name as addressed by the caller.
        field: String,
        /// Refusal reason.
        reason: RejectReason,
    },

    /// No such field on this device.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Invalid device parameters (fatal, before ticking starts).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No device registered under this kind.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Runtime startup failed.
    #[error("Initialization failed: {0}")]
    InitFailed(String),
}

impl SimError {
    /// Shorthand for a rejected write.
    pub fn rejected(field: impl Into<String>, reason: RejectReason) -> Self {
        SimError::Rejected {
            field: field.into(),
            reason,
        }
    }

    /// True for the rejected-write family.
    pub fn is_rejection(&self) -> bool {
        matches!(self, SimError::Rejected { .. })
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        SimError::ConfigError(e.to_string())
    }
}

/// A unit advanced periodically by the scheduler.
///
/// `tick()` does O(1) work and advances at most one motion step.
pub trait Tickable: Send + Sync {
    /// Unit name (used for thread names and logging).
    fn name(&self) -> &str;

    /// Interval between ticks.
    fn dwell(&self) -> Duration;

    /// Advance the unit by one tick.
    fn tick(&self);
}

/// Factory function type for creating device instances.
pub type DeviceFactory = fn(&DeviceConfig) -> Result<Box<dyn SimDevice>, SimError>;

/// Trait defining the interface of a simulated device.
///
/// The boundary (console, channel-access server, tests) only ever reads
/// and writes named fields; the scheduler only ever ticks the units
/// returned by `tickers()`.
///
/// # Lifecycle
///
/// 1. Factory builds the device from `DeviceConfig` (all validation here)
/// 2. `tickers()` are handed to the scheduler
/// 3. `read()` / `write()` may be called from any thread at any time
pub trait SimDevice: Send + Sync {
    /// Registry key of this device kind.
    fn kind(&self) -> &'static str;

    /// Channel-name prefix.
    fn prefix(&self) -> &str;

    /// All field names, relative to the prefix, in listing order.
    fn field_names(&self) -> Vec<String>;

    /// Read the current value of a field.
    ///
    /// `field` may be relative or carry the device prefix.
    fn read(&self, field: &str) -> Result<FieldValue, SimError>;

    /// Write a field.
    ///
    /// # Errors
    /// `SimError::Rejected` when an interlock, limit or read-only constraint
    /// refuses the write (state unchanged); `SimError::UnknownField` for
    /// names the device does not have.
    fn write(&self, field: &str, value: FieldValue) -> Result<(), SimError>;

    /// Units that must be ticked periodically.
    /// Default: none.
    fn tickers(&self) -> Vec<Arc<dyn Tickable>> {
        Vec::new()
    }
}

/// Strip the device prefix from a field name if present.
pub fn relative_name<'a>(prefix: &str, field: &'a str) -> &'a str {
    if prefix.is_empty() {
        return field;
    }
    field.strip_prefix(prefix).unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_error_display() {
        let err = SimError::rejected("P2:Select", RejectReason::Interlock);
        assert!(err.to_string().contains("P2:Select"));
        assert!(err.to_string().contains("interlock"));
        assert!(err.is_rejection());

        let err = SimError::DeviceNotFound("ethercat".to_string());
        assert!(err.to_string().contains("ethercat"));
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_config_error_converts() {
        let err: SimError = ConfigError::ValidationError("velocity".to_string()).into();
        assert!(matches!(err, SimError::ConfigError(msg) if msg.contains("velocity")));
    }

    #[test]
    fn test_relative_name() {
        assert_eq!(relative_name("SQ:", "SQ:MCU1"), "MCU1");
        assert_eq!(relative_name("SQ:", "MCU1"), "MCU1");
        assert_eq!(relative_name("", "SQ:MCU1"), "SQ:MCU1");
    }
}
