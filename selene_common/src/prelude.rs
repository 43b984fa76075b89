//! Prelude module for common re-exports.
//!
//! ```rust
//! use selene_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, SimConfig};
pub use crate::device::config::{DeviceConfig, MotorConfig, UnitConfig};

// ─── Device interface ───────────────────────────────────────────────
pub use crate::device::driver::{DeviceFactory, RejectReason, SimDevice, SimError, Tickable};
pub use crate::device::types::{FieldValue, FineRange, MotorField, MotorStatus, MoveMode};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{DEFAULT_TICK_RATE_HZ, MOTION_EPSILON};
