//! Field value and field vocabulary types.
//!
//! This module defines the data exchanged across the device boundary:
//! - `FieldValue` - Dynamically typed value of a named field
//! - `MotorField` - Motor-record style field suffixes (`.VAL`, `.RBV`, ...)
//! - `MoveMode` - Go / Pause / Stop motion mode
//! - `FineRange` - Wide / narrow fine-adjustment range
//! - `MotorStatus` - Motor status bits (`.MSTA`)

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value of a device field as seen by the boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Floating-point value (positions, velocities, ...).
    Double(f64),
    /// Integer value (set-points, status words).
    Int(i64),
    /// Boolean value (enables, flags).
    Bool(bool),
    /// Text value (enum strings, error messages).
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Double(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            FieldValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Integer view of the value. Doubles must be integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Double(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            FieldValue::Double(_) => None,
            FieldValue::Bool(v) => Some(i64::from(*v)),
            FieldValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Boolean view of the value: non-zero numbers, `true`/`1`/`yes`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            FieldValue::Int(v) => Some(*v != 0),
            FieldValue::Double(v) => Some(*v != 0.0),
            FieldValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
        }
    }

    /// Text view of the value.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Parse `text` into the same variant as `template`.
    ///
    /// Used by text front-ends that know a field's current value but not
    /// its declared type.
    pub fn parse_like(template: &FieldValue, text: &str) -> Option<FieldValue> {
        let probe = FieldValue::Text(text.to_string());
        match template {
            FieldValue::Double(_) => probe.as_f64().map(FieldValue::Double),
            FieldValue::Int(_) => probe.as_i64().map(FieldValue::Int),
            FieldValue::Bool(_) => probe.as_bool().map(FieldValue::Bool),
            FieldValue::Text(_) => Some(probe),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Double(v) => write!(f, "{v}"),
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

/// Motor fields, named by their motor-record suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorField {
    /// Commanded target position.
    Val,
    /// User readback.
    Rbv,
    /// Dial readback.
    Drbv,
    /// Raw readback in motor steps.
    Rrbv,
    /// Velocity.
    Velo,
    /// Seconds to velocity.
    Accl,
    /// Motor step resolution.
    Mres,
    /// User low limit.
    Llm,
    /// User high limit.
    Hlm,
    /// Moving flag.
    Movn,
    /// Done-moving flag.
    Dmov,
    /// Stop request.
    Stop,
    /// Go / Pause / Stop mode.
    Spmg,
    /// Limit violation flag.
    Lvio,
    /// Status bit word.
    Msta,
    /// Display precision.
    Prec,
}

impl MotorField {
    /// All fields, in listing order.
    pub const ALL: [MotorField; 16] = [
        MotorField::Val,
        MotorField::Rbv,
        MotorField::Drbv,
        MotorField::Rrbv,
        MotorField::Velo,
        MotorField::Accl,
        MotorField::Mres,
        MotorField::Llm,
        MotorField::Hlm,
        MotorField::Movn,
        MotorField::Dmov,
        MotorField::Stop,
        MotorField::Spmg,
        MotorField::Lvio,
        MotorField::Msta,
        MotorField::Prec,
    ];

    /// Record suffix without the leading dot.
    pub fn suffix(&self) -> &'static str {
        match self {
            MotorField::Val => "VAL",
            MotorField::Rbv => "RBV",
            MotorField::Drbv => "DRBV",
            MotorField::Rrbv => "RRBV",
            MotorField::Velo => "VELO",
            MotorField::Accl => "ACCL",
            MotorField::Mres => "MRES",
            MotorField::Llm => "LLM",
            MotorField::Hlm => "HLM",
            MotorField::Movn => "MOVN",
            MotorField::Dmov => "DMOV",
            MotorField::Stop => "STOP",
            MotorField::Spmg => "SPMG",
            MotorField::Lvio => "LVIO",
            MotorField::Msta => "MSTA",
            MotorField::Prec => "PREC",
        }
    }

    /// Whether the boundary may write this field.
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            MotorField::Val
                | MotorField::Velo
                | MotorField::Accl
                | MotorField::Mres
                | MotorField::Llm
                | MotorField::Hlm
                | MotorField::Stop
                | MotorField::Spmg
        )
    }
}

impl FromStr for MotorField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MotorField::ALL
            .into_iter()
            .find(|field| field.suffix().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Tri-state go / pause / stop command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveMode {
    /// Abort any move and refuse new ones.
    Stop,
    /// Hold the current move; resume on `Go`.
    Pause,
    /// Normal operation.
    #[default]
    Go,
}

impl MoveMode {
    /// Interpret a field value: text name or index (0 = Stop, 1 = Pause, 2 = Go).
    pub fn from_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(s) => s.parse().ok(),
            other => match other.as_i64()? {
                0 => Some(MoveMode::Stop),
                1 => Some(MoveMode::Pause),
                2 => Some(MoveMode::Go),
                _ => None,
            },
        }
    }
}

impl fmt::Display for MoveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MoveMode::Stop => "Stop",
            MoveMode::Pause => "Pause",
            MoveMode::Go => "Go",
        })
    }
}

impl FromStr for MoveMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" => Ok(MoveMode::Stop),
            "pause" => Ok(MoveMode::Pause),
            "go" | "move" => Ok(MoveMode::Go),
            _ => Err(()),
        }
    }
}

/// Fine-adjustment range of a motion unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FineRange {
    /// Wide range.
    Wide,
    /// Narrow range.
    #[default]
    Narrow,
}

impl fmt::Display for FineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FineRange::Wide => "wide",
            FineRange::Narrow => "narrow",
        })
    }
}

impl FromStr for FineRange {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wide" | "0" => Ok(FineRange::Wide),
            "narrow" | "1" => Ok(FineRange::Narrow),
            _ => Err(()),
        }
    }
}

bitflags! {
    /// Motor status word (`.MSTA`), using the motor-record bit positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MotorStatus: u32 {
        /// Last move was in the positive direction.
        const DIRECTION = 0x0001;
        /// Motion is complete.
        const DONE      = 0x0002;
        /// At or beyond the high limit.
        const PLUS_LS   = 0x0004;
        /// Motor is moving.
        const MOVING    = 0x0400;
        /// At or beyond the low limit.
        const MINUS_LS  = 0x2000;
    }
}

impl Default for MotorStatus {
    fn default() -> Self {
        Self::DONE
    }
}
