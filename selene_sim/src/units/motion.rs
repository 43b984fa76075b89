//! Motor motion simulator.
//!
//! The `MotionSimulator` drives a readback position toward the commanded
//! target at constant velocity, one step per tick:
//! - The step count is recomputed every tick from the remaining distance,
//!   so a target written mid-move redirects the motor without a restart
//! - The final step snaps the readback to the target exactly
//! - Stop, the Go/Pause/Stop mode and the injected `MoveGate` are consulted
//!   on every tick, never cached
//!
//! External writes and ticks may interleave from different threads; the
//! motor state sits behind one mutex held only for O(1) work.

use selene_common::consts::{MIN_STEP_RESOLUTION, MOTION_EPSILON, STEP_ROUNDING_GUARD};
use selene_common::device::config::MotorConfig;
use selene_common::device::driver::{RejectReason, SimError, Tickable};
use selene_common::device::types::{FieldValue, MotorField, MotorStatus, MoveMode};
use static_assertions::assert_impl_all;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

use super::interlock::MoveGate;

/// Motion state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPhase {
    /// Not moving (at target, held, or waiting for permission).
    Idle,
    /// Advancing one step per tick.
    Moving,
}

/// Snapshot of one motor's fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorState {
    /// Last commanded position
    pub target_position: f64,
    /// Current simulated position
    pub readback_position: f64,
    /// Readback in motor steps
    pub raw_readback: f64,
    /// Velocity in user units per second
    pub velocity: f64,
    /// Seconds to reach velocity (reported only)
    pub acceleration_time: f64,
    /// Motor step size in user units
    pub step_resolution: f64,
    /// User low limit
    pub low_limit: f64,
    /// User high limit
    pub high_limit: f64,
    /// Display precision
    pub precision: u16,
    /// A move is in progress
    pub is_moving: bool,
    /// Stop requested, consumed by the next tick
    pub stop_requested: bool,
    /// Go / Pause / Stop mode
    pub mode: MoveMode,
    /// A target was written and the move has not yet completed or aborted
    pub has_pending_target: bool,
    /// Last target write violated the user limits
    pub limit_violation: bool,
    /// Direction of the last step
    pub last_direction_positive: bool,
}

impl MotorState {
    fn from_config(config: &MotorConfig) -> Self {
        let [low_limit, high_limit] = config.user_limits;
        let mut state = Self {
            target_position: config.initial_position,
            readback_position: 0.0,
            raw_readback: 0.0,
            velocity: config.velocity,
            acceleration_time: config.acceleration,
            step_resolution: config.resolution,
            low_limit,
            high_limit,
            precision: config.precision,
            is_moving: false,
            stop_requested: false,
            mode: MoveMode::Go,
            has_pending_target: false,
            limit_violation: false,
            last_direction_positive: true,
        };
        state.set_readback(config.initial_position);
        state
    }

    /// Any pause/stop mode other than `Go`.
    pub fn pause_requested(&self) -> bool {
        self.mode != MoveMode::Go
    }

    /// Not moving and nothing left to do.
    pub fn done_moving(&self) -> bool {
        !self.is_moving && !self.has_pending_target
    }

    /// Limits are enforced only when `high > low`.
    pub fn limits_active(&self) -> bool {
        self.high_limit > self.low_limit
    }

    /// Current phase.
    pub fn phase(&self) -> MotionPhase {
        if self.is_moving {
            MotionPhase::Moving
        } else {
            MotionPhase::Idle
        }
    }

    /// Status word.
    pub fn status(&self) -> MotorStatus {
        let mut status = MotorStatus::empty();
        status.set(MotorStatus::DIRECTION, self.last_direction_positive);
        status.set(MotorStatus::DONE, self.done_moving());
        status.set(MotorStatus::MOVING, self.is_moving);
        if self.limits_active() {
            status.set(
                MotorStatus::PLUS_LS,
                self.readback_position >= self.high_limit,
            );
            status.set(
                MotorStatus::MINUS_LS,
                self.readback_position <= self.low_limit,
            );
        }
        status
    }

    fn set_readback(&mut self, position: f64) {
        self.readback_position = position;
        self.raw_readback = position / self.step_resolution.max(MIN_STEP_RESOLUTION);
    }

    /// Freeze at the current readback and forget the commanded target.
    fn abort(&mut self) {
        self.target_position = self.readback_position;
        self.is_moving = false;
        self.has_pending_target = false;
    }

    fn finish(&mut self) {
        self.is_moving = false;
        self.has_pending_target = false;
    }
}

/// One simulated motor.
pub struct MotionSimulator {
    /// Motor name (e.g. `MCU1`)
    name: String,
    /// Tick interval
    dwell: Duration,
    /// Shared motor fields
    state: Mutex<MotorState>,
    /// Move permission, evaluated every tick
    gate: Arc<dyn MoveGate>,
}

assert_impl_all!(MotionSimulator: Send, Sync);

impl MotionSimulator {
    /// Create a motor at rest at `config.initial_position`.
    ///
    /// # Errors
    /// `SimError::ConfigError` for a non-positive velocity or resolution,
    /// inverted limits, or a zero dwell.
    pub fn new(
        name: impl Into<String>,
        config: &MotorConfig,
        dwell: Duration,
        gate: Arc<dyn MoveGate>,
    ) -> Result<Self, SimError> {
        let name = name.into();
        config.validate(&name)?;
        if dwell.is_zero() {
            return Err(SimError::ConfigError(format!(
                "Motor '{}': dwell must be > 0",
                name
            )));
        }

        debug!(
            "Motor {} created: velocity={}, resolution={}, limits=[{}, {}], dwell={:?}",
            name, config.velocity, config.resolution, config.user_limits[0], config.user_limits[1], dwell
        );

        Ok(Self {
            name,
            dwell,
            state: Mutex::new(MotorState::from_config(config)),
            gate,
        })
    }

    /// Motor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of the current fields.
    pub fn snapshot(&self) -> MotorState {
        *self.lock()
    }

    /// Current phase.
    pub fn phase(&self) -> MotionPhase {
        self.lock().phase()
    }

    /// Command a new target.
    ///
    /// Marks the target pending even when it equals the readback.
    /// With active limits, a target outside them is refused and flags
    /// the limit violation.
    pub fn write_target(&self, position: f64) -> Result<(), RejectReason> {
        if !position.is_finite() {
            return Err(RejectReason::InvalidValue);
        }
        let mut state = self.lock();
        if state.limits_active()
            && (position < state.low_limit || position > state.high_limit)
        {
            state.limit_violation = true;
            debug!(
                "Motor {}: target {} outside [{}, {}]",
                self.name, position, state.low_limit, state.high_limit
            );
            return Err(RejectReason::LimitViolation);
        }
        state.limit_violation = false;
        state.target_position = position;
        state.has_pending_target = true;
        Ok(())
    }

    /// Request a stop; honored on the next tick.
    pub fn request_stop(&self) {
        self.lock().stop_requested = true;
    }

    /// Set the Go / Pause / Stop mode.
    pub fn set_mode(&self, mode: MoveMode) {
        let mut state = self.lock();
        if state.mode != mode {
            debug!("Motor {}: mode {} -> {}", self.name, state.mode, mode);
            state.mode = mode;
        }
    }

    /// Set the velocity (must be > 0).
    pub fn set_velocity(&self, velocity: f64) -> Result<(), RejectReason> {
        if !velocity.is_finite() || velocity <= 0.0 {
            return Err(RejectReason::InvalidValue);
        }
        self.lock().velocity = velocity;
        Ok(())
    }

    /// Set the step resolution (must be > 0).
    pub fn set_resolution(&self, resolution: f64) -> Result<(), RejectReason> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(RejectReason::InvalidValue);
        }
        let mut state = self.lock();
        state.step_resolution = resolution;
        let readback = state.readback_position;
        state.set_readback(readback);
        Ok(())
    }

    /// Set the acceleration time (must be >= 0).
    pub fn set_acceleration(&self, seconds: f64) -> Result<(), RejectReason> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(RejectReason::InvalidValue);
        }
        self.lock().acceleration_time = seconds;
        Ok(())
    }

    /// Set the user low limit. Rejected if it would exceed the high limit.
    pub fn set_low_limit(&self, limit: f64) -> Result<(), RejectReason> {
        if !limit.is_finite() {
            return Err(RejectReason::InvalidValue);
        }
        let mut state = self.lock();
        if limit > state.high_limit {
            return Err(RejectReason::InvalidValue);
        }
        state.low_limit = limit;
        Ok(())
    }

    /// Set the user high limit. Rejected if it would fall below the low limit.
    pub fn set_high_limit(&self, limit: f64) -> Result<(), RejectReason> {
        if !limit.is_finite() {
            return Err(RejectReason::InvalidValue);
        }
        let mut state = self.lock();
        if limit < state.low_limit {
            return Err(RejectReason::InvalidValue);
        }
        state.high_limit = limit;
        Ok(())
    }

    /// Read a motor field.
    pub fn read_field(&self, field: MotorField) -> FieldValue {
        let state = self.snapshot();
        match field {
            MotorField::Val => FieldValue::Double(state.target_position),
            MotorField::Rbv | MotorField::Drbv => FieldValue::Double(state.readback_position),
            MotorField::Rrbv => FieldValue::Int(state.raw_readback.round() as i64),
            MotorField::Velo => FieldValue::Double(state.velocity),
            MotorField::Accl => FieldValue::Double(state.acceleration_time),
            MotorField::Mres => FieldValue::Double(state.step_resolution),
            MotorField::Llm => FieldValue::Double(state.low_limit),
            MotorField::Hlm => FieldValue::Double(state.high_limit),
            MotorField::Movn => FieldValue::Int(i64::from(state.is_moving)),
            MotorField::Dmov => FieldValue::Int(i64::from(state.done_moving())),
            MotorField::Stop => FieldValue::Int(i64::from(state.stop_requested)),
            MotorField::Spmg => FieldValue::Text(state.mode.to_string()),
            MotorField::Lvio => FieldValue::Int(i64::from(state.limit_violation)),
            MotorField::Msta => FieldValue::Int(i64::from(state.status().bits())),
            MotorField::Prec => FieldValue::Int(i64::from(state.precision)),
        }
    }

    /// Write a motor field.
    pub fn write_field(&self, field: MotorField, value: &FieldValue) -> Result<(), RejectReason> {
        if !field.is_writable() {
            return Err(RejectReason::ReadOnly);
        }
        let number = || value.as_f64().ok_or(RejectReason::InvalidValue);
        match field {
            MotorField::Val => self.write_target(number()?),
            MotorField::Velo => self.set_velocity(number()?),
            MotorField::Accl => self.set_acceleration(number()?),
            MotorField::Mres => self.set_resolution(number()?),
            MotorField::Llm => self.set_low_limit(number()?),
            MotorField::Hlm => self.set_high_limit(number()?),
            MotorField::Stop => {
                if value.as_bool().ok_or(RejectReason::InvalidValue)? {
                    self.request_stop();
                }
                Ok(())
            }
            MotorField::Spmg => {
                let mode = MoveMode::from_value(value).ok_or(RejectReason::InvalidValue)?;
                self.set_mode(mode);
                Ok(())
            }
            _ => Err(RejectReason::ReadOnly),
        }
    }

    /// Advance the motor by one tick.
    ///
    /// Order of precedence: stop request, Stop mode, missing permission or
    /// Pause mode (hold), nothing to do, one motion step.
    pub fn tick(&self) {
        // Gate first: it only reads selector atomics, never this mutex.
        let permitted = self.gate.may_move();
        let dwell = self.dwell.as_secs_f64();
        let mut state = self.lock();

        if state.stop_requested {
            state.stop_requested = false;
            if !state.done_moving() {
                debug!(
                    "Motor {}: stopped at {:.6}",
                    self.name, state.readback_position
                );
            }
            state.abort();
            return;
        }

        if state.mode == MoveMode::Stop {
            if !state.done_moving() {
                debug!(
                    "Motor {}: move aborted by Stop mode at {:.6}",
                    self.name, state.readback_position
                );
                state.abort();
            }
            return;
        }

        if !permitted || state.mode == MoveMode::Pause {
            if state.is_moving {
                debug!(
                    "Motor {}: holding at {:.6} (permitted={}, mode={})",
                    self.name, state.readback_position, permitted, state.mode
                );
                state.is_moving = false;
            }
            return;
        }

        let diff = state.target_position - state.readback_position;
        if diff.abs() < MOTION_EPSILON && !state.has_pending_target {
            state.is_moving = false;
            return;
        }

        if !state.is_moving {
            debug!(
                "Motor {}: moving {:.6} -> {:.6}",
                self.name, state.readback_position, state.target_position
            );
            state.is_moving = true;
        }
        if diff != 0.0 {
            state.last_direction_positive = diff > 0.0;
        }

        let total_time = diff.abs() / state.velocity;
        let num_steps = (total_time / dwell + STEP_ROUNDING_GUARD).floor();

        if num_steps <= 1.0 {
            let target = state.target_position;
            state.set_readback(target);
            state.finish();
            debug!("Motor {}: move complete at {:.6}", self.name, target);
        } else {
            let next = state.readback_position + diff / num_steps;
            state.set_readback(next);
            trace!(
                "Motor {}: rbv={:.6}, target={:.6}, steps_left={}",
                self.name,
                next,
                state.target_position,
                num_steps - 1.0
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, MotorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Tickable for MotionSimulator {
    fn name(&self) -> &str {
        &self.name
    }

    fn dwell(&self) -> Duration {
        self.dwell
    }

    fn tick(&self) {
        MotionSimulator::tick(self);
    }
}
