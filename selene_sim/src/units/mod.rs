//! Simulation units.
//!
//! Building blocks composed by the devices:
//!
//! - [`selector`] - Interlock-gated enable channels and range switches
//! - [`interlock`] - Group permissions (`may_enable` / `may_move`)
//! - [`motion`] - Constant-velocity motor simulator

pub mod interlock;
pub mod motion;
pub mod selector;

pub use interlock::{FreeMotion, InterlockEvaluator, MoveGate};
pub use motion::{MotionPhase, MotionSimulator, MotorState};
pub use selector::{RangeSelector, SelectorChannel};
