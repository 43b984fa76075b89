//! Simulated device vocabulary.
//!
//! Configuration, field types and the device trait shared between the
//! simulator core and whatever boundary exposes it.

pub mod config;
pub mod driver;
pub mod types;
