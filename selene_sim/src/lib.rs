//! # Selene Simulator Library
//!
//! Motion and interlock simulation for virtual process-control devices.
//!
//! Devices implement the `SimDevice` trait defined in
//! `selene_common::device::driver`; the boundary reads and writes named
//! fields while the scheduler ticks each motor at its dwell rate.
//!
//! # Module Structure
//!
//! - [`units`] - Selector channels, interlock evaluator, motion simulator
//! - [`devices`] - Device kinds (selene, pmac, gaspump)
//! - [`device_registry`] - Device factory registration
//! - [`scheduler`] - Per-unit tick threads and timing statistics
//! - [`core`] - SimCore lifecycle
//! - [`console`] - Line-oriented text boundary
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          selene_sim                              │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │   Console   │───►│  SimDevice   │◄───│  Device Registry    │  │
//! │  │ (read/write)│    │ (composer)   │    │                     │  │
//! │  └─────────────┘    └──────┬───────┘    └─────────────────────┘  │
//! │                            │ tickers()                           │
//! │                            ▼                                     │
//! │   ┌──────────────┐  may_move()  ┌─────────────────┐              │
//! │   │ Interlock    │◄─────────────│ MotionSimulator │◄── Scheduler │
//! │   │ Evaluator    │              │ (one per unit)  │   (1 thread  │
//! │   └──────┬───────┘              └─────────────────┘    per unit) │
//! │          │ owns                                                  │
//! │   ┌──────▼───────┐                                               │
//! │   │ Selector     │                                               │
//! │   │ Channels     │                                               │
//! │   └──────────────┘                                               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod console;
pub mod core;
pub mod device_registry;
pub mod devices;
pub mod scheduler;
pub mod units;

// Re-export key types for convenience
pub use crate::core::SimCore;
pub use crate::device_registry::DeviceRegistry;
pub use crate::devices::DeviceComposer;
pub use crate::units::{InterlockEvaluator, MotionSimulator, SelectorChannel};
