//! Selene Common Library
//!
//! Shared constants, configuration loading and the device interface for
//! the Selene device simulator workspace.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Numeric limits, tolerances and default paths
//! - [`device`] - Device configuration, field types and the `SimDevice` trait
//! - [`prelude`] - Common re-exports for convenience

#![deny(missing_docs)]

pub mod config;
pub mod consts;
pub mod device;
pub mod prelude;
