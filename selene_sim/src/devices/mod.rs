//! Simulated device kinds.
//!
//! - [`selene`] - Interlocked selector banks gating their motors
//! - [`pmac`] - Single free-running motor
//! - [`gaspump`] - Gas pump set-points with echoed readbacks
//!
//! # Adding New Devices
//!
//! 1. Create a new submodule under `devices/`
//! 2. Implement the `SimDevice` trait from `selene_common::device::driver`
//! 3. Register its factory in [`register_all_devices`]

pub mod gaspump;
pub mod pmac;
pub mod selene;

use selene_common::device::config::DeviceConfig;
use selene_common::device::driver::{SimDevice, SimError};

use crate::device_registry::DeviceRegistry;

pub use gaspump::GasPumpDevice;
pub use pmac::PmacDevice;
pub use selene::{DeviceComposer, MotionUnit};

/// Factory for the `selene` kind.
pub fn create_selene(config: &DeviceConfig) -> Result<Box<dyn SimDevice>, SimError> {
    Ok(Box::new(DeviceComposer::new(config)?))
}

/// Factory for the `pmac` kind.
pub fn create_pmac(config: &DeviceConfig) -> Result<Box<dyn SimDevice>, SimError> {
    Ok(Box::new(PmacDevice::new(config)?))
}

/// Factory for the `gaspump` kind.
pub fn create_gaspump(config: &DeviceConfig) -> Result<Box<dyn SimDevice>, SimError> {
    Ok(Box::new(GasPumpDevice::new(config)?))
}

/// Register all built-in device kinds.
pub fn register_all_devices(registry: &mut DeviceRegistry) {
    registry.register(selene::KIND, create_selene);
    registry.register(pmac::KIND, create_pmac);
    registry.register(gaspump::KIND, create_gaspump);
}
