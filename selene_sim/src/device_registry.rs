//! Device registry.
//!
//! Maps a device kind to its factory. Built at startup and handed to
//! `SimCore`; there is no global registry.

use selene_common::device::config::DeviceConfig;
use selene_common::device::driver::{DeviceFactory, SimDevice, SimError};
use std::collections::HashMap;

use crate::devices::register_all_devices;

/// Registry of available device kinds.
pub struct DeviceRegistry {
    factories: HashMap<&'static str, DeviceFactory>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in device kind.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        register_all_devices(&mut registry);
        registry
    }

    /// Register a device factory.
    ///
    /// # Panics
    /// Panics if a device with the same kind is already registered.
    pub fn register(&mut self, kind: &'static str, factory: DeviceFactory) {
        if self.factories.contains_key(kind) {
            panic!("Device kind '{kind}' is already registered");
        }
        self.factories.insert(kind, factory);
    }

    /// Get a device factory by kind.
    pub fn get_factory(&self, kind: &str) -> Option<DeviceFactory> {
        self.factories.get(kind).copied()
    }

    /// Create a device of the kind named in `config`.
    ///
    /// # Errors
    /// `SimError::DeviceNotFound` if the kind is not registered; any error
    /// returned by the factory.
    pub fn create_device(&self, config: &DeviceConfig) -> Result<Box<dyn SimDevice>, SimError> {
        let factory = self
            .get_factory(&config.kind)
            .ok_or_else(|| SimError::DeviceNotFound(config.kind.clone()))?;
        factory(config)
    }

    /// List all registered kinds, sorted.
    pub fn list_devices(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
