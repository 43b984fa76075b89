//! Simulator core and lifecycle management.
//!
//! The `SimCore` struct is the main entry point: it creates the configured
//! device through the `DeviceRegistry`, starts one tick thread per unit and
//! stops them again on shutdown.

use selene_common::config::{ConfigLoader, SimConfig};
use selene_common::device::driver::{SimDevice, SimError};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

use crate::device_registry::DeviceRegistry;
use crate::scheduler::{detect_rt_mode, Scheduler, TickStats};

/// Poll interval of `run()` while waiting for shutdown.
const RUN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Simulator core: one device plus its tick threads.
pub struct SimCore {
    /// Simulator configuration
    config: SimConfig,
    /// Available device kinds
    registry: DeviceRegistry,
    /// Active device
    device: Option<Arc<dyn SimDevice>>,
    /// Running flag shared with tick threads and signal handlers. Raised
    /// once at creation; only ever cleared afterwards.
    running: Arc<AtomicBool>,
    /// Tick threads, present while started
    scheduler: Option<Scheduler>,
}

impl SimCore {
    /// Create a core with every built-in device kind registered.
    ///
    /// # Errors
    /// `SimError::ConfigError` if configuration validation fails.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        Self::with_registry(config, DeviceRegistry::with_builtin())
    }

    /// Create a core with a caller-supplied registry.
    pub fn with_registry(config: SimConfig, registry: DeviceRegistry) -> Result<Self, SimError> {
        config.validate()?;

        info!(
            "SimCore created: service='{}', kind='{}', tick_rate={}Hz",
            config.shared.service_name, config.device.kind, config.device.tick_rate_hz
        );

        Ok(Self {
            config,
            registry,
            device: None,
            running: Arc::new(AtomicBool::new(true)),
            scheduler: None,
        })
    }

    /// Load and validate the simulator configuration from a TOML file.
    pub fn load_config(config_path: &Path) -> Result<SimConfig, SimError> {
        info!("Loading configuration from {:?}", config_path);

        let config = SimConfig::load(config_path).map_err(|e| {
            SimError::ConfigError(format!("{:?}: {}", config_path, e))
        })?;
        config.validate()?;

        info!(
            "Loaded config: kind='{}', prefix='{}'",
            config.device.kind, config.device.prefix
        );
        Ok(config)
    }

    /// Create the configured device.
    ///
    /// # Errors
    /// `SimError::DeviceNotFound` for an unknown kind; `SimError::ConfigError`
    /// if the device rejects its configuration.
    pub fn init(&mut self) -> Result<Arc<dyn SimDevice>, SimError> {
        info!("Initializing SimCore with device '{}'...", self.config.device.kind);

        let device: Arc<dyn SimDevice> =
            Arc::from(self.registry.create_device(&self.config.device)?);
        info!(
            "Created device: {} ({} fields, {} ticking units)",
            device.kind(),
            device.field_names().len(),
            device.tickers().len()
        );

        self.device = Some(Arc::clone(&device));
        info!("SimCore initialized successfully");
        Ok(device)
    }

    /// Start ticking. Returns immediately.
    ///
    /// # Errors
    /// `SimError::InitFailed` if the device is missing, already started, or
    /// shutdown was already requested.
    pub fn start(&mut self) -> Result<(), SimError> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| SimError::InitFailed("Device not initialized".to_string()))?;
        if self.scheduler.is_some() {
            return Err(SimError::InitFailed("SimCore already started".to_string()));
        }
        if !self.running.load(Ordering::SeqCst) {
            return Err(SimError::InitFailed(
                "Shutdown requested before start".to_string(),
            ));
        }

        if detect_rt_mode() {
            info!("Running in real-time mode");
        } else {
            info!("Running in standard (non-RT) mode");
        }

        match Scheduler::start(device.tickers(), &self.running) {
            Ok(scheduler) => {
                self.scheduler = Some(scheduler);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Start ticking and block until the running flag clears.
    ///
    /// Returns at once, without ticking, if the flag was cleared before the
    /// call.
    pub fn run(&mut self) -> Result<(), SimError> {
        if !self.running.load(Ordering::SeqCst) {
            info!("Shutdown requested before start, not ticking");
            return Ok(());
        }
        self.start()?;
        while self.running.load(Ordering::SeqCst) {
            thread::sleep(RUN_POLL_INTERVAL);
        }
        Ok(())
    }

    /// Stop the tick threads and collect their statistics.
    pub fn shutdown(&mut self) -> Vec<(String, TickStats)> {
        info!("Shutdown requested");
        self.running.store(false, Ordering::SeqCst);

        let Some(scheduler) = self.scheduler.take() else {
            return Vec::new();
        };
        let stats = scheduler.join();
        for (name, s) in &stats {
            info!(
                "Unit {} stopped after {} ticks (avg={}us, max={}us, overruns={})",
                name,
                s.tick_count,
                s.avg_tick_us(),
                s.max_tick_us,
                s.overruns
            );
        }
        stats
    }

    /// Get the running flag for signal handlers and the console.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// The active device, once initialized.
    pub fn device(&self) -> Option<Arc<dyn SimDevice>> {
        self.device.clone()
    }

    /// The configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

impl Drop for SimCore {
    fn drop(&mut self) {
        if self.scheduler.is_some() {
            self.shutdown();
        }
    }
}
