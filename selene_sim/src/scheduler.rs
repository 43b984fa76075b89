//! Tick scheduling.
//!
//! One named OS thread per `Tickable` unit. Each thread ticks, measures
//! the tick, then sleeps for the remainder of the unit's dwell until the
//! shared running flag clears. Threads never share mutable state beyond
//! what the units themselves synchronize.

use selene_common::device::driver::{SimError, Tickable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest single sleep; bounds shutdown latency for slow tick rates.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Timing statistics of one tick loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Number of ticks executed
    pub tick_count: u64,
    /// Ticks that took longer than the dwell
    pub overruns: u64,
    /// Longest observed tick
    pub max_tick_us: u64,
    /// Sum of tick times for average calculation
    pub total_tick_us: u64,
}

impl TickStats {
    /// Average tick time in microseconds.
    pub fn avg_tick_us(&self) -> u64 {
        if self.tick_count == 0 {
            0
        } else {
            self.total_tick_us / self.tick_count
        }
    }

    /// Record one tick; returns true on overrun.
    fn record(&mut self, elapsed: Duration, dwell: Duration) -> bool {
        let tick_us = elapsed.as_micros() as u64;
        self.tick_count += 1;
        self.total_tick_us += tick_us;
        self.max_tick_us = self.max_tick_us.max(tick_us);
        if elapsed > dwell {
            self.overruns += 1;
            true
        } else {
            false
        }
    }
}

/// Running tick thread of one unit.
pub struct TickHandle {
    name: String,
    handle: JoinHandle<TickStats>,
}

impl TickHandle {
    /// Unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the loop to exit and collect its statistics.
    ///
    /// # Errors
    /// `SimError::InitFailed` if the tick thread panicked.
    pub fn join(self) -> Result<TickStats, SimError> {
        self.handle
            .join()
            .map_err(|_| SimError::InitFailed(format!("tick thread '{}' panicked", self.name)))
    }
}

/// Spawn the tick loop of `unit`.
///
/// The loop runs while `running` is set; clear it to stop.
///
/// # Errors
/// `SimError::InitFailed` if the thread cannot be spawned.
pub fn spawn(unit: Arc<dyn Tickable>, running: Arc<AtomicBool>) -> Result<TickHandle, SimError> {
    let name = unit.name().to_string();
    let handle = thread::Builder::new()
        .name(format!("tick-{name}"))
        .spawn(move || tick_loop(unit.as_ref(), &running))
        .map_err(|e| SimError::InitFailed(format!("failed to spawn tick thread '{name}': {e}")))?;
    Ok(TickHandle { name, handle })
}

/// Tick threads of one device.
#[derive(Default)]
pub struct Scheduler {
    handles: Vec<TickHandle>,
}

impl Scheduler {
    /// Spawn one tick thread per unit.
    ///
    /// On failure the threads already started are left to the caller's
    /// running flag.
    pub fn start(
        units: Vec<Arc<dyn Tickable>>,
        running: &Arc<AtomicBool>,
    ) -> Result<Self, SimError> {
        let handles = units
            .into_iter()
            .map(|unit| spawn(unit, Arc::clone(running)))
            .collect::<Result<Vec<_>, _>>()?;
        info!("Scheduler started {} tick threads", handles.len());
        Ok(Self { handles })
    }

    /// Number of tick threads.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True if no unit is ticked.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Join every thread. The running flag must already be cleared.
    pub fn join(self) -> Vec<(String, TickStats)> {
        let mut stats = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let name = handle.name().to_string();
            match handle.join() {
                Ok(s) => stats.push((name, s)),
                Err(e) => warn!("{}", e),
            }
        }
        stats
    }
}

fn tick_loop(unit: &dyn Tickable, running: &AtomicBool) -> TickStats {
    let dwell = unit.dwell();
    let mut stats = TickStats::default();
    debug!("Tick loop '{}' started (dwell={:?})", unit.name(), dwell);

    while running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();
        unit.tick();
        let elapsed = tick_start.elapsed();

        if stats.record(elapsed, dwell)
            && (stats.overruns <= 10 || stats.overruns % 1000 == 0)
        {
            warn!(
                "Tick overrun #{} on '{}': tick took {}us (dwell {}us)",
                stats.overruns,
                unit.name(),
                elapsed.as_micros(),
                dwell.as_micros()
            );
        }

        let deadline = tick_start + dwell;
        loop {
            let now = Instant::now();
            if now >= deadline || !running.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep((deadline - now).min(MAX_SLEEP_SLICE));
        }
    }

    debug!(
        "Tick loop '{}' stopped after {} ticks (avg={}us, max={}us, overruns={})",
        unit.name(),
        stats.tick_count,
        stats.avg_tick_us(),
        stats.max_tick_us,
        stats.overruns
    );
    stats
}

/// Detect if running in real-time mode by checking scheduler policy.
pub fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{sched_getscheduler, SCHED_FIFO, SCHED_RR};
        // SAFETY: sched_getscheduler(0) only queries the calling thread's policy.
        unsafe {
            let policy = sched_getscheduler(0);
            policy == SCHED_FIFO || policy == SCHED_RR
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
