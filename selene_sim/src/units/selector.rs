//! Selector channels.
//!
//! A `SelectorChannel` is a boolean enable unit whose writes are gated by
//! the `InterlockEvaluator` of the group it belongs to. A `RangeSelector`
//! is an ungated wide/narrow switch whose readback follows the request.

use selene_common::device::driver::RejectReason;
use selene_common::device::types::FineRange;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::interlock::InterlockEvaluator;

/// One enable/selectable channel (`P{n}:Select`).
#[derive(Debug)]
pub struct SelectorChannel {
    /// Global channel number (1-based, unique per device)
    number: usize,
    /// Current on/off state
    enabled: AtomicBool,
}

impl SelectorChannel {
    /// Create a disabled channel.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            enabled: AtomicBool::new(false),
        }
    }

    /// Global channel number.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Current enable state.
    pub fn read_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// True iff already enabled or the group currently permits enabling.
    pub fn read_selectable(&self, interlock: &InterlockEvaluator) -> bool {
        self.read_enabled() || interlock.may_enable()
    }

    /// Request a new enable state.
    ///
    /// Disabling always succeeds. Enabling succeeds only while the channel
    /// is selectable; otherwise the request is refused and nothing changes.
    /// Writes within one group are serialized so that two concurrent enable
    /// requests cannot both pass the check.
    pub fn request_enable(
        &self,
        value: bool,
        interlock: &InterlockEvaluator,
    ) -> Result<(), RejectReason> {
        debug_assert!(interlock.contains(self), "channel outside its group");

        let _guard = interlock.write_guard();
        if value == self.read_enabled() {
            return Ok(());
        }
        if value && !self.read_selectable(interlock) {
            debug!("Selector P{} enable refused by interlock", self.number);
            return Err(RejectReason::Interlock);
        }
        self.enabled.store(value, Ordering::Release);
        debug!(
            "Selector P{} {}",
            self.number,
            if value { "enabled" } else { "disabled" }
        );
        Ok(())
    }
}

/// Fine-adjustment range switch (`MCU{u}:FineAdjustment:Select`).
#[derive(Debug)]
pub struct RangeSelector {
    narrow: AtomicBool,
}

impl RangeSelector {
    /// Create a selector in the given range.
    pub fn new(initial: FineRange) -> Self {
        Self {
            narrow: AtomicBool::new(initial == FineRange::Narrow),
        }
    }

    /// Currently selected range.
    pub fn read(&self) -> FineRange {
        if self.narrow.load(Ordering::Acquire) {
            FineRange::Narrow
        } else {
            FineRange::Wide
        }
    }

    /// Select a range; the readback follows immediately.
    pub fn select(&self, range: FineRange) {
        self.narrow
            .store(range == FineRange::Narrow, Ordering::Release);
    }
}
