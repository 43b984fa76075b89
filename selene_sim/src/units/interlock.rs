//! Interlock evaluation.
//!
//! Aggregates the enable state of one selector group into the two
//! permissions the rest of the device consults:
//! - `may_enable()` - true iff every channel in the group is disabled
//! - `may_move()` - true iff at least one channel in the group is enabled
//!
//! Both are recomputed from the channels on every call; nothing is cached.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::selector::SelectorChannel;

/// Permission to move, injected into a `MotionSimulator` at construction.
pub trait MoveGate: Send + Sync {
    /// Whether the gated motor may take a step now.
    fn may_move(&self) -> bool;
}

/// Gate for motors without an interlock.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeMotion;

impl MoveGate for FreeMotion {
    fn may_move(&self) -> bool {
        true
    }
}

/// Interlock evaluator owning one fixed group of selector channels.
#[derive(Debug)]
pub struct InterlockEvaluator {
    /// Group members, fixed at construction
    channels: Vec<SelectorChannel>,
    /// Serializes enable requests within the group
    write_lock: Mutex<()>,
}

impl InterlockEvaluator {
    /// Create a group with one disabled channel per number.
    pub fn new(numbers: impl IntoIterator<Item = usize>) -> Self {
        Self {
            channels: numbers.into_iter().map(SelectorChannel::new).collect(),
            write_lock: Mutex::new(()),
        }
    }

    /// True iff no channel in the group is enabled.
    pub fn may_enable(&self) -> bool {
        self.channels.iter().all(|c| !c.read_enabled())
    }

    /// True iff at least one channel in the group is enabled.
    pub fn may_move(&self) -> bool {
        self.channels.iter().any(SelectorChannel::read_enabled)
    }

    /// Channel by position within the group.
    pub fn channel(&self, slot: usize) -> Option<&SelectorChannel> {
        self.channels.get(slot)
    }

    /// Channel by global number.
    pub fn find(&self, number: usize) -> Option<&SelectorChannel> {
        self.channels.iter().find(|c| c.number() == number)
    }

    /// All channels in group order.
    pub fn channels(&self) -> &[SelectorChannel] {
        &self.channels
    }

    /// Number of channels in the group.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True for a group without channels.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Whether `channel` is a member of this group.
    pub fn contains(&self, channel: &SelectorChannel) -> bool {
        self.channels.iter().any(|c| std::ptr::eq(c, channel))
    }

    pub(crate) fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl MoveGate for InterlockEvaluator {
    fn may_move(&self) -> bool {
        InterlockEvaluator::may_move(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selene_common::device::driver::RejectReason;

    #[test]
    fn test_two_channel_scenario() {
        let group = InterlockEvaluator::new(1..=2);
        let (first, second) = (group.channel(0).unwrap(), group.channel(1).unwrap());

        assert!(group.may_enable());
        assert!(!group.may_move());

        first.request_enable(true, &group).unwrap();
        assert!(!group.may_enable());
        assert!(group.may_move());

        assert_eq!(
            second.request_enable(true, &group),
            Err(RejectReason::Interlock)
        );
        assert!(!second.read_enabled());
        assert!(first.read_enabled());

        first.request_enable(false, &group).unwrap();
        assert!(group.may_enable());
        assert!(!group.may_move());
    }

    #[test]
    fn test_permissions_never_both_true() {
        let group = InterlockEvaluator::new(1..=4);
        let sequence = [(0, true), (1, true), (0, false), (2, true), (2, false), (3, true)];
        for (slot, value) in sequence {
            let _ = group.channel(slot).unwrap().request_enable(value, &group);
            assert!(!(group.may_enable() && group.may_move()));
        }
    }

    #[test]
    fn test_empty_group() {
        let group = InterlockEvaluator::new(std::iter::empty());
        assert!(group.is_empty());
        assert!(group.may_enable());
        assert!(!group.may_move());
    }

    #[test]
    fn test_groups_are_independent() {
        let left = InterlockEvaluator::new(1..=18);
        let right = InterlockEvaluator::new(19..=36);

        left.find(5).unwrap().request_enable(true, &left).unwrap();
        assert!(left.may_move());
        assert!(!right.may_move());
        assert!(right.may_enable());
        right.find(19).unwrap().request_enable(true, &right).unwrap();
        assert!(right.may_move());
    }

    #[test]
    fn test_membership() {
        let left = InterlockEvaluator::new(1..=2);
        let right = InterlockEvaluator::new(3..=4);
        assert!(left.contains(left.channel(1).unwrap()));
        assert!(!left.contains(right.channel(0).unwrap()));
        assert_eq!(right.find(4).unwrap().number(), 4);
        assert!(right.find(1).is_none());
    }

    #[test]
    fn test_free_motion_always_permits() {
        assert!(FreeMotion.may_move());
    }
}
