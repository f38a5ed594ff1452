//! Clock and control-number collaborators.
//!
//! Envelope headers (X12 ISA/GS, HL7 MSH) need a timestamp and a control number. Both are
//! supplied by the caller through these traits so builders never read global state, and tests
//! can pin them to fixed values.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU32, Ordering};

/// Source of the current time for envelope headers.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of interchange / message control numbers.
pub trait ControlNumberSequence: Send + Sync {
    /// Returns the next control number, always in `1..=999_999_999`.
    fn next_control_number(&self) -> u32;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Thread-safe in-memory control number sequence.
///
/// Wraps back to 1 after 999,999,999, the largest value an ISA13 control number can carry.
#[derive(Debug)]
pub struct AtomicSequence {
    next: AtomicU32,
}

impl AtomicSequence {
    pub const MAX: u32 = 999_999_999;

    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first.clamp(1, Self::MAX)),
        }
    }
}

impl Default for AtomicSequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl ControlNumberSequence for AtomicSequence {
    fn next_control_number(&self) -> u32 {
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(if current >= Self::MAX { 1 } else { current + 1 })
            })
            .unwrap_or_else(|current| current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_increments_and_wraps() {
        let seq = AtomicSequence::starting_at(AtomicSequence::MAX - 1);
        assert_eq!(seq.next_control_number(), AtomicSequence::MAX - 1);
        assert_eq!(seq.next_control_number(), AtomicSequence::MAX);
        assert_eq!(seq.next_control_number(), 1);
    }

    #[test]
    fn starting_at_zero_is_clamped() {
        let seq = AtomicSequence::starting_at(0);
        assert_eq!(seq.next_control_number(), 1);
    }
}
