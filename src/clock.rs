//! Lamport clock used to stamp bug creation.
//!
//! One [`LamportClock`] is shared by every bug created in a process. It is
//! constructed explicitly and passed to [`Bug::new`](crate::bug::Bug::new)
//! rather than living in a global.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A point in logical time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LamportTime(u64);

impl LamportTime {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LamportTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A thread-safe, monotonically increasing logical clock.
#[derive(Debug)]
pub struct LamportClock {
    counter: AtomicU64,
}

impl LamportClock {
    /// A fresh clock whose current time is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    /// A clock whose current time is `value`.
    #[must_use]
    pub const fn starting_at(value: u64) -> Self {
        Self {
            counter: AtomicU64::new(value),
        }
    }

    /// The current time, without advancing the clock.
    pub fn time(&self) -> LamportTime {
        LamportTime(self.counter.load(Ordering::SeqCst))
    }

    /// Advance the clock and return the new time.
    ///
    /// Every call returns a value strictly greater than any value returned
    /// before, even under concurrent callers.
    pub fn increment(&self) -> LamportTime {
        LamportTime(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl Default for LamportClock {
    fn default() -> Self {
        Self::new()
    }
}
