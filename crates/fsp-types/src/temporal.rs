use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Logical timestamp attached to a cached field set.
///
/// Timestamps come from one [`LogicalClock`] per store and are strictly
/// increasing across every load and store it performs. They are not wall
/// clock values and only compare meaningfully within one store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The zero timestamp; older than anything a clock hands out.
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn from_raw(tick: u64) -> Self {
        Self(tick)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns `true` if this timestamp is strictly after `other`.
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Monotonic tick source.
#[derive(Debug, Default)]
pub struct LogicalClock {
    last: AtomicU64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next timestamp. Never returns [`Timestamp::zero`].
    pub fn tick(&self) -> Timestamp {
        Timestamp(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The most recently issued timestamp.
    pub fn current(&self) -> Timestamp {
        Timestamp(self.last.load(Ordering::SeqCst))
    }
}
