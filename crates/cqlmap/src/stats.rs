//! Call statistics.
//!
//! Counters are plain atomics. Reading them is destructive: [`CallStats::take`]
//! swaps every counter to zero and returns what it held, so successive reads
//! give exact deltas even while other tasks keep counting.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Successful, timed out and failed calls of one kind.
#[derive(Debug, Default)]
pub struct CallCounters {
    call: AtomicU64,
    timeout: AtomicU64,
    bad: AtomicU64,
}

impl CallCounters {
    /// Record a call that completed without error.
    pub fn record_call(&self) {
        self.call.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a local or server-side timeout.
    pub fn record_timeout(&self) {
        self.timeout.fetch_add(1, Ordering::Relaxed);
    }

    /// Record any other failure.
    pub fn record_bad(&self) {
        self.bad.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and zero all three counters.
    pub fn take(&self) -> CallCounts {
        CallCounts {
            call: self.call.swap(0, Ordering::Relaxed),
            timeout: self.timeout.swap(0, Ordering::Relaxed),
            bad: self.bad.swap(0, Ordering::Relaxed),
        }
    }
}

/// A snapshot of [`CallCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallCounts {
    pub call: u64,
    pub timeout: u64,
    pub bad: u64,
}

impl CallCounts {
    pub fn total(&self) -> u64 {
        self.call + self.timeout + self.bad
    }
}

/// Counters for fetches, stores and truncates on one connection.
#[derive(Debug, Default)]
pub struct CallStats {
    pub fetched: CallCounters,
    pub stored: CallCounters,
    pub truncated: CallCounters,
}

impl CallStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and zero every counter.
    pub fn take(&self) -> StatsSnapshot {
        StatsSnapshot {
            fetched: self.fetched.take(),
            stored: self.stored.take(),
            truncated: self.truncated.take(),
        }
    }
}

/// Counts taken by [`CallStats::take`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub fetched: CallCounts,
    pub stored: CallCounts,
    pub truncated: CallCounts,
}

impl StatsSnapshot {
    /// Whether nothing was counted.
    pub fn is_empty(&self) -> bool {
        self.fetched.total() + self.stored.total() + self.truncated.total() == 0
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, counts) in [
            ("fetched", &self.fetched),
            ("stored", &self.stored),
            ("truncated", &self.truncated),
        ] {
            if name != "fetched" {
                f.write_str(" ")?;
            }
            write!(
                f,
                "{}[call={} timeout={} bad={}]",
                name, counts.call, counts.timeout, counts.bad
            )?;
        }
        Ok(())
    }
}
