//! Simulated time source for deterministic testing.
//!
//! This module provides a controlled time source that allows tests to
//! advance time explicitly, so incident timestamps are predictable.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::time::TimeSource;

/// A simulated time source for deterministic testing.
///
/// Unlike [`SystemTimeSource`](crate::time::SystemTimeSource), this
/// implementation does not use the real system clock. Time only advances
/// when explicitly told to.
///
/// # Example
///
/// ```
/// use race_hub::simulation::SimulatedTimeSource;
/// use race_hub::time::TimeSource;
///
/// let time = SimulatedTimeSource::new(1000);
/// assert_eq!(time.now_ms(), 1000);
///
/// time.advance(100);
/// assert_eq!(time.now_ms(), 1100);
///
/// time.set(5000);
/// assert_eq!(time.now_ms(), 5000);
/// ```
#[derive(Debug)]
pub struct SimulatedTimeSource {
    /// Current simulated time in milliseconds since Unix epoch.
    current_time_ms: AtomicU64,
}

impl SimulatedTimeSource {
    /// Create a new simulated time source with the given initial time.
    #[must_use]
    pub const fn new(initial_time_ms: u64) -> Self {
        Self {
            current_time_ms: AtomicU64::new(initial_time_ms),
        }
    }

    /// Start at `1_700_000_000_000` (2023-11-14 22:13:20 UTC).
    #[must_use]
    pub const fn default_start() -> Self {
        Self::new(1_700_000_000_000)
    }

    /// Advance time by the given number of milliseconds, saturating at `u64::MAX`.
    pub fn advance(&self, ms: u64) {
        // The closure never returns `None`, so the update always succeeds.
        let _ = self
            .current_time_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| Some(t.saturating_add(ms)));
    }

    /// Set the current time to a specific value.
    pub fn set(&self, time_ms: u64) {
        self.current_time_ms.store(time_ms, Ordering::SeqCst);
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now_ms(&self) -> u64 {
        self.current_time_ms.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedTimeSource {
    fn default() -> Self {
        Self::default_start()
    }
}
