//! Wall-clock abstraction for incident timestamps.
//!
//! The simulation stamps incident alerts with the time of day. Reading the
//! clock through a trait keeps the simulation deterministic under test while
//! production reads the system clock.

use std::time::{SystemTime, UNIX_EPOCH};

const MS_PER_SECOND: u64 = 1000;
const SECONDS_PER_DAY: u64 = 86_400;

/// Abstraction over time operations.
pub trait TimeSource {
    /// Get the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;

    /// Current UTC time of day formatted as `HH:MM:SS`.
    fn clock_time(&self) -> String {
        format_clock_time(self.now_ms())
    }
}

/// Real time source using system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    #[allow(clippy::cast_possible_truncation)] // Milliseconds won't overflow u64 for billions of years
    fn now_ms(&self) -> u64 {
        // A clock set before 1970 reads as the epoch rather than failing the tick.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_millis() as u64)
    }
}

/// Format milliseconds since Unix epoch as a UTC `HH:MM:SS` time of day.
#[must_use]
pub fn format_clock_time(epoch_ms: u64) -> String {
    let seconds_of_day = (epoch_ms / MS_PER_SECOND) % SECONDS_PER_DAY;
    let hours = seconds_of_day / 3600;
    let minutes = (seconds_of_day % 3600) / 60;
    let seconds = seconds_of_day % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
