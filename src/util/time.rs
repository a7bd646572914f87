//! Time utilities for the simulation clock

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Default simulation rate
pub const DEFAULT_TICK_RATE_HZ: u32 = 25; // 40 ms period

/// Nominal tick period in milliseconds for a given rate
pub fn tick_period_millis(tick_rate_hz: u32) -> u64 {
    1_000 / tick_rate_hz.max(1) as u64
}

/// Nominal tick period for a given rate
pub fn tick_period(tick_rate_hz: u32) -> Duration {
    Duration::from_millis(tick_period_millis(tick_rate_hz))
}

/// Seconds elapsed between two millisecond timestamps (never negative)
pub fn delta_seconds(previous_ms: u64, now_ms: u64) -> f64 {
    now_ms.saturating_sub(previous_ms) as f64 / 1_000.0
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
