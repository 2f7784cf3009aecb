//! Time utilities for the weapon simulation

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

/// Tick rate defaults
pub const DEFAULT_SIMULATION_TPS: u32 = 60; // 60 ticks per second
pub const DEFAULT_SNAPSHOT_TPS: u32 = 20; // 20 periodic states per second

/// Fixed-step simulation clock.
///
/// Every timer in the weapon machines is an absolute deadline in seconds on this
/// clock. Time is derived from the tick counter so owner and replica agree
/// bit-for-bit after the same number of ticks.
#[derive(Debug, Clone)]
pub struct SimClock {
    tick: u64,
    tick_rate: u32,
}

impl SimClock {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick: 0,
            tick_rate: tick_rate.max(1),
        }
    }

    /// Advance one step, returns the new tick
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Current simulation time in seconds
    pub fn now(&self) -> f64 {
        self.tick as f64 / self.tick_rate as f64
    }

    /// Step length in seconds
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Wall-clock duration of one step, for the host loop
    pub fn step_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate as u64)
    }
}

/// Slack for comparing tick-derived times against deadlines built from
/// `f32` durations
pub const TIME_EPSILON: f64 = 1e-6;

/// Whether `deadline` has passed at `now`
#[inline]
pub fn reached(now: f64, deadline: f64) -> bool {
    now + TIME_EPSILON >= deadline
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATION_TPS)
    }
}
