//! Periodic replication cadence and traffic accounting

/// Decides on which ticks the periodic state block goes out
#[derive(Debug, Clone)]
pub struct PeriodicCadence {
    /// Ticks since the last periodic block
    ticks_since_send: u32,
    /// Send interval in ticks
    interval: u32,
}

impl PeriodicCadence {
    pub fn new(interval: u32) -> Self {
        Self {
            ticks_since_send: 0,
            interval: interval.max(1),
        }
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Check if it's time to send, counting this tick
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_send += 1;
        if self.ticks_since_send >= self.interval {
            self.ticks_since_send = 0;
            true
        } else {
            false
        }
    }

    /// Send on the next check, e.g. right after a player joins
    pub fn force_next(&mut self) {
        self.ticks_since_send = self.interval;
    }
}

/// Replication traffic counters for debugging
#[derive(Debug, Default, Clone)]
pub struct ReplicationStats {
    pub event_frames: u64,
    pub periodic_frames: u64,
    pub total_bytes: u64,
    pub avg_periodic_bytes: f32,
}

impl ReplicationStats {
    pub fn record_event(&mut self, bytes: usize) {
        self.event_frames += 1;
        self.total_bytes += bytes as u64;
    }

    pub fn record_periodic(&mut self, bytes: usize) {
        self.periodic_frames += 1;
        self.total_bytes += bytes as u64;

        // Running average
        let n = self.periodic_frames as f32;
        self.avg_periodic_bytes = self.avg_periodic_bytes * ((n - 1.0) / n) + (bytes as f32 / n);
    }
}
