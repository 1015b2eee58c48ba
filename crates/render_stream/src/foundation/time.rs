//! Time measurement and host time-stepping

use std::time::{Duration, Instant};

/// Host time-stepping state
///
/// Once frame data arrives from the link the clock is switched to fixed-delta
/// mode, so every cluster node advances by the controller's delta rather than
/// by its own platform clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    fixed_delta: Option<f64>,
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a clock running on the platform time step
    pub const fn new() -> Self {
        Self {
            fixed_delta: None,
            frame_count: 0,
        }
    }

    /// Force fixed-delta mode with the given step in seconds
    pub fn set_fixed_delta(&mut self, delta_seconds: f64) {
        self.fixed_delta = Some(delta_seconds);
        self.frame_count += 1;
        log::trace!("Fixed time step set to {delta_seconds:.6}s");
    }

    /// Whether the clock is slaved to an external delta
    pub const fn is_fixed(&self) -> bool {
        self.fixed_delta.is_some()
    }

    /// The fixed delta in seconds, if one has been set
    pub const fn fixed_delta(&self) -> Option<f64> {
        self.fixed_delta
    }

    /// Resolve the delta to advance by, preferring the fixed step
    pub fn delta_or(&self, platform_delta: f64) -> f64 {
        self.fixed_delta.unwrap_or(platform_delta)
    }

    /// Number of fixed steps applied so far
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub const fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start_time = Some(Instant::now());
        stopwatch
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        let running = self.start_time.map_or(Duration::ZERO, |start| start.elapsed());
        self.elapsed + running
    }

    /// Get the elapsed time in milliseconds
    pub fn elapsed_millis(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}
