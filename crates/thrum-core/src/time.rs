//! Simulation Time
//!
//! Time primitives for driving the world loop:
//! - Monotonic simulation timestamps with millisecond precision
//! - Frame clock advancing sim time from per-frame deltas
//! - Repeating cadence timers for maintenance passes that should not run
//!   every frame

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Monotonic simulation timestamp in milliseconds.
///
/// Sim time starts at zero when the world starts and only ever moves
/// forward; subsystems receive it from the host loop rather than reading a
/// wall clock themselves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimTime(u64);

impl SimTime {
    /// The start of simulation time
    pub const ZERO: Self = Self(0);

    /// Create a timestamp from milliseconds since simulation start
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Create a timestamp from seconds since simulation start
    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs.max(0.0) * 1000.0) as u64)
    }

    /// Get the timestamp as milliseconds since simulation start
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Get the timestamp as seconds since simulation start
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Milliseconds elapsed since an earlier timestamp (zero if `earlier`
    /// is actually later)
    pub fn millis_since(&self, earlier: SimTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl From<Duration> for SimTime {
    fn from(duration: Duration) -> Self {
        Self(duration.as_millis() as u64)
    }
}

/// Frame clock that advances sim time from per-frame deltas.
///
/// The clock owns the world's notion of "now": the host measures a real
/// frame delta, feeds it to [`advance`](FrameClock::advance), and hands the
/// resulting [`SimTime`] to every subsystem that tick. Pausing repeats the
/// same timestamp, which keeps `now` monotonically non-decreasing.
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Total scaled sim time in milliseconds (fractional, so sub-ms deltas
    /// accumulate instead of vanishing)
    elapsed_ms: f64,
    /// Delta of the last frame in milliseconds (after clamp and scale)
    delta_ms: f64,
    /// Frame count
    frame_count: u64,
    /// Time scale (for slow motion or fast forward)
    time_scale: f64,
    /// Whether the simulation is paused
    paused: bool,
}

impl FrameClock {
    /// Create a new frame clock at time zero
    pub fn new() -> Self {
        Self {
            elapsed_ms: 0.0,
            delta_ms: 0.0,
            frame_count: 0,
            time_scale: 1.0,
            paused: false,
        }
    }

    /// Advance the clock by one frame
    pub fn advance(&mut self, delta: Duration) {
        // Clamp delta time to prevent extreme values
        let clamped_secs = delta.as_secs_f64().min(0.25).max(0.0001);

        // Apply time scale
        let scaled_ms = if self.paused {
            0.0
        } else {
            clamped_secs * self.time_scale * 1000.0
        };

        self.delta_ms = scaled_ms;
        self.elapsed_ms += scaled_ms;
        self.frame_count += 1;
    }

    /// Get the current simulation time
    pub fn now(&self) -> SimTime {
        SimTime::from_millis(self.elapsed_ms as u64)
    }

    /// Get the delta of the last frame in milliseconds
    pub fn delta_ms(&self) -> f64 {
        self.delta_ms
    }

    /// Get the frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the time scale
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Set the time scale
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    /// Check if the simulation is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        self.paused = false;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Repeating sim-time timer gating maintenance passes.
///
/// Work with O(population) cost (schedule rebalancing, spatial index
/// rebuilds) runs when [`due`](TickCadence::due) fires rather than every
/// frame. A fire re-arms the timer relative to `now`, so a long stall
/// produces one late pass instead of a burst of catch-up passes.
#[derive(Debug, Clone)]
pub struct TickCadence {
    /// Interval between fires in milliseconds
    interval: u64,
    /// Next fire time in milliseconds
    next_due: u64,
}

impl TickCadence {
    /// Create a cadence firing every `interval` milliseconds (minimum 1)
    pub fn from_millis(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            next_due: 0,
        }
    }

    /// Create a cadence firing `hz` times per second
    pub fn from_hz(hz: f64) -> Self {
        Self::from_millis((1000.0 / hz.max(0.001)) as u64)
    }

    /// Check whether the cadence fires at `now`, re-arming if it does.
    ///
    /// The first call always fires so maintenance runs once at startup.
    pub fn due(&mut self, now: SimTime) -> bool {
        if now.as_millis() >= self.next_due {
            self.next_due = now.as_millis() + self.interval;
            true
        } else {
            false
        }
    }

    /// Get the interval in milliseconds
    pub fn interval_millis(&self) -> u64 {
        self.interval
    }

    /// Re-arm the cadence to next fire one interval after `now`
    pub fn reset(&mut self, now: SimTime) {
        self.next_due = now.as_millis() + self.interval;
    }
}
