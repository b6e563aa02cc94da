//! Frame timing.

use std::time::{Duration, Instant};

/// Timing snapshot for one frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,
    /// Seconds since the clock started.
    pub elapsed: f32,
    pub now: Instant,
    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
}

/// Produces [`FrameTime`] snapshots with delta time clamped to
/// `[dt_min, dt_max]`, so a stalled or paused frame cannot fling the
/// camera across the scene.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    /// Clamps of 100 µs and 250 ms.
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Restarts the delta baseline without touching elapsed time.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock as if the tick happened at `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: now.saturating_duration_since(self.start).as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }

    /// Frames ticked so far.
    pub fn frames(&self) -> u64 {
        self.frame_index
    }

    /// Wall time since the clock started.
    pub fn total(&self) -> Duration {
        self.last.saturating_duration_since(self.start)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
