//! Common types for the TrajView frame-driver abstraction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Nominal frame rate of the renderer.
pub const DEFAULT_FRAME_RATE_HZ: u32 = 60;

/// A single frame delivered by a [`crate::PlaybackContext`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameTick {
    /// Monotonic frame counter (first frame is 1)
    pub index: u64,
    
    /// Time elapsed since the previous frame
    pub delta: Duration,
    
    /// Context time at which this frame fired
    pub at: Duration,
}

impl FrameTick {
    /// Creates a new frame tick.
    pub fn new(index: u64, delta: Duration, at: Duration) -> Self {
        Self { index, delta, at }
    }
    
    /// Returns the frame delta in (fractional) milliseconds.
    pub fn delta_ms(&self) -> f64 {
        self.delta.as_secs_f64() * 1000.0
    }
}

impl std::fmt::Display for FrameTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame #{} (+{:.1}ms)", self.index, self.delta_ms())
    }
}

/// Returns the nominal frame interval for a frame rate.
///
/// A rate of zero is treated as 1Hz.
pub fn frame_interval_for(rate_hz: u32) -> Duration {
    Duration::from_secs_f64(1.0 / rate_hz.max(1) as f64)
}
