//! Production implementation of PlaybackContext using Tokio.

use crate::error::EnvError;
use crate::types::{frame_interval_for, FrameTick, DEFAULT_FRAME_RATE_HZ};
use crate::PlaybackContext;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Production context paced by the Tokio timer.
///
/// This is the "real" implementation used when a window is on screen.
/// Frames are scheduled at a fixed rate from the previous frame; the reported
/// delta is the wall-clock time actually elapsed, so a late frame reports a
/// longer interval instead of being dropped.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
    
    /// Nominal interval between frames
    frame_interval: Duration,
    
    /// When the previous frame fired
    last_frame: Mutex<Instant>,
    
    /// Frames delivered so far
    frame_count: AtomicU64,
    
    /// Set once `stop()` is called
    stopped: AtomicBool,
}

impl TokioContext {
    /// Creates a new TokioContext at the default frame rate (60Hz).
    pub fn new() -> Self {
        Self::with_frame_rate(DEFAULT_FRAME_RATE_HZ)
    }
    
    /// Creates a context that delivers `rate_hz` frames per second.
    pub fn with_frame_rate(rate_hz: u32) -> Self {
        let start = Instant::now();
        Self {
            start,
            frame_interval: frame_interval_for(rate_hz),
            last_frame: Mutex::new(start),
            frame_count: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
        }
    }
    
    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
    
    /// Returns the number of frames delivered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Acquire)
    }
    
    fn last_frame(&self) -> Instant {
        *self.last_frame.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaybackContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
    
    fn frame_interval(&self) -> Duration {
        self.frame_interval
    }
    
    async fn next_frame(&self) -> Result<FrameTick, EnvError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(EnvError::DriverStopped);
        }
        
        let deadline = self.last_frame() + self.frame_interval;
        tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        
        // stop() may have been called while we slept
        if self.stopped.load(Ordering::Acquire) {
            return Err(EnvError::DriverStopped);
        }
        
        let now = Instant::now();
        let delta = {
            let mut last = self.last_frame.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let delta = now.saturating_duration_since(*last);
            *last = now;
            delta
        };
        let index = self.frame_count.fetch_add(1, Ordering::AcqRel) + 1;
        
        Ok(FrameTick::new(index, delta, now.saturating_duration_since(self.start)))
    }
    
    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }
    
    fn seed(&self) -> u64 {
        // Production is not seeded
        0
    }
}
