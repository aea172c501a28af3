//! Core frame-source trait for TrajView playback drivers.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::EnvError;
use crate::types::FrameTick;

/// The central interface for frame timing.
///
/// This trait abstracts the "render loop" so that the playback driver can run
/// against a real display clock (tokio) or a virtual one (simulation).
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, paced at a fixed frame rate
/// - **Simulation**: `SimContext` - virtual clock with seeded frame jitter
///
/// # Determinism
///
/// Frame intervals are not guaranteed to be uniform. Consumers must accept any
/// positive delta reported in a [`FrameTick`], and a simulated context may
/// deliberately vary it.
#[async_trait]
pub trait PlaybackContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;
    
    /// Returns the nominal interval between frames (e.g. 16ms at 60Hz).
    fn frame_interval(&self) -> Duration;
    
    /// Suspends until the next frame is due and reports it.
    ///
    /// In production: sleeps until the next frame deadline
    /// In simulation: advances the virtual clock by one (possibly jittered) frame
    ///
    /// # Returns
    /// * `Ok(tick)` - The frame that is now due
    /// * `Err(EnvError::DriverStopped)` - The context was stopped; no more frames
    async fn next_frame(&self) -> Result<FrameTick, EnvError>;
    
    /// Stops the frame source. Subsequent `next_frame` calls fail with
    /// `EnvError::DriverStopped`.
    fn stop(&self);
    
    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    /// In simulation, returns the master seed.
    fn seed(&self) -> u64;
}
