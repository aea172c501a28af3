//! Simulation context implementing PlaybackContext with a virtual frame clock.

use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use trajview_env::{frame_interval_for, EnvError, FrameTick, PlaybackContext};

/// Shortest frame the simulated renderer will ever report.
pub const MIN_FRAME: Duration = Duration::from_millis(1);

/// Simulation context backed by virtual time and a seeded RNG.
///
/// This implements `PlaybackContext` using:
/// - A virtual clock that only moves when a frame is requested
/// - Gaussian frame jitter drawn from a seeded ChaCha8 RNG
/// - No real sleeping, so a minute of playback runs in microseconds
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Nominal frame interval
    frame_interval: Duration,

    /// Standard deviation of frame jitter in ms (0 = perfectly regular)
    jitter_ms: f64,

    state: Arc<Mutex<VirtualClock>>,

    stopped: Arc<AtomicBool>,
}

#[derive(Debug)]
struct VirtualClock {
    /// Current virtual time (nanoseconds since simulation start)
    time_ns: u64,
    frames: u64,
    rng: ChaCha8Rng,
}

impl SimContext {
    /// Creates a context at `frame_rate_hz` with regular frames.
    pub fn new(seed: u64, frame_rate_hz: u32) -> Self {
        Self {
            seed,
            frame_interval: frame_interval_for(frame_rate_hz),
            jitter_ms: 0.0,
            state: Arc::new(Mutex::new(VirtualClock {
                time_ns: 0,
                frames: 0,
                rng: ChaCha8Rng::seed_from_u64(seed),
            })),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Adds Gaussian jitter with the given standard deviation to every frame.
    pub fn with_jitter_ms(mut self, jitter_ms: f64) -> Self {
        self.jitter_ms = if jitter_ms.is_finite() { jitter_ms.max(0.0) } else { 0.0 };
        self
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64, frame_rate_hz: u32) -> Arc<Self> {
        Arc::new(Self::new(seed, frame_rate_hz))
    }

    /// Moves virtual time forward without producing a frame (a stall).
    pub fn advance_time(&self, duration: Duration) {
        self.lock().time_ns += duration.as_nanos() as u64;
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        self.lock().time_ns
    }

    /// Frames produced so far.
    pub fn frame_count(&self) -> u64 {
        self.lock().frames
    }

    pub fn jitter_ms(&self) -> f64 {
        self.jitter_ms
    }

    /// Produces the next frame immediately. `next_frame` without the await.
    pub fn step_frame(&self) -> Result<FrameTick, EnvError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(EnvError::DriverStopped);
        }

        let mut clock = self.lock();
        let delta = self.next_delta(&mut clock);
        clock.time_ns += delta.as_nanos() as u64;
        clock.frames += 1;

        Ok(FrameTick::new(clock.frames, delta, Duration::from_nanos(clock.time_ns)))
    }

    fn lock(&self) -> MutexGuard<'_, VirtualClock> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Draws the next frame delta: nominal interval plus jitter, at least 1ms.
    fn next_delta(&self, clock: &mut VirtualClock) -> Duration {
        if self.jitter_ms <= 0.0 {
            return self.frame_interval.max(MIN_FRAME);
        }
        let nominal_ms = self.frame_interval.as_secs_f64() * 1000.0;
        let delta_ms = match Normal::new(nominal_ms, self.jitter_ms) {
            Ok(normal) => normal.sample(&mut clock.rng),
            Err(_) => nominal_ms,
        };
        Duration::from_secs_f64(delta_ms.max(0.0) / 1000.0).max(MIN_FRAME)
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            frame_interval: self.frame_interval,
            jitter_ms: self.jitter_ms,
            state: Arc::clone(&self.state),
            stopped: Arc::clone(&self.stopped),
        }
    }
}

#[async_trait]
impl PlaybackContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    async fn next_frame(&self) -> Result<FrameTick, EnvError> {
        self.step_frame()
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sim_context_regular_frames() {
        let ctx = SimContext::new(42, 50);
        assert_eq!(ctx.now(), Duration::ZERO);

        let first = ctx.next_frame().await.unwrap();
        assert_eq!(first.index, 1);
        assert_eq!(first.delta, Duration::from_millis(20));

        ctx.next_frame().await.unwrap();
        assert_eq!(ctx.now(), Duration::from_millis(40));
        assert_eq!(ctx.frame_count(), 2);
    }

    #[tokio::test]
    async fn test_sim_context_jitter_is_deterministic() {
        let a = SimContext::new(7, 60).with_jitter_ms(5.0);
        let b = SimContext::new(7, 60).with_jitter_ms(5.0);

        for _ in 0..50 {
            let fa = a.next_frame().await.unwrap();
            let fb = b.next_frame().await.unwrap();
            assert_eq!(fa.delta, fb.delta);
            assert!(fa.delta >= MIN_FRAME);
        }
    }

    #[tokio::test]
    async fn test_sim_context_jitter_varies_frames() {
        let ctx = SimContext::new(3, 60).with_jitter_ms(4.0);
        let first = ctx.next_frame().await.unwrap().delta;

        let mut varied = false;
        for _ in 0..20 {
            if ctx.next_frame().await.unwrap().delta != first {
                varied = true;
            }
        }
        assert!(varied);
    }

    #[tokio::test]
    async fn test_sim_context_stop() {
        let ctx = SimContext::new(1, 60);
        ctx.stop();
        assert!(ctx.next_frame().await.unwrap_err().is_stopped());
    }

    #[test]
    fn test_sim_context_clone_shares_time() {
        let ctx1 = SimContext::new(42, 60);
        let ctx2 = ctx1.clone();

        ctx1.advance_time(Duration::from_secs(5));

        // Both should see the same time
        assert_eq!(ctx1.now(), ctx2.now());
        assert_eq!(ctx2.seed(), 42);
    }
}
