//! Playback Driver - advances a store once per frame from a [`PlaybackContext`].
//!
//! The driver is the only code that awaits. It pulls frames from the context
//! and feeds their deltas to [`PlaybackStore::advance`] for as long as the
//! store is playing.
//!
//! ```text
//!   ctx.next_frame().await ──► on_frame(store) ──► still playing? ──► store.advance(Δ)
//!            ▲                                          │ no               │
//!            │                                          ▼                  │
//!            └─────────────────────────────────── StopReason::Paused ◄─────┘ (end)
//! ```
//!
//! The play state is checked after every await, so a pause or reset observed
//! during a frame callback never lets another advance through.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use trajview_env::{frame_interval_for, EnvError, FrameTick, PlaybackContext, TokioContext, DEFAULT_FRAME_RATE_HZ};

use crate::clock::Advance;
use crate::store::PlaybackStore;

/// Configuration for a playback driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Render rate in Hz (default: 60)
    pub frame_rate_hz: u32,

    /// Longest frame delta fed to the clock, in ms (default: 250)
    ///
    /// A stalled frame (backgrounded window, debugger) would otherwise jump
    /// playback forward by the whole stall.
    pub max_frame_delta_ms: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            max_frame_delta_ms: 250.0,
        }
    }
}

impl DriverConfig {
    pub fn with_frame_rate(mut self, frame_rate_hz: u32) -> Self {
        self.frame_rate_hz = frame_rate_hz;
        self
    }

    pub fn with_max_frame_delta_ms(mut self, max_frame_delta_ms: f64) -> Self {
        self.max_frame_delta_ms = max_frame_delta_ms;
        self
    }

    /// Nominal time between frames.
    pub fn frame_interval(&self) -> Duration {
        frame_interval_for(self.frame_rate_hz)
    }
}

/// Why [`PlaybackDriver::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Playback hit the end of the recording
    ReachedEnd,
    /// The store was paused (or never playing)
    Paused,
    /// The context stopped delivering frames
    ContextStopped,
}

/// Summary of one driver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverReport {
    /// Frames that reached `advance`
    pub frames: u64,
    pub stop_reason: StopReason,
    /// Store time when the run ended
    pub final_time: u64,
}

/// Drives a [`PlaybackStore`] from a frame source.
///
/// Generic over the context, so the same driver runs against a real display
/// clock or a simulated one.
pub struct PlaybackDriver<Ctx: PlaybackContext> {
    /// Frame source
    pub context: Arc<Ctx>,

    pub config: DriverConfig,

    frames_driven: u64,
}

impl PlaybackDriver<TokioContext> {
    /// Driver paced by the tokio timer at the configured frame rate.
    pub fn realtime(config: DriverConfig) -> Self {
        let context = Arc::new(TokioContext::with_frame_rate(config.frame_rate_hz));
        Self::new(context, config)
    }
}

impl<Ctx: PlaybackContext> PlaybackDriver<Ctx> {
    pub fn new(context: Arc<Ctx>, config: DriverConfig) -> Self {
        Self {
            context,
            config,
            frames_driven: 0,
        }
    }

    /// Total frames advanced over the driver's lifetime.
    pub fn frames_driven(&self) -> u64 {
        self.frames_driven
    }

    /// Advances `store` by one frame of `delta`, capped at
    /// `max_frame_delta_ms`. A paused store is left alone.
    pub fn tick(&mut self, store: &mut PlaybackStore, delta: Duration) -> Advance {
        if !store.is_playing() {
            return Advance::default();
        }
        let delta_ms = (delta.as_secs_f64() * 1000.0).min(self.config.max_frame_delta_ms);
        self.frames_driven += 1;
        store.advance(delta_ms)
    }

    /// Runs until playback ends, pauses, or the context stops.
    pub async fn run(&mut self, store: &mut PlaybackStore) -> Result<DriverReport, EnvError> {
        self.run_with(store, |_, _| {}).await
    }

    /// Like [`run`](Self::run), calling `on_frame` with each frame before it
    /// is applied. The callback may pause, seek or reset the store.
    pub async fn run_with<F>(
        &mut self,
        store: &mut PlaybackStore,
        mut on_frame: F,
    ) -> Result<DriverReport, EnvError>
    where
        F: FnMut(&mut PlaybackStore, &FrameTick),
    {
        let mut frames = 0;

        let stop_reason = loop {
            if !store.is_playing() {
                break StopReason::Paused;
            }

            let tick = match self.context.next_frame().await {
                Ok(tick) => tick,
                Err(e) if e.is_stopped() => break StopReason::ContextStopped,
                Err(e) => return Err(e),
            };

            on_frame(store, &tick);
            if !store.is_playing() {
                break StopReason::Paused;
            }

            let advance = self.tick(store, tick.delta);
            frames += 1;
            if advance.reached_end {
                break StopReason::ReachedEnd;
            }
        };

        debug!(
            "Driver stopped after {} frames: {:?} at {}ms",
            frames,
            stop_reason,
            store.current_time()
        );

        Ok(DriverReport {
            frames,
            stop_reason,
            final_time: store.current_time(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventList, TimelineEvent};
    use crate::trajectory::{Sample, Trajectory};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Fixed-step virtual frame source.
    struct StepContext {
        step: Duration,
        frames: AtomicU64,
        stopped: AtomicBool,
        stop_after: Option<u64>,
    }

    impl StepContext {
        fn new(step_ms: u64) -> Self {
            Self {
                step: Duration::from_millis(step_ms),
                frames: AtomicU64::new(0),
                stopped: AtomicBool::new(false),
                stop_after: None,
            }
        }
    }

    #[async_trait]
    impl PlaybackContext for StepContext {
        fn now(&self) -> Duration {
            self.step * self.frames.load(Ordering::SeqCst) as u32
        }

        fn frame_interval(&self) -> Duration {
            self.step
        }

        async fn next_frame(&self) -> Result<FrameTick, EnvError> {
            if self.stopped.load(Ordering::SeqCst) {
                return Err(EnvError::DriverStopped);
            }
            let index = self.frames.fetch_add(1, Ordering::SeqCst) + 1;
            if self.stop_after.is_some_and(|n| index > n) {
                self.stopped.store(true, Ordering::SeqCst);
                return Err(EnvError::DriverStopped);
            }
            Ok(FrameTick::new(index, self.step, self.now()))
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }

        fn seed(&self) -> u64 {
            0
        }
    }

    fn ten_second_store() -> PlaybackStore {
        let samples = (0..=10)
            .map(|i| Sample::new(i as f64, 0.0, 0.0, i * 1_000, 1.0, 0.0))
            .collect();
        let mut store = PlaybackStore::new();
        store.load_experiment(Trajectory::new("t", "Ten seconds", samples).unwrap());
        store.load_timeline_events(
            EventList::new(vec![
                TimelineEvent::new("start", 0, "Start"),
                TimelineEvent::new("end", 10_000, "End"),
            ])
            .unwrap(),
        );
        store
    }

    #[test]
    fn test_driver_config_default() {
        let config = DriverConfig::default();
        assert_eq!(config.frame_rate_hz, 60);
        assert_eq!(config.max_frame_delta_ms, 250.0);

        let config = config.with_frame_rate(30).with_max_frame_delta_ms(100.0);
        assert_eq!(config.frame_rate_hz, 30);
        assert_eq!(config.max_frame_delta_ms, 100.0);
    }

    #[test]
    fn test_tick_clamps_stalled_frames() {
        let mut driver = PlaybackDriver::new(Arc::new(StepContext::new(16)), DriverConfig::default());
        let mut store = ten_second_store();
        store.play();

        driver.tick(&mut store, Duration::from_secs(5));
        assert_eq!(store.current_time(), 250);
    }

    #[test]
    fn test_tick_ignores_paused_store() {
        let mut driver = PlaybackDriver::new(Arc::new(StepContext::new(16)), DriverConfig::default());
        let mut store = ten_second_store();

        let advance = driver.tick(&mut store, Duration::from_millis(100));
        assert_eq!(advance, Advance::default());
        assert_eq!(store.current_time(), 0);
        assert_eq!(driver.frames_driven(), 0);
    }

    #[tokio::test]
    async fn test_run_to_end() {
        let mut driver = PlaybackDriver::new(Arc::new(StepContext::new(100)), DriverConfig::default());
        let mut store = ten_second_store();
        store.play();

        let report = driver.run(&mut store).await.unwrap();

        assert_eq!(report.stop_reason, StopReason::ReachedEnd);
        assert_eq!(report.frames, 100);
        assert_eq!(report.final_time, 10_000);
        assert!(!store.is_playing());
        assert_eq!(store.selected_event_id(), Some("end"));
    }

    #[tokio::test]
    async fn test_run_not_playing_returns_immediately() {
        let mut driver = PlaybackDriver::new(Arc::new(StepContext::new(100)), DriverConfig::default());
        let mut store = ten_second_store();

        let report = driver.run(&mut store).await.unwrap();
        assert_eq!(report.stop_reason, StopReason::Paused);
        assert_eq!(report.frames, 0);
    }

    #[tokio::test]
    async fn test_pause_in_callback_blocks_next_advance() {
        let mut driver = PlaybackDriver::new(Arc::new(StepContext::new(100)), DriverConfig::default());
        let mut store = ten_second_store();
        store.play();

        let report = driver
            .run_with(&mut store, |store, tick| {
                if tick.index == 5 {
                    store.pause();
                }
            })
            .await
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::Paused);
        assert_eq!(report.frames, 4);
        assert_eq!(store.current_time(), 400);
    }

    #[tokio::test]
    async fn test_reset_in_callback_stops_at_zero() {
        let mut driver = PlaybackDriver::new(Arc::new(StepContext::new(100)), DriverConfig::default());
        let mut store = ten_second_store();
        store.play();

        driver
            .run_with(&mut store, |store, tick| {
                if tick.index == 3 {
                    store.reset();
                }
            })
            .await
            .unwrap();

        assert_eq!(store.current_time(), 0);
        assert_eq!(store.selected_event_id(), None);
    }

    #[tokio::test]
    async fn test_context_stop_ends_run() {
        let mut context = StepContext::new(100);
        context.stop_after = Some(7);
        let mut driver = PlaybackDriver::new(Arc::new(context), DriverConfig::default());
        let mut store = ten_second_store();
        store.play();

        let report = driver.run(&mut store).await.unwrap();
        assert_eq!(report.stop_reason, StopReason::ContextStopped);
        assert_eq!(report.frames, 7);
        assert_eq!(report.final_time, 700);
        assert!(store.is_playing());
    }
}
