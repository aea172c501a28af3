//! SimWorld - store, virtual frame source and driver wired together.

use crate::context::SimContext;
use crate::generator::{demo_events, RouteGenerator, ROAD_NOISE};

use std::sync::Arc;
use trajview_core::{
    Advance, DriverConfig, DriverReport, EventList, PlaybackDriver, PlaybackStore, Pose,
    Trajectory, TrajectoryError, ViewMode,
};
use trajview_env::{EnvError, FrameTick, PlaybackContext, DEFAULT_FRAME_RATE_HZ};

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Render rate in Hz
    pub frame_rate_hz: u32,

    /// Standard deviation of frame jitter in ms
    pub jitter_ms: f64,

    /// Amplitude of the generated route's road noise
    pub route_noise: f64,

    /// Longest frame delta the driver feeds the clock
    pub max_frame_delta_ms: f64,

    /// Camera mode used for recorded poses
    pub view_mode: ViewMode,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            jitter_ms: 0.0,
            route_noise: ROAD_NOISE,
            max_frame_delta_ms: DriverConfig::default().max_frame_delta_ms,
            view_mode: ViewMode::Free,
        }
    }
}

impl SimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate_hz: u32) -> Self {
        self.frame_rate_hz = frame_rate_hz;
        self
    }

    pub fn with_jitter_ms(mut self, jitter_ms: f64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    pub fn with_view_mode(mut self, view_mode: ViewMode) -> Self {
        self.view_mode = view_mode;
        self
    }

    /// Seed for the demo route. Mixed so it differs from the frame jitter seed.
    pub fn route_seed(&self) -> u64 {
        self.seed.wrapping_mul(0x9e3779b97f4a7c15)
    }

    /// Generator for the demo route this configuration plays.
    pub fn route_generator(&self) -> RouteGenerator {
        RouteGenerator::new(self.route_seed()).with_noise(self.route_noise)
    }
}

/// The SimWorld - container for one simulated playback session.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual frame clock)
    pub context: Arc<SimContext>,

    /// The store under test
    pub store: PlaybackStore,

    driver: PlaybackDriver<SimContext>,
}

impl SimWorld {
    /// Creates a world playing the generated demo route and timeline.
    pub fn new(config: SimConfig) -> Result<Self, TrajectoryError> {
        let trajectory = config.route_generator().trajectory()?;
        Ok(Self::with_recording(config, trajectory, demo_events()))
    }

    /// Creates a world around an existing recording.
    pub fn with_recording(config: SimConfig, trajectory: Trajectory, events: EventList) -> Self {
        let context = Arc::new(
            SimContext::new(config.seed, config.frame_rate_hz).with_jitter_ms(config.jitter_ms),
        );
        let driver_config = DriverConfig::default()
            .with_frame_rate(config.frame_rate_hz)
            .with_max_frame_delta_ms(config.max_frame_delta_ms);
        let driver = PlaybackDriver::new(context.clone(), driver_config);

        let mut store = PlaybackStore::new();
        store.load_experiment(trajectory);
        store.load_timeline_events(events);

        Self {
            config,
            context,
            store,
            driver,
        }
    }

    /// Pulls one frame from the virtual clock and applies it.
    pub fn tick(&mut self) -> Result<(FrameTick, Advance), EnvError> {
        let frame = self.context.step_frame()?;
        let advance = self.driver.tick(&mut self.store, frame.delta);
        Ok((frame, advance))
    }

    /// Applies an arbitrary frame delta, e.g. a simulated stall.
    pub fn tick_with(&mut self, delta: std::time::Duration) -> Advance {
        self.context.advance_time(delta);
        self.driver.tick(&mut self.store, delta)
    }

    /// Drives playback through the async driver until it stops.
    pub async fn run(&mut self) -> Result<DriverReport, EnvError> {
        self.driver.run(&mut self.store).await
    }

    /// Like [`run`](Self::run), observing every frame before it is applied.
    pub async fn run_with<F>(&mut self, on_frame: F) -> Result<DriverReport, EnvError>
    where
        F: FnMut(&mut PlaybackStore, &FrameTick),
    {
        self.driver.run_with(&mut self.store, on_frame).await
    }

    /// Pose in the configured view mode.
    pub fn pose(&self) -> Option<Pose> {
        self.store.pose(self.config.view_mode)
    }

    /// Virtual time in seconds.
    pub fn time(&self) -> f64 {
        self.context.now().as_secs_f64()
    }

    /// Frames applied to the store.
    pub fn frame_count(&self) -> u64 {
        self.driver.frames_driven()
    }
}
