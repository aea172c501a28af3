//! Scenario runner - executes playback stress scenarios.

use crate::generator::RouteGenerator;
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;
use std::time::Duration;
use tracing::{debug, info};
use trajview_env::PlaybackContext;
use trajview_core::{
    update_selection, EventList, FollowStyle, PlaybackError, PlaybackStore, StoreChange,
    TimelineEvent, ViewMode, MAX_SPEED, MIN_SPEED, SPEED_PRESETS,
};

/// Upper bound on frames for any single playthrough.
const MAX_FRAMES: u64 = 200_000;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total frames applied to the store
    pub total_frames: u64,

    /// Playback time when the scenario ended (ms)
    pub final_time_ms: u64,

    /// Selected event when the scenario ended
    pub final_selection: Option<String>,

    /// First failed assertion, if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Explicit seeks issued
    pub seeks: u64,

    /// Selection change notifications observed
    pub selection_changes: u64,

    /// Times playback stopped at the end
    pub auto_stops: u64,

    /// Largest frame delta delivered by the context (ms)
    pub max_frame_delta_ms: f64,

    /// Largest single-frame jump in playback time (ms)
    pub max_time_step_ms: u64,

    /// Poses resolved and checked
    pub pose_checks: u64,
}

impl ScenarioMetrics {
    fn record_changes(&mut self, changes: &[StoreChange]) {
        self.selection_changes += changes
            .iter()
            .filter(|c| matches!(c, StoreChange::SelectionChanged { .. }))
            .count() as u64;
    }

    fn record_step(&mut self, before: u64, after: u64) {
        self.max_time_step_ms = self.max_time_step_ms.max(after.saturating_sub(before));
    }
}

/// First-failure assertion collector.
#[derive(Debug, Default)]
struct Checks {
    failure: Option<String>,
}

impl Checks {
    fn check(&mut self, ok: bool, message: impl FnOnce() -> String) {
        if !ok && self.failure.is_none() {
            self.failure = Some(message());
        }
    }

    fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// True when the selection is what a fresh nearest-event lookup would pick.
fn selection_consistent(store: &PlaybackStore) -> bool {
    store.selected_event_id() == update_selection(store.events().as_slice(), store.current_time())
}

/// Runs playback scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Render rate in Hz
    frame_rate_hz: u32,

    /// Frame jitter standard deviation in ms
    jitter_ms: f64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            frame_rate_hz: 60,
            jitter_ms: 0.0,
        }
    }

    /// Sets the frame rate.
    pub fn with_frame_rate(mut self, hz: u32) -> Self {
        self.frame_rate_hz = hz;
        self
    }

    /// Sets the frame jitter.
    pub fn with_jitter_ms(mut self, jitter_ms: f64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    /// World configuration shared by all scenarios.
    pub fn config(&self) -> SimConfig {
        SimConfig::default()
            .with_seed(self.seed)
            .with_frame_rate(self.frame_rate_hz)
            .with_jitter_ms(self.jitter_ms)
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let world = match SimWorld::new(self.config()) {
            Ok(world) => world,
            Err(e) => return self.failed(scenario, format!("Failed to build route: {}", e)),
        };

        match scenario {
            ScenarioId::FullPlayback => self.run_full_playback(world),
            ScenarioId::ScrubStorm => self.run_scrub_storm(world),
            ScenarioId::EventJumps => self.run_event_jumps(world),
            ScenarioId::SpeedSweep => self.run_speed_sweep(),
            ScenarioId::FrameJitter => self.run_frame_jitter(),
            ScenarioId::ReloadMidPlay => self.run_reload_mid_play(world),
            ScenarioId::FollowCamera => self.run_follow_camera(world),
        }
    }

    fn failed(&self, scenario: ScenarioId, reason: String) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            total_frames: 0,
            final_time_ms: 0,
            final_selection: None,
            failure_reason: Some(reason),
            metrics: ScenarioMetrics::default(),
        }
    }

    fn finish(
        &self,
        scenario: ScenarioId,
        world: &SimWorld,
        checks: Checks,
        metrics: ScenarioMetrics,
    ) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: checks.passed(),
            total_frames: world.frame_count(),
            final_time_ms: world.store.current_time(),
            final_selection: world.store.selected_event_id().map(str::to_owned),
            failure_reason: checks.failure,
            metrics,
        }
    }

    /// Plays until the store stops, checking invariants after every frame.
    fn play_through(&self, world: &mut SimWorld, checks: &mut Checks, metrics: &mut ScenarioMetrics) {
        let duration = world.store.duration();
        world.store.play();

        for _ in 0..MAX_FRAMES {
            if !world.store.is_playing() {
                break;
            }
            let before = world.store.current_time();
            let (frame, advance) = match world.tick() {
                Ok(step) => step,
                Err(e) => {
                    checks.check(false, || format!("Context failed: {}", e));
                    return;
                }
            };
            let after = world.store.current_time();

            metrics.max_frame_delta_ms = metrics.max_frame_delta_ms.max(frame.delta_ms());
            metrics.record_step(before, after);
            if advance.reached_end {
                metrics.auto_stops += 1;
            }

            checks.check(after >= before, || format!("Time went backwards: {} -> {}", before, after));
            checks.check(after <= duration, || format!("Time {} exceeds duration {}", after, duration));
            if advance.moved {
                checks.check(selection_consistent(&world.store), || {
                    format!("Selection {:?} stale at {}ms", world.store.selected_event_id(), after)
                });
            }

            if frame.index % 600 == 0 {
                debug!("  t={:.1}s | playback={}ms | selected={:?}",
                    world.time(),
                    after,
                    world.store.selected_event_id()
                );
            }
        }
    }

    /// PB-001: FullPlayback - 1x playthrough on the async driver.
    ///
    /// **Assertion**: Reaches the duration exactly once, stays monotonic, and
    /// the selection matches the nearest event at every frame.
    fn run_full_playback(&self, mut world: SimWorld) -> ScenarioResult {
        info!("PB-001: FullPlayback - 1x playthrough");

        let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime,
            Err(e) => return self.failed(ScenarioId::FullPlayback, format!("Runtime: {}", e)),
        };

        let mut checks = Checks::default();
        let mut metrics = ScenarioMetrics::default();
        let duration = world.store.duration();
        let mut last_time = 0;

        world.store.play();
        world.store.drain_changes();

        let report = runtime.block_on(world.run_with(|store, tick| {
            let now = store.current_time();
            metrics.max_frame_delta_ms = metrics.max_frame_delta_ms.max(tick.delta_ms());
            metrics.record_step(last_time, now);

            checks.check(now >= last_time, || format!("Time went backwards: {} -> {}", last_time, now));
            checks.check(now <= duration, || format!("Time {} exceeds duration {}", now, duration));
            if tick.index > 1 {
                checks.check(selection_consistent(store), || {
                    format!("Selection {:?} stale at {}ms", store.selected_event_id(), now)
                });
            }
            last_time = now;
        }));

        match report {
            Ok(report) => {
                checks.check(
                    report.stop_reason == trajview_core::StopReason::ReachedEnd,
                    || format!("Driver stopped early: {:?}", report.stop_reason),
                );
                checks.check(report.final_time == duration, || {
                    format!("Final time {} != duration {}", report.final_time, duration)
                });
                if self.jitter_ms == 0.0 {
                    let interval_ms = world.context.frame_interval().as_secs_f64() * 1000.0;
                    let expected = (duration as f64 / interval_ms).ceil() as u64;
                    checks.check(report.frames.abs_diff(expected) <= 1, || {
                        format!("Expected ~{} frames, drove {}", expected, report.frames)
                    });
                }
            }
            Err(e) => checks.check(false, || format!("Driver failed: {}", e)),
        }

        let changes = world.store.drain_changes();
        metrics.record_changes(&changes);
        metrics.auto_stops = changes
            .iter()
            .filter(|c| matches!(c, StoreChange::PlayStateChanged { playing: false }))
            .count() as u64;

        checks.check(metrics.auto_stops == 1, || format!("{} auto-stops", metrics.auto_stops));
        checks.check(!world.store.is_playing(), || "Still playing after end".to_string());
        checks.check(selection_consistent(&world.store), || "Final selection stale".to_string());

        info!("✓ FullPlayback complete: {} frames, {} selection changes",
            world.frame_count(), metrics.selection_changes);

        self.finish(ScenarioId::FullPlayback, &world, checks, metrics)
    }

    /// PB-002: ScrubStorm - random seeks, in and out of range.
    ///
    /// **Assertion**: Every seek clamps to `[0, duration]`, repeating a seek
    /// changes nothing, and the selection always matches the new time.
    fn run_scrub_storm(&self, mut world: SimWorld) -> ScenarioResult {
        info!("PB-002: ScrubStorm - 2000 random seeks");

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ 0x5c_0b);
        let mut checks = Checks::default();
        let mut metrics = ScenarioMetrics::default();
        let duration = world.store.duration();
        world.store.drain_changes();

        for i in 0..2_000u64 {
            let expected = if i % 10 == 9 {
                // Slider-style fractional seek, sometimes garbage
                let raw = if i % 100 == 99 {
                    f64::NAN
                } else {
                    rng.gen_range(-5_000.0..(duration as f64 * 1.5))
                };
                world.store.set_current_time_ms(raw);
                if raw.is_nan() {
                    0
                } else {
                    raw.clamp(0.0, duration as f64).floor() as u64
                }
            } else {
                let target = rng.gen_range(0..=duration * 2);
                world.store.set_current_time(target);
                target.min(duration)
            };
            metrics.seeks += 1;

            let now = world.store.current_time();
            checks.check(now == expected, || format!("Seek #{} landed at {} not {}", i, now, expected));
            checks.check(selection_consistent(&world.store), || {
                format!("Selection {:?} stale after seek to {}", world.store.selected_event_id(), now)
            });

            let changes = world.store.drain_changes();
            metrics.record_changes(&changes);

            // Same seek again must be silent
            world.store.set_current_time(now);
            let repeat = world.store.drain_changes();
            checks.check(repeat.is_empty(), || format!("Repeated seek to {} emitted {:?}", now, repeat));
            checks.check(world.store.current_time() == now, || "Repeated seek moved time".to_string());
        }

        checks.check(!world.store.is_playing(), || "Seeking started playback".to_string());

        info!("✓ ScrubStorm complete: {} seeks, {} selection changes",
            metrics.seeks, metrics.selection_changes);

        self.finish(ScenarioId::ScrubStorm, &world, checks, metrics)
    }

    /// PB-003: EventJumps - timeline clicks while playing.
    ///
    /// **Assertion**: Each click pauses, seeks to the event time and selects
    /// it; unknown ids change nothing.
    fn run_event_jumps(&self, mut world: SimWorld) -> ScenarioResult {
        info!("PB-003: EventJumps - timeline clicks during playback");

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ 0xe7e47);
        let mut checks = Checks::default();
        let mut metrics = ScenarioMetrics::default();
        let events: Vec<TimelineEvent> = world.store.events().iter().cloned().collect();

        if events.is_empty() {
            return self.failed(ScenarioId::EventJumps, "No timeline events loaded".to_string());
        }

        for i in 0..200u64 {
            world.store.play();
            for _ in 0..rng.gen_range(1..120) {
                if let Err(e) = world.tick() {
                    checks.check(false, || format!("Context failed: {}", e));
                }
            }

            if i % 7 == 6 {
                let ghost = format!("ghost-{}", i);
                let time = world.store.current_time();
                let playing = world.store.is_playing();
                let selected = world.store.selected_event_id().map(str::to_owned);
                world.store.drain_changes();

                let result = world.store.select_event(&ghost);
                checks.check(result == Err(PlaybackError::UnknownEventId(ghost.clone())), || {
                    format!("Unknown id {} gave {:?}", ghost, result)
                });
                checks.check(world.store.current_time() == time, || "Unknown id moved time".to_string());
                checks.check(world.store.is_playing() == playing, || "Unknown id changed play state".to_string());
                checks.check(world.store.selected_event_id().map(str::to_owned) == selected, || {
                    "Unknown id changed selection".to_string()
                });
                checks.check(world.store.drain_changes().is_empty(), || "Unknown id emitted changes".to_string());
                continue;
            }

            let event = &events[rng.gen_range(0..events.len())];
            if let Err(e) = world.store.select_event(&event.id) {
                checks.check(false, || format!("select_event({}) failed: {}", event.id, e));
                continue;
            }
            metrics.seeks += 1;

            checks.check(world.store.current_time() == event.time, || {
                format!("Jump to {} landed at {} not {}", event.id, world.store.current_time(), event.time)
            });
            checks.check(!world.store.is_playing(), || format!("Still playing after jump to {}", event.id));
            checks.check(world.store.selected_event_id() == Some(event.id.as_str()), || {
                format!("Selected {:?} after jump to {}", world.store.selected_event_id(), event.id)
            });

            let changes = world.store.drain_changes();
            metrics.record_changes(&changes);
        }

        info!("✓ EventJumps complete: {} jumps, {} selection changes",
            metrics.seeks, metrics.selection_changes);

        self.finish(ScenarioId::EventJumps, &world, checks, metrics)
    }

    /// PB-004: SpeedSweep - presets and out-of-range speeds.
    ///
    /// **Assertion**: Speeds clamp to `[0.1, 5.0]`, non-finite speeds are
    /// ignored, and elapsed playback equals frames × interval × speed.
    fn run_speed_sweep(&self) -> ScenarioResult {
        info!("PB-004: SpeedSweep - presets and junk speeds");

        let mut checks = Checks::default();
        let mut metrics = ScenarioMetrics::default();
        let frames = 120;

        let mut speeds: Vec<f64> = SPEED_PRESETS.to_vec();
        speeds.extend([7.0, 0.0, -2.0, MIN_SPEED, MAX_SPEED, f64::NAN, f64::INFINITY]);

        // Regular frames so elapsed time is predictable
        let config = self.config().with_jitter_ms(0.0);
        let mut last_world = None;

        for speed in speeds {
            let mut world = match SimWorld::new(config.clone()) {
                Ok(world) => world,
                Err(e) => return self.failed(ScenarioId::SpeedSweep, format!("Failed to build route: {}", e)),
            };

            let previous = world.store.speed();
            world.store.set_speed(speed);
            let expected_speed = if speed.is_finite() {
                speed.clamp(MIN_SPEED, MAX_SPEED)
            } else {
                previous
            };
            checks.check(world.store.speed() == expected_speed, || {
                format!("set_speed({}) stored {} not {}", speed, world.store.speed(), expected_speed)
            });

            world.store.play();
            for _ in 0..frames {
                let before = world.store.current_time();
                if let Err(e) = world.tick() {
                    checks.check(false, || format!("Context failed: {}", e));
                }
                metrics.record_step(before, world.store.current_time());
            }

            let interval_ms = world.context.frame_interval().as_secs_f64() * 1000.0;
            let expected = (frames as f64 * interval_ms * expected_speed).min(world.store.duration() as f64);
            let actual = world.store.current_time() as f64;
            checks.check((actual - expected).abs() <= 2.0, || {
                format!("At {}x after {} frames: {}ms, expected ~{:.1}ms", expected_speed, frames, actual, expected)
            });
            checks.check(world.store.is_playing(), || format!("Stopped early at {}x", expected_speed));

            debug!("  speed={} -> {}x | t={}ms", speed, expected_speed, actual);
            last_world = Some(world);
        }

        info!("✓ SpeedSweep complete: largest step {}ms", metrics.max_time_step_ms);

        match last_world {
            Some(world) => self.finish(ScenarioId::SpeedSweep, &world, checks, metrics),
            None => self.failed(ScenarioId::SpeedSweep, "No speeds tested".to_string()),
        }
    }

    /// PB-005: FrameJitter - Gaussian frame jitter and stalls.
    ///
    /// **Assertion**: No frame moves playback by more than the capped delta,
    /// and jittery playback still stops exactly once at the end.
    fn run_frame_jitter(&self) -> ScenarioResult {
        info!("PB-005: FrameJitter - jittered frames with stalls");

        let config = self.config().with_jitter_ms(self.jitter_ms.max(8.0));
        let mut world = match SimWorld::new(config) {
            Ok(world) => world,
            Err(e) => return self.failed(ScenarioId::FrameJitter, format!("Failed to build route: {}", e)),
        };

        let mut checks = Checks::default();
        let mut metrics = ScenarioMetrics::default();
        let duration = world.store.duration();
        let cap_ms = world.config.max_frame_delta_ms;
        let stall = Duration::from_secs(2);

        world.store.set_speed(2.0);
        world.store.play();

        let mut frame = 0u64;
        while world.store.is_playing() && frame < MAX_FRAMES {
            frame += 1;
            let before = world.store.current_time();
            let speed = world.store.speed();

            let (delta_ms, advance) = if frame % 250 == 0 {
                (stall.as_secs_f64() * 1000.0, world.tick_with(stall))
            } else {
                match world.tick() {
                    Ok((tick, advance)) => (tick.delta_ms(), advance),
                    Err(e) => {
                        checks.check(false, || format!("Context failed: {}", e));
                        break;
                    }
                }
            };

            let after = world.store.current_time();
            metrics.max_frame_delta_ms = metrics.max_frame_delta_ms.max(delta_ms);
            metrics.record_step(before, after);
            if advance.reached_end {
                metrics.auto_stops += 1;
            }

            let allowed = delta_ms.min(cap_ms) * speed + 1.0;
            checks.check((after - before) as f64 <= allowed, || {
                format!("Frame {} moved {}ms (delta {:.1}ms, allowed {:.1}ms)", frame, after - before, delta_ms, allowed)
            });
            checks.check(after <= duration, || format!("Time {} exceeds duration {}", after, duration));
            checks.check(delta_ms >= 0.999, || format!("Frame {} delta {:.3}ms below 1ms", frame, delta_ms));
        }

        checks.check(world.store.current_time() == duration, || {
            format!("Ended at {} not {}", world.store.current_time(), duration)
        });
        checks.check(metrics.auto_stops == 1, || format!("{} auto-stops", metrics.auto_stops));
        checks.check(selection_consistent(&world.store), || "Final selection stale".to_string());

        info!("✓ FrameJitter complete: {} frames, max delta {:.1}ms, max step {}ms",
            frame, metrics.max_frame_delta_ms, metrics.max_time_step_ms);

        self.finish(ScenarioId::FrameJitter, &world, checks, metrics)
    }

    /// PB-006: ReloadMidPlay - swap experiment and events during playback.
    ///
    /// **Assertion**: A new experiment resets time, play state and selection;
    /// new events clear the selection; stale ids are rejected.
    fn run_reload_mid_play(&self, mut world: SimWorld) -> ScenarioResult {
        info!("PB-006: ReloadMidPlay - experiment swap during playback");

        let mut checks = Checks::default();
        let mut metrics = ScenarioMetrics::default();

        world.store.play();
        for _ in 0..MAX_FRAMES {
            if world.store.current_time() >= 20_000 || !world.store.is_playing() {
                break;
            }
            if let Err(e) = world.tick() {
                checks.check(false, || format!("Context failed: {}", e));
                break;
            }
        }
        checks.check(world.store.selected_event_id().is_some(), || "Nothing selected mid-play".to_string());

        if world.store.select_event("stop").is_ok() {
            metrics.seeks += 1;
        }
        world.store.play();
        for _ in 0..60 {
            if let Err(e) = world.tick() {
                checks.check(false, || format!("Context failed: {}", e));
                break;
            }
        }
        world.store.drain_changes();

        // Swap in a different route
        let replacement = match RouteGenerator::new(self.seed.wrapping_add(1)).trajectory() {
            Ok(trajectory) => trajectory,
            Err(e) => return self.failed(ScenarioId::ReloadMidPlay, format!("Failed to build route: {}", e)),
        };
        let replacement_start = replacement.start_time();
        world.store.load_experiment(replacement);

        checks.check(world.store.current_time() == 0, || "Reload kept playback time".to_string());
        checks.check(!world.store.is_playing(), || "Reload kept playing".to_string());
        checks.check(world.store.selected_event_id().is_none(), || "Reload kept selection".to_string());

        let changes = world.store.drain_changes();
        metrics.record_changes(&changes);
        checks.check(
            matches!(changes.first(), Some(StoreChange::ExperimentLoaded { .. })),
            || format!("First change after reload was {:?}", changes.first()),
        );
        checks.check(changes.contains(&StoreChange::PlayStateChanged { playing: false }), || {
            "Reload did not announce pause".to_string()
        });
        checks.check(changes.contains(&StoreChange::SelectionChanged { selected: None }), || {
            "Reload did not announce cleared selection".to_string()
        });

        match world.pose() {
            Some(pose) => checks.check(pose.timestamp == replacement_start, || {
                format!("Pose at {} after reload, expected {}", pose.timestamp, replacement_start)
            }),
            None => checks.check(false, || "No pose after reload".to_string()),
        }

        // Swap the timeline
        let new_events = EventList::new(vec![
            TimelineEvent::new("alpha", 10_000, "Lane change"),
            TimelineEvent::new("beta", 40_000, "Pedestrian crossing"),
        ]);
        match new_events {
            Ok(events) => world.store.load_timeline_events(events),
            Err(e) => return self.failed(ScenarioId::ReloadMidPlay, format!("Bad events: {}", e)),
        }
        checks.check(world.store.selected_event_id().is_none(), || "Events load kept selection".to_string());
        checks.check(world.store.select_event("stop").is_err(), || "Stale event id accepted".to_string());

        world.store.set_current_time(36_000);
        metrics.seeks += 1;
        checks.check(world.store.selected_event_id() == Some("beta"), || {
            format!("Selected {:?} at 36000ms", world.store.selected_event_id())
        });

        // And the new recording still plays to the end
        let mut end_checks = Checks::default();
        self.play_through(&mut world, &mut end_checks, &mut metrics);
        if let Some(failure) = end_checks.failure {
            checks.check(false, || failure);
        }
        checks.check(world.store.current_time() == world.store.duration(), || {
            "Replacement did not play to the end".to_string()
        });

        info!("✓ ReloadMidPlay complete: ended at {}ms with {:?} selected",
            world.store.current_time(), world.store.selected_event_id());

        self.finish(ScenarioId::ReloadMidPlay, &world, checks, metrics)
    }

    /// PB-007: FollowCamera - camera rigs over the whole route.
    ///
    /// **Assertion**: Chase camera sits at the fixed offset, first-person
    /// camera looks along the heading, and the resolved sample advances by
    /// at most one per frame.
    fn run_follow_camera(&self, mut world: SimWorld) -> ScenarioResult {
        info!("PB-007: FollowCamera - chase and first-person rigs");

        let mut checks = Checks::default();
        let mut metrics = ScenarioMetrics::default();
        let chase = ViewMode::Follow(FollowStyle::Chase);
        let first_person = ViewMode::Follow(FollowStyle::FirstPerson);
        let mut last_index: Option<usize> = None;

        world.store.play();
        for _ in 0..MAX_FRAMES {
            if !world.store.is_playing() {
                break;
            }
            if let Err(e) = world.tick() {
                checks.check(false, || format!("Context failed: {}", e));
                break;
            }
            let now = world.store.current_time();

            let (Some(free), Some(behind), Some(eyes)) = (
                world.store.pose(ViewMode::Free),
                world.store.pose(chase),
                world.store.pose(first_person),
            ) else {
                checks.check(false, || format!("No pose at {}ms", now));
                break;
            };
            metrics.pose_checks += 1;

            checks.check(free.camera.is_none(), || "Free mode produced a camera".to_string());
            checks.check(free.heading > -PI && free.heading <= PI, || {
                format!("Heading {} out of range at {}ms", free.heading, now)
            });

            if let Some(camera) = behind.camera {
                let offset = camera.position - behind.position;
                let ok = (offset.x).abs() < 1e-9
                    && (offset.y - 2.0).abs() < 1e-9
                    && (offset.z + 3.0).abs() < 1e-9
                    && camera.target == behind.position;
                checks.check(ok, || format!("Chase camera off by {:?} at {}ms", offset, now));
            } else {
                checks.check(false, || "Chase mode without camera".to_string());
            }

            if let Some(camera) = eyes.camera {
                let look = camera.target - camera.position;
                let forward = eyes.forward();
                let ok = (look.y).abs() < 1e-9
                    && (look.normalize() - forward).norm() < 1e-9
                    && (camera.position.y - eyes.position.y - 0.5).abs() < 1e-9;
                checks.check(ok, || format!("First-person camera not along heading at {}ms", now));
            } else {
                checks.check(false, || "First-person mode without camera".to_string());
            }

            if let Some(last) = last_index {
                checks.check(free.sample_index.abs_diff(last) <= 1, || {
                    format!("Pose skipped from sample {} to {} at {}ms", last, free.sample_index, now)
                });
            }
            last_index = Some(free.sample_index);
        }

        let samples = world.store.trajectory().map(|t| t.len()).unwrap_or(0);
        checks.check(last_index == Some(samples.saturating_sub(1)), || {
            format!("Ended on sample {:?} of {}", last_index, samples)
        });

        info!("✓ FollowCamera complete: {} poses checked", metrics.pose_checks);

        self.finish(ScenarioId::FollowCamera, &world, checks, metrics)
    }
}
