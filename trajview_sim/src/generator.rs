//! Deterministic demo route and timeline.
//!
//! The generator drives a kinematic vehicle through a fixed script of
//! segments (accelerate, turn, stop, slow down) and records a sample every
//! 100ms. Lateral road noise comes from a seeded RNG, so the same seed always
//! yields the same recording.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::FRAC_PI_2;
use trajview_core::{EventList, Sample, Severity, TimelineEvent, Trajectory, TrajectoryError};

/// Total recording length in ms.
pub const ROUTE_DURATION_MS: u64 = 60_000;

/// Sampling interval in ms.
pub const SAMPLE_INTERVAL_MS: u64 = 100;

/// Peak amplitude of the per-sample road noise.
pub const ROAD_NOISE: f64 = 0.025;

/// What the vehicle is doing during a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Manoeuvre {
    /// Accelerate towards cruising speed
    Straight,
    /// Turn and settle facing +z
    TurnRight,
    /// Turn and settle facing -z
    TurnLeft,
    /// Brake (or hold, at the stop sign)
    Stop,
    /// Gentle slow-down to a crawl
    SpeedReduction,
}

/// A manoeuvre over `[start_ms, end_ms)`.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub start_ms: u64,
    pub end_ms: u64,
    pub manoeuvre: Manoeuvre,
}

impl Segment {
    const fn new(start_s: u64, end_s: u64, manoeuvre: Manoeuvre) -> Self {
        Self {
            start_ms: start_s * 1_000,
            end_ms: end_s * 1_000,
            manoeuvre,
        }
    }

    fn contains(&self, time_ms: u64) -> bool {
        time_ms >= self.start_ms && time_ms < self.end_ms
    }

    /// Fraction of the segment elapsed at `time_ms`.
    fn progress(&self, time_ms: u64) -> f64 {
        (time_ms - self.start_ms) as f64 / (self.end_ms - self.start_ms) as f64
    }
}

/// The demo drive.
pub const DEMO_SEGMENTS: [Segment; 10] = [
    Segment::new(0, 10, Manoeuvre::Straight),
    Segment::new(10, 15, Manoeuvre::TurnRight),
    Segment::new(15, 25, Manoeuvre::Straight),
    Segment::new(25, 30, Manoeuvre::TurnLeft),
    Segment::new(30, 32, Manoeuvre::Stop),
    Segment::new(32, 40, Manoeuvre::Straight),
    Segment::new(40, 45, Manoeuvre::Stop),
    Segment::new(45, 50, Manoeuvre::Straight),
    Segment::new(50, 55, Manoeuvre::SpeedReduction),
    Segment::new(55, 60, Manoeuvre::TurnRight),
];

/// Stop-sign window: the vehicle stands still instead of braking.
const STOP_SIGN_MS: (u64, u64) = (30_000, 32_000);

/// Kinematic state integrated between samples.
#[derive(Debug, Clone, Copy, Default)]
struct Vehicle {
    x: f64,
    z: f64,
    heading: f64,
    speed: f64,
}

impl Vehicle {
    fn drive(&mut self, scale: f64) {
        self.x += self.heading.cos() * self.speed * scale;
        self.z += self.heading.sin() * self.speed * scale;
    }

    /// First half of a turn steers by `rate`, second half eases onto `target`.
    fn turn(&mut self, progress: f64, rate: f64, target: f64) {
        self.speed = (self.speed - 0.8).max(8.0);
        if progress <= 0.5 {
            self.heading += rate;
        } else {
            let ease = (progress - 0.5) * 2.0;
            self.heading += (target - self.heading) * ease;
        }
        self.drive(0.05);
    }

    fn step(&mut self, segment: &Segment, time_ms: u64) {
        match segment.manoeuvre {
            Manoeuvre::Straight => {
                self.speed = (self.speed + 0.5).min(15.0);
                // Shorter strides while pulling away
                let scale = if time_ms < 11_000 { 0.02 } else { 0.05 };
                self.drive(scale);
            }
            Manoeuvre::TurnRight => self.turn(segment.progress(time_ms), 0.08, FRAC_PI_2),
            Manoeuvre::TurnLeft => self.turn(segment.progress(time_ms), -0.08, -FRAC_PI_2),
            Manoeuvre::Stop => {
                if time_ms >= STOP_SIGN_MS.0 && time_ms < STOP_SIGN_MS.1 {
                    self.speed = 0.0;
                } else {
                    self.speed = (self.speed - 1.5).max(0.0);
                    self.drive(0.05);
                }
            }
            Manoeuvre::SpeedReduction => {
                self.speed = (self.speed - 0.3).max(5.0);
                self.drive(0.03);
            }
        }
    }
}

/// Seeded generator for the demo recording.
pub struct RouteGenerator {
    seed: u64,
    noise: f64,
}

impl RouteGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            noise: ROAD_NOISE,
        }
    }

    /// Sets the noise amplitude (0 for a perfectly clean route).
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.abs();
        self
    }

    /// Samples of the demo drive, `0..=ROUTE_DURATION_MS` every 100ms.
    pub fn samples(&self) -> Vec<Sample> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut vehicle = Vehicle::default();
        let count = ROUTE_DURATION_MS / SAMPLE_INTERVAL_MS;

        (0..=count)
            .map(|i| {
                let timestamp = i * SAMPLE_INTERVAL_MS;
                if let Some(segment) = DEMO_SEGMENTS.iter().find(|s| s.contains(timestamp)) {
                    vehicle.step(segment, timestamp);
                }

                // Small road curvature
                if self.noise > 0.0 {
                    let offset = rng.gen_range(-self.noise..self.noise);
                    vehicle.x += offset;
                    vehicle.z += offset;
                }

                Sample::new(vehicle.x, 0.0, vehicle.z, timestamp, vehicle.speed, vehicle.heading)
            })
            .collect()
    }

    /// The demo recording as a trajectory.
    pub fn trajectory(&self) -> Result<Trajectory, TrajectoryError> {
        Trajectory::new("realistic-driving-test-1", "Realistic driving route", self.samples())
    }
}

/// Timeline shown alongside the demo recording.
pub fn demo_events() -> EventList {
    let events = vec![
        TimelineEvent::new("start", 0, "Start experiment")
            .with_detail("33% min. 1/5")
            .with_severity(Severity::Success),
        TimelineEvent::new("obstacle", 6_000, "Obstacle detected")
            .with_detail("15 msec")
            .with_severity(Severity::Warning),
        TimelineEvent::new("stop", 30_000, "Stopped at stop sign")
            .with_detail("1.3s")
            .with_severity(Severity::Info),
        TimelineEvent::new("speed", 50_000, "Speed reduced")
            .with_detail("20 km/h")
            .with_severity(Severity::Failure),
    ];
    EventList::new(events).unwrap_or_default()
}
