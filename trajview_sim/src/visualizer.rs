//! Rerun visualization for playback sessions.
//!
//! Visualization is optional and only available with the `visualization` feature.
//!
//! # What Gets Logged
//!
//! - The recorded route as a static line strip
//! - The vehicle pose as a point, plus the follow camera when present
//! - Timeline event changes as text
//! - Playback time and speed as scalars

#[cfg(feature = "visualization")]
use rerun::{Color, LineStrips3D, Points3D, Position3D, Radius, RecordingStream};
use trajview_core::{Pose, Trajectory};

/// Rerun logger for playback visualization.
pub struct RerunLogger {
    #[cfg(feature = "visualization")]
    rec: Option<RecordingStream>,

    /// Whether visualization is enabled
    enabled: bool,
}

impl RerunLogger {
    /// Creates a new logger with visualization disabled.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            rec: None,
            enabled: false,
        }
    }

    /// Creates a new logger with visualization enabled.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match rerun::RecordingStreamBuilder::new(name).spawn() {
            Ok(rec) => {
                tracing::info!("Rerun visualization enabled - open Rerun Viewer to watch playback");
                Self {
                    rec: Some(rec),
                    enabled: true,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self::disabled()
            }
        }
    }

    /// Creates a logger - returns disabled if visualization feature not enabled.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Rerun visualization not available (compile with --features visualization)");
        Self::disabled()
    }

    /// Returns whether visualization is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets the playback time for subsequent logs.
    #[cfg(feature = "visualization")]
    pub fn set_time(&self, playback_ms: u64) {
        if let Some(ref rec) = self.rec {
            rec.set_time_seconds("playback_time", playback_ms as f64 / 1000.0);
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn set_time(&self, _playback_ms: u64) {}

    /// Logs the whole route once.
    #[cfg(feature = "visualization")]
    pub fn log_route(&self, trajectory: &Trajectory) {
        if let Some(ref rec) = self.rec {
            let strip: Vec<[f32; 3]> = trajectory
                .samples()
                .iter()
                .map(|s| [s.position.x as f32, s.position.y as f32, s.position.z as f32])
                .collect();

            let _ = rec.log_static(
                "world/route",
                &LineStrips3D::new([strip]).with_colors([Color::from_rgb(120, 120, 120)]),
            );
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_route(&self, _trajectory: &Trajectory) {}

    /// Logs the vehicle and, in follow mode, its camera.
    #[cfg(feature = "visualization")]
    pub fn log_pose(&self, pose: &Pose) {
        if let Some(ref rec) = self.rec {
            let p = pose.position;
            let _ = rec.log(
                "world/vehicle",
                &Points3D::new([Position3D::new(p.x as f32, p.y as f32, p.z as f32)])
                    .with_colors([Color::from_rgb(255, 165, 0)]) // Orange
                    .with_radii([Radius::new_scene_units(1.0)]),
            );

            if let Some(camera) = pose.camera {
                let c = camera.position;
                let _ = rec.log(
                    "world/camera",
                    &Points3D::new([Position3D::new(c.x as f32, c.y as f32, c.z as f32)])
                        .with_colors([Color::from_rgb(100, 100, 255)]) // Blue
                        .with_radii([Radius::new_scene_units(0.5)]),
                );
            }
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_pose(&self, _pose: &Pose) {}

    /// Logs a text annotation (e.g., selection change).
    #[cfg(feature = "visualization")]
    pub fn log_event(&self, path: &str, message: &str) {
        if let Some(ref rec) = self.rec {
            let _ = rec.log(path, &rerun::TextLog::new(message));
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_event(&self, _path: &str, _message: &str) {}

    /// Logs playback speed as a scalar metric.
    #[cfg(feature = "visualization")]
    pub fn log_speed(&self, speed: f64) {
        if let Some(ref rec) = self.rec {
            let _ = rec.log("metrics/playback_speed", &rerun::Scalar::new(speed));
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_speed(&self, _speed: f64) {}
}
