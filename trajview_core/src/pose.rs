//! The Pose Resolver - vehicle and camera pose for the current playback time
//!
//! ```text
//!   currentTime ──► start_time + t ──► nearest sample ──► position, speed
//!                                            │
//!                                            └──► derive_heading ──► heading
//!                                                        │
//!                                  ViewMode::Follow ─────┴──► CameraPose
//! ```
//!
//! Resolution is pure: the same trajectory, time and mode always produce the
//! same pose. It runs once per rendered frame.
//!
//! Coordinates are renderer-native: `y` is up, heading is measured in the
//! horizontal (x, z) plane.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::trajectory::{derive_heading, nearest_index, Trajectory};

/// Chase camera offset from the vehicle, world axes (not rotated by heading).
pub const CHASE_OFFSET: [f64; 3] = [0.0, 2.0, -3.0];

/// First-person eye height above the recorded position.
pub const FIRST_PERSON_EYE_HEIGHT: f64 = 0.5;

/// First-person eye offset along the forward vector.
pub const FIRST_PERSON_EYE_FORWARD: f64 = 0.5;

/// First-person look-at distance along the forward vector.
pub const FIRST_PERSON_LOOK_AHEAD: f64 = 20.0;

// ============================================================================
// VIEW MODES
// ============================================================================

/// How a follow camera is attached to the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowStyle {
    /// Fixed world offset above and behind, looking at the vehicle
    #[default]
    Chase,
    /// Driver's-eye view, looking along the heading
    FirstPerson,
}

/// Who owns the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// An external orbit controller moves the camera
    #[default]
    Free,
    /// The camera is derived from the vehicle pose every frame
    Follow(FollowStyle),
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Free => write!(f, "free"),
            ViewMode::Follow(FollowStyle::Chase) => write!(f, "chase"),
            ViewMode::Follow(FollowStyle::FirstPerson) => write!(f, "first_person"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" | "orbit" => Ok(ViewMode::Free),
            "chase" | "follow" => Ok(ViewMode::Follow(FollowStyle::Chase)),
            "first_person" | "first-person" | "fpv" => {
                Ok(ViewMode::Follow(FollowStyle::FirstPerson))
            }
            _ => Err(format!("Unknown view mode: {}", s)),
        }
    }
}

/// Scene flavour, which decides the free-camera constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Desktop simulator view: orbit around the route
    #[default]
    Simulator,
    /// Augmented-reality overlay: zoom only, close range
    Ar,
}

/// Orbit controller constraints and initial camera for a [`DisplayMode`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitLimits {
    pub enable_pan: bool,
    pub enable_rotate: bool,
    pub enable_zoom: bool,
    pub min_distance: f64,
    pub max_distance: f64,
    pub initial_camera: Point3<f64>,
    pub fov_degrees: f64,
}

impl DisplayMode {
    pub fn orbit_limits(self) -> OrbitLimits {
        match self {
            DisplayMode::Simulator => OrbitLimits {
                enable_pan: true,
                enable_rotate: true,
                enable_zoom: true,
                min_distance: 5.0,
                max_distance: 50.0,
                initial_camera: Point3::new(15.0, 15.0, 15.0),
                fov_degrees: 60.0,
            },
            DisplayMode::Ar => OrbitLimits {
                enable_pan: false,
                enable_rotate: false,
                enable_zoom: true,
                min_distance: 3.0,
                max_distance: 20.0,
                initial_camera: Point3::new(0.0, 2.0, 5.0),
                fov_degrees: 75.0,
            },
        }
    }

    /// The follow style matching this scene flavour.
    pub fn follow_style(self) -> FollowStyle {
        match self {
            DisplayMode::Simulator => FollowStyle::Chase,
            DisplayMode::Ar => FollowStyle::FirstPerson,
        }
    }
}

// ============================================================================
// POSE
// ============================================================================

/// Camera placement for follow mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Point3<f64>,
    pub target: Point3<f64>,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Recorded vehicle position
    pub position: Point3<f64>,

    /// Derived heading in radians, `(-PI, PI]`
    pub heading: f64,

    /// Recorded speed
    pub speed: f64,

    /// Recording timestamp of the resolved sample
    pub timestamp: u64,

    /// Index of the resolved sample
    pub sample_index: usize,

    /// Present only in follow mode
    pub camera: Option<CameraPose>,
}

impl Pose {
    /// Unit forward vector for this heading.
    pub fn forward(&self) -> Vector3<f64> {
        heading_vector(self.heading)
    }
}

/// Unit vector in the horizontal plane: `(cos h, 0, sin h)`.
pub fn heading_vector(heading: f64) -> Vector3<f64> {
    Vector3::new(heading.cos(), 0.0, heading.sin())
}

/// Computes a follow camera for a vehicle at `position` facing `heading`.
pub fn follow_camera(position: Point3<f64>, heading: f64, style: FollowStyle) -> CameraPose {
    match style {
        FollowStyle::Chase => CameraPose {
            position: position + Vector3::from(CHASE_OFFSET),
            target: position,
        },
        FollowStyle::FirstPerson => {
            let forward = heading_vector(heading);
            let up = Vector3::y() * FIRST_PERSON_EYE_HEIGHT;
            CameraPose {
                position: position + forward * FIRST_PERSON_EYE_FORWARD + up,
                target: position + forward * FIRST_PERSON_LOOK_AHEAD + up,
            }
        }
    }
}

/// Resolves the pose at playback-relative `current_time`.
///
/// Returns `None` for an empty trajectory.
pub fn resolve_pose(trajectory: &Trajectory, current_time: u64, mode: ViewMode) -> Option<Pose> {
    let samples = trajectory.samples();
    let index = nearest_index(samples, trajectory.absolute_time(current_time)).ok()?;
    let sample = &samples[index];

    let position = sample.point();
    let heading = derive_heading(samples, index);
    let camera = match mode {
        ViewMode::Free => None,
        ViewMode::Follow(style) => Some(follow_camera(position, heading, style)),
    };

    Some(Pose {
        position,
        heading,
        speed: sample.speed,
        timestamp: sample.timestamp(),
        sample_index: index,
        camera,
    })
}
