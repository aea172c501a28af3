//! The Trajectory Index - recorded vehicle samples with nearest-time lookup
//!
//! A trajectory is an immutable, timestamp-ordered sequence of samples.
//! The renderer asks for the sample nearest to the playback clock every frame,
//! so lookup is a binary search rather than a scan.
//!
//! Duplicate timestamps are legal. Ties (equal distance to the target) always
//! resolve to the lowest index, exactly as a front-to-back linear scan would.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::path::Path;
use thiserror::Error;

use crate::error::PlaybackError;

/// Position of the vehicle at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,

    /// Recording time in milliseconds
    pub timestamp: u64,
}

impl SamplePosition {
    pub fn new(x: f64, y: f64, z: f64, timestamp: u64) -> Self {
        Self { x, y, z, timestamp }
    }

    /// Returns the spatial part as a vector.
    pub fn vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Returns the spatial part as a point.
    pub fn point(&self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }
}

/// One timestamped trajectory record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Where the vehicle was, and when
    pub position: SamplePosition,

    /// Recorded speed (source units)
    pub speed: f64,

    /// Recorded heading in radians
    pub heading: f64,
}

impl Sample {
    /// Creates a sample at `(x, y, z)` recorded at `timestamp` ms.
    pub fn new(x: f64, y: f64, z: f64, timestamp: u64, speed: f64, heading: f64) -> Self {
        Self {
            position: SamplePosition::new(x, y, z, timestamp),
            speed,
            heading,
        }
    }

    /// Recording time in milliseconds.
    pub fn timestamp(&self) -> u64 {
        self.position.timestamp
    }

    pub fn point(&self) -> Point3<f64> {
        self.position.point()
    }
}

// ============================================================================
// TRAJECTORY
// ============================================================================

/// Errors raised while building or loading a trajectory.
#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("Samples out of order at index {index}: {current}ms follows {previous}ms")]
    Unordered { index: usize, previous: u64, current: u64 },

    #[error("Failed to read trajectory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse trajectory: {0}")]
    Json(#[from] serde_json::Error),
}

/// A recorded experiment run.
///
/// `start_time` and `end_time` are always derived from the first and last
/// samples, so they can never disagree with the data.
///
/// Serialized in the recording format:
/// `{ "id", "name", "trajectory": [...], "startTime", "endTime" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TrajectoryFile")]
pub struct Trajectory {
    id: String,
    name: String,
    #[serde(rename = "trajectory")]
    samples: Vec<Sample>,
    start_time: u64,
    end_time: u64,
}

/// On-disk shape; the declared start/end times are ignored.
#[derive(Deserialize)]
struct TrajectoryFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "trajectory")]
    samples: Vec<Sample>,
}

impl TryFrom<TrajectoryFile> for Trajectory {
    type Error = TrajectoryError;

    fn try_from(file: TrajectoryFile) -> Result<Self, Self::Error> {
        Trajectory::new(file.id, file.name, file.samples)
    }
}

impl Trajectory {
    /// Creates a trajectory, validating that timestamps never decrease.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        samples: Vec<Sample>,
    ) -> Result<Self, TrajectoryError> {
        if let Some(index) = samples
            .windows(2)
            .position(|w| w[1].timestamp() < w[0].timestamp())
        {
            return Err(TrajectoryError::Unordered {
                index: index + 1,
                previous: samples[index].timestamp(),
                current: samples[index + 1].timestamp(),
            });
        }

        let start_time = samples.first().map(Sample::timestamp).unwrap_or(0);
        let end_time = samples.last().map(Sample::timestamp).unwrap_or(0);

        Ok(Self {
            id: id.into(),
            name: name.into(),
            samples,
            start_time,
            end_time,
        })
    }

    /// Creates a trajectory with no samples.
    pub fn empty(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            samples: Vec::new(),
            start_time: 0,
            end_time: 0,
        }
    }

    /// Parses a trajectory from its JSON recording format.
    pub fn from_json_str(json: &str) -> Result<Self, TrajectoryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a trajectory recording from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrajectoryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the first sample (0 if empty).
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Timestamp of the last sample (0 if empty).
    pub fn end_time(&self) -> u64 {
        self.end_time
    }

    /// Playback length: `end_time - start_time`.
    pub fn duration(&self) -> u64 {
        self.end_time - self.start_time
    }

    /// Maps a playback-relative time to recording time.
    ///
    /// Playback time 0 is the first sample, whatever its timestamp. Both
    /// position and heading lookups go through this mapping.
    pub fn absolute_time(&self, playback_time: u64) -> u64 {
        self.start_time.saturating_add(playback_time)
    }

    /// Nearest sample to a playback-relative time.
    pub fn sample_at(&self, playback_time: u64) -> Result<&Sample, PlaybackError> {
        let index = nearest_index(&self.samples, self.absolute_time(playback_time))?;
        Ok(&self.samples[index])
    }

    /// The full path as a polyline, for drawing the route.
    pub fn path_points(&self) -> Vec<Point3<f64>> {
        self.samples.iter().map(Sample::point).collect()
    }
}

// ============================================================================
// NEAREST LOOKUP
// ============================================================================

/// Returns the sample whose timestamp is closest to `target`.
///
/// Ties resolve to the lowest index.
pub fn nearest(samples: &[Sample], target: u64) -> Result<&Sample, PlaybackError> {
    let index = nearest_index(samples, target)?;
    Ok(&samples[index])
}

/// Index of the sample whose timestamp is closest to `target`.
///
/// Binary search that keeps the best candidate seen while the window narrows.
/// The window converges on the first timestamp `>= target`, and both that
/// index and its predecessor are visited on the way, so the closest value is
/// always among the candidates. The winner is then rewound to the first sample
/// carrying its timestamp, which makes the result identical to a linear scan.
pub fn nearest_index(samples: &[Sample], target: u64) -> Result<usize, PlaybackError> {
    let first = samples.first().ok_or(PlaybackError::EmptyTrajectory)?;

    let mut best = 0;
    let mut best_distance = first.timestamp().abs_diff(target);

    let mut lo = 0;
    let mut hi = samples.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let timestamp = samples[mid].timestamp();
        let distance = timestamp.abs_diff(target);

        if distance < best_distance || (distance == best_distance && mid < best) {
            best = mid;
            best_distance = distance;
        }

        if timestamp < target {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }

    let winning = samples[best].timestamp();
    Ok(samples[..best].partition_point(|s| s.timestamp() < winning))
}

/// Linear-scan reference for [`nearest_index`]. O(n).
pub fn nearest_index_linear(samples: &[Sample], target: u64) -> Result<usize, PlaybackError> {
    let mut best: Option<(usize, u64)> = None;

    for (i, sample) in samples.iter().enumerate() {
        let distance = sample.timestamp().abs_diff(target);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((i, distance)),
        }
    }

    best.map(|(i, _)| i).ok_or(PlaybackError::EmptyTrajectory)
}

// ============================================================================
// HEADING
// ============================================================================

/// Derives the travel direction at `index` from the neighbouring sample.
///
/// The forward vector is `next - current`, or `current - previous` at the
/// last sample. Heading is the angle of that vector in the horizontal (x, z)
/// plane, `atan2(dz, dx)`, wrapped into `(-PI, PI]`.
///
/// A single-sample trajectory has no direction and yields 0. If the vehicle
/// did not move between the two samples, the recorded heading is used.
pub fn derive_heading(samples: &[Sample], index: usize) -> f64 {
    let Some(current) = samples.get(index) else {
        return 0.0;
    };
    if samples.len() < 2 {
        return 0.0;
    }

    let here = current.position.vector();
    let forward = match samples.get(index + 1) {
        Some(next) => next.position.vector() - here,
        None => here - samples[index - 1].position.vector(),
    };

    if forward.x.hypot(forward.z) <= f64::EPSILON {
        return wrap_angle(current.heading);
    }

    wrap_angle(forward.z.atan2(forward.x))
}

/// Wraps an angle into `(-PI, PI]`. Non-finite input maps to 0.
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn at(timestamp: u64) -> Sample {
        Sample::new(timestamp as f64, 0.0, 0.0, timestamp, 0.0, 0.0)
    }

    fn samples_at(timestamps: &[u64]) -> Vec<Sample> {
        timestamps.iter().copied().map(at).collect()
    }

    #[test]
    fn test_nearest_empty() {
        assert_eq!(nearest_index(&[], 10), Err(PlaybackError::EmptyTrajectory));
        assert_eq!(nearest_index_linear(&[], 10), Err(PlaybackError::EmptyTrajectory));
        assert!(nearest(&[], 0).is_err());
    }

    #[test]
    fn test_nearest_exact_and_between() {
        let samples = samples_at(&[0, 100, 200, 300]);

        assert_eq!(nearest_index(&samples, 200).unwrap(), 2);
        assert_eq!(nearest_index(&samples, 149).unwrap(), 1);
        assert_eq!(nearest_index(&samples, 151).unwrap(), 2);
        assert_eq!(nearest_index(&samples, 10_000).unwrap(), 3);
        assert_eq!(nearest(&samples, 0).unwrap().timestamp(), 0);
    }

    #[test]
    fn test_nearest_tie_prefers_earlier_sample() {
        let samples = samples_at(&[0, 100, 200]);

        // 150 is 50 away from both 100 and 200
        assert_eq!(nearest_index(&samples, 150).unwrap(), 1);
    }

    #[test]
    fn test_nearest_duplicates_resolve_to_first() {
        // Stationary vehicle logged several times at the same instant
        let samples = samples_at(&[0, 0, 0, 10, 10, 10, 20]);

        assert_eq!(nearest_index(&samples, 4).unwrap(), 0);
        assert_eq!(nearest_index(&samples, 5).unwrap(), 0);
        assert_eq!(nearest_index(&samples, 6).unwrap(), 3);
        assert_eq!(nearest_index(&samples, 10).unwrap(), 3);
        assert_eq!(nearest_index(&samples, 16).unwrap(), 6);
    }

    #[test]
    fn test_single_sample() {
        let samples = samples_at(&[500]);
        assert_eq!(nearest_index(&samples, 0).unwrap(), 0);
        assert_eq!(nearest_index(&samples, u64::MAX).unwrap(), 0);
        assert_eq!(derive_heading(&samples, 0), 0.0);
    }

    #[test]
    fn test_trajectory_times() {
        let trajectory = Trajectory::new("run", "Run", samples_at(&[1000, 1100, 1600])).unwrap();

        assert_eq!(trajectory.start_time(), 1000);
        assert_eq!(trajectory.end_time(), 1600);
        assert_eq!(trajectory.duration(), 600);
        assert_eq!(trajectory.absolute_time(100), 1100);
        assert_eq!(trajectory.sample_at(100).unwrap().timestamp(), 1100);
        assert_eq!(trajectory.sample_at(u64::MAX).unwrap().timestamp(), 1600);
        assert_eq!(trajectory.path_points().len(), 3);
    }

    #[test]
    fn test_trajectory_rejects_decreasing_timestamps() {
        let err = Trajectory::new("bad", "", samples_at(&[0, 100, 50])).unwrap_err();
        match err {
            TrajectoryError::Unordered { index, previous, current } => {
                assert_eq!(index, 2);
                assert_eq!(previous, 100);
                assert_eq!(current, 50);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_trajectory() {
        let trajectory = Trajectory::empty("none", "");
        assert!(trajectory.is_empty());
        assert_eq!(trajectory.duration(), 0);
        assert_eq!(trajectory.sample_at(0), Err(PlaybackError::EmptyTrajectory));
    }

    #[test]
    fn test_trajectory_json_recomputes_bounds() {
        let json = r#"{
            "id": "realistic-driving-test-1",
            "name": "Test drive",
            "trajectory": [
                { "position": { "x": 0.0, "y": 0.0, "z": 0.0, "timestamp": 0 }, "speed": 0.0, "heading": 0.0 },
                { "position": { "x": 1.0, "y": 0.0, "z": 0.5, "timestamp": 100 }, "speed": 0.5, "heading": 0.1 }
            ],
            "startTime": 999,
            "endTime": 5
        }"#;

        let trajectory = Trajectory::from_json_str(json).unwrap();
        assert_eq!(trajectory.id(), "realistic-driving-test-1");
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.start_time(), 0);
        assert_eq!(trajectory.end_time(), 100);

        let out = serde_json::to_value(&trajectory).unwrap();
        assert_eq!(out["startTime"], 0);
        assert_eq!(out["endTime"], 100);
        assert!(out["trajectory"].is_array());
    }

    #[test]
    fn test_trajectory_json_rejects_unordered() {
        let json = r#"{
            "id": "x",
            "trajectory": [
                { "position": { "x": 0.0, "y": 0.0, "z": 0.0, "timestamp": 10 }, "speed": 0.0, "heading": 0.0 },
                { "position": { "x": 0.0, "y": 0.0, "z": 0.0, "timestamp": 5 }, "speed": 0.0, "heading": 0.0 }
            ]
        }"#;
        assert!(matches!(Trajectory::from_json_str(json), Err(TrajectoryError::Json(_))));
    }

    #[test]
    fn test_heading_from_next_sample() {
        let samples = vec![
            Sample::new(0.0, 0.0, 0.0, 0, 0.0, 0.0),
            Sample::new(0.0, 0.0, 1.0, 100, 0.0, 0.0), // +z
            Sample::new(-1.0, 0.0, 1.0, 200, 0.0, 0.0), // -x
        ];

        assert_relative_eq!(derive_heading(&samples, 0), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(derive_heading(&samples, 1), PI, epsilon = 1e-12);
        // Last sample looks back: current - previous is still -x
        assert_relative_eq!(derive_heading(&samples, 2), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_heading_ignores_vertical_motion() {
        let samples = vec![
            Sample::new(0.0, 0.0, 0.0, 0, 0.0, 0.0),
            Sample::new(1.0, 50.0, 0.0, 100, 0.0, 0.0),
        ];
        assert_relative_eq!(derive_heading(&samples, 0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_heading_stationary_uses_recorded() {
        let samples = vec![
            Sample::new(2.0, 0.0, 2.0, 0, 0.0, 0.75),
            Sample::new(2.0, 0.0, 2.0, 100, 0.0, 0.75),
        ];
        assert_relative_eq!(derive_heading(&samples, 0), 0.75, epsilon = 1e-12);
        assert_eq!(derive_heading(&samples, 9), 0.0);
    }

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(wrap_angle(-1.5 * PI), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(PI / 2.0 + TAU), PI / 2.0, epsilon = 1e-9);
        assert_eq!(wrap_angle(f64::NAN), 0.0);
    }

    fn sorted_timestamps() -> impl Strategy<Value = Vec<u64>> {
        // Small range so duplicates and ties are common
        prop::collection::vec(0u64..200, 1..64).prop_map(|mut v| {
            v.sort_unstable();
            v
        })
    }

    proptest! {
        #[test]
        fn prop_binary_search_matches_linear_scan(
            timestamps in sorted_timestamps(),
            target in 0u64..260,
        ) {
            let samples = samples_at(&timestamps);
            prop_assert_eq!(
                nearest_index(&samples, target).unwrap(),
                nearest_index_linear(&samples, target).unwrap()
            );
        }

        #[test]
        fn prop_heading_is_wrapped(
            timestamps in sorted_timestamps(),
            index in 0usize..64,
        ) {
            let samples: Vec<Sample> = timestamps
                .iter()
                .enumerate()
                .map(|(i, &t)| Sample::new((i as f64).sin() * 10.0, 0.0, (i as f64).cos() * 7.0, t, 1.0, 0.0))
                .collect();
            let heading = derive_heading(&samples, index);
            prop_assert!(heading > -PI && heading <= PI);
        }
    }
}
