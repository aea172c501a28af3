//! Error types for the playback engine.

use thiserror::Error;

/// Errors raised by playback operations.
///
/// None of these are fatal. Callers absorb them: an empty trajectory resolves
/// to "no pose", an unknown event id leaves the selection untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Nearest-sample lookup on a trajectory with zero samples
    #[error("Trajectory has no samples")]
    EmptyTrajectory,
    
    /// A time outside `[0, duration]`. Seeking clamps instead of returning
    /// this; only explicit validation reports it.
    #[error("Time {time}ms is outside playback range [0, {duration}]ms")]
    OutOfRangeTime { time: u64, duration: u64 },
    
    /// `select_event` with an id that is not in the loaded event list
    #[error("Unknown timeline event: {0}")]
    UnknownEventId(String),
}
