//! TrajView Core - Trajectory Playback & Time-Synchronization Engine
//!
//! Replays a recorded vehicle trajectory against a controllable clock and keeps
//! three things consistent every frame:
//! 1. **Where**: the vehicle pose nearest to the playback time (binary search)
//! 2. **When**: play/pause/seek/speed with auto-stop at the end of the recording
//! 3. **What**: the timeline event nearest to the playback time, selectable in
//!    both directions
//!
//! ```text
//!  PlaybackContext ──► PlaybackDriver ──► PlaybackStore ──► resolve_pose ──► renderer
//!     (frames)            (await)          clock │ events        (pure)
//!                                                ▼
//!                                          StoreChange queue ──► timeline UI
//! ```

pub mod clock;
pub mod driver;
pub mod error;
pub mod events;
pub mod pose;
pub mod store;
pub mod trajectory;

// Re-export key types for convenience
pub use clock::{format_clock, Advance, ClockState, PlaybackClock, PlaybackState, MAX_SPEED, MIN_SPEED, SPEED_PRESETS};
pub use driver::{DriverConfig, DriverReport, PlaybackDriver, StopReason};
pub use error::PlaybackError;
pub use events::{nearest_event, update_selection, EventList, EventSynchronizer, Severity, TimelineError, TimelineEvent};
pub use pose::{resolve_pose, CameraPose, DisplayMode, FollowStyle, OrbitLimits, Pose, ViewMode};
pub use store::{PlaybackStore, StoreChange, MAX_QUEUED_CHANGES};
pub use trajectory::{derive_heading, nearest, nearest_index, Sample, SamplePosition, Trajectory, TrajectoryError};
