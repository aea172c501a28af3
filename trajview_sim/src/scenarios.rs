//! Playback stress scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// PB-001: Play the whole route at 1x through the async driver
    FullPlayback,

    /// PB-002: Random seeks, in and out of range
    ScrubStorm,

    /// PB-003: Timeline clicks while playing
    EventJumps,

    /// PB-004: Every speed preset plus out-of-range speeds
    SpeedSweep,

    /// PB-005: Jittery frames and stalls
    FrameJitter,

    /// PB-006: Load a new experiment mid-playback
    ReloadMidPlay,

    /// PB-007: Follow cameras over the whole route
    FollowCamera,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::FullPlayback,
            ScenarioId::ScrubStorm,
            ScenarioId::EventJumps,
            ScenarioId::SpeedSweep,
            ScenarioId::FrameJitter,
            ScenarioId::ReloadMidPlay,
            ScenarioId::FollowCamera,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::FullPlayback => "full_playback",
            ScenarioId::ScrubStorm => "scrub_storm",
            ScenarioId::EventJumps => "event_jumps",
            ScenarioId::SpeedSweep => "speed_sweep",
            ScenarioId::FrameJitter => "frame_jitter",
            ScenarioId::ReloadMidPlay => "reload_mid_play",
            ScenarioId::FollowCamera => "follow_camera",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::FullPlayback => "Play 60s at 1x, verify single auto-stop and selection at every frame",
            ScenarioId::ScrubStorm => "2000 random seeks incl. out-of-range, verify clamping and idempotence",
            ScenarioId::EventJumps => "Timeline clicks while playing, verify pause + seek + selection",
            ScenarioId::SpeedSweep => "Speed presets and junk speeds, verify clamping and elapsed time",
            ScenarioId::FrameJitter => "Gaussian frame jitter + 2s stalls, verify delta capping",
            ScenarioId::ReloadMidPlay => "Swap experiment and events mid-play, verify full reset",
            ScenarioId::FollowCamera => "Chase and first-person cameras, verify offsets and continuity",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full_playback" | "fullplayback" | "pb-001" => Ok(ScenarioId::FullPlayback),
            "scrub_storm" | "scrubstorm" | "pb-002" => Ok(ScenarioId::ScrubStorm),
            "event_jumps" | "eventjumps" | "pb-003" => Ok(ScenarioId::EventJumps),
            "speed_sweep" | "speedsweep" | "pb-004" => Ok(ScenarioId::SpeedSweep),
            "frame_jitter" | "framejitter" | "pb-005" => Ok(ScenarioId::FrameJitter),
            "reload_mid_play" | "reloadmidplay" | "pb-006" => Ok(ScenarioId::ReloadMidPlay),
            "follow_camera" | "followcamera" | "pb-007" => Ok(ScenarioId::FollowCamera),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
