//! JSON exporter for playback sessions.
//!
//! Records one frame per applied tick so a session can be replayed or plotted
//! outside the simulator.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use trajview_core::{PlaybackStore, Pose, ViewMode};

/// A single frame of playback data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Virtual wall time in seconds
    pub time_sec: f64,

    /// Playback time in ms
    pub time_ms: u64,

    pub playing: bool,

    pub speed: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_event: Option<String>,

    /// Resolved vehicle pose (absent without a trajectory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose: Option<Pose>,
}

impl SimFrame {
    /// Captures the store as it stands after a tick.
    pub fn capture(store: &PlaybackStore, time_sec: f64, mode: ViewMode) -> Self {
        Self {
            time_sec,
            time_ms: store.current_time(),
            playing: store.is_playing(),
            speed: store.speed(),
            selected_event: store.selected_event_id().map(str::to_owned),
            pose: store.pose(mode),
        }
    }
}

/// Complete session export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Playback time of the last frame in ms
    pub duration_ms: u64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_ms: 0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_ms = frame.time_ms;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{SimConfig, SimWorld};

    #[test]
    fn test_export_tracks_last_frame() {
        let mut world = SimWorld::new(SimConfig::default()).unwrap();
        let mut export = SimExport::new("full_playback", 42);

        world.store.play();
        for _ in 0..30 {
            world.tick().unwrap();
            export.add_frame(SimFrame::capture(&world.store, world.time(), ViewMode::Free));
        }
        export.finalize(true, None);

        assert_eq!(export.frames.len(), 30);
        assert_eq!(export.duration_ms, world.store.current_time());
        assert!(export.frames.iter().all(|f| f.pose.is_some()));
    }

    #[test]
    fn test_export_json_shape() {
        let mut world = SimWorld::new(SimConfig::default()).unwrap();
        world.store.select_event("stop").unwrap();

        let mut export = SimExport::new("event_jumps", 1);
        export.add_frame(SimFrame::capture(&world.store, 0.0, ViewMode::Free));

        let json: serde_json::Value = serde_json::to_value(&export).unwrap();
        assert_eq!(json["frames"][0]["time_ms"], 30_000);
        assert_eq!(json["frames"][0]["selected_event"], "stop");
        assert!(json.get("failure_reason").is_none());
    }
}
