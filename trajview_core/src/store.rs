//! Playback Store - single owner of clock, trajectory, events and selection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        PlaybackStore                         │
//! │  ┌───────────────┐  ┌──────────────────┐  ┌───────────────┐  │
//! │  │ PlaybackClock │  │ Arc<Trajectory>  │  │ Arc<EventList>│  │
//! │  └───────┬───────┘  └────────┬─────────┘  └───────┬───────┘  │
//! │          │ time              │ samples            │ events   │
//! │          ▼                   ▼                    ▼          │
//! │   ┌─────────────┐     ┌─────────────┐     ┌───────────────┐  │
//! │   │ StoreChange │     │ resolve_pose│     │EventSynchron- │  │
//! │   │    queue    │     │   (pure)    │     │     izer      │  │
//! │   └─────────────┘     └─────────────┘     └───────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every time change goes through the store so the selection can never drift
//! from the clock. Each effective mutation queues a [`StoreChange`]; writes
//! that leave a value as it was queue nothing. Back-to-back `TimeChanged`
//! entries collapse into the latest one and the queue holds at most
//! [`MAX_QUEUED_CHANGES`], so an undrained store stays bounded.
//!
//! # Usage
//!
//! ```ignore
//! use trajview_core::{PlaybackStore, ViewMode};
//!
//! let mut store = PlaybackStore::new();
//! store.load_experiment(trajectory);
//! store.load_timeline_events(events);
//! store.play();
//!
//! // Once per frame
//! store.advance(16.0);
//! let pose = store.pose(ViewMode::Free);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::{Advance, PlaybackClock, PlaybackState};
use crate::error::PlaybackError;
use crate::events::{EventList, EventSynchronizer, TimelineEvent};
use crate::pose::{resolve_pose, Pose, ViewMode};
use crate::trajectory::Trajectory;

/// Queue capacity; the oldest entries are dropped beyond it.
pub const MAX_QUEUED_CHANGES: usize = 1024;

/// A state change the UI should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    ExperimentLoaded { id: String, duration: u64 },
    EventsLoaded { count: usize },
    PlayStateChanged { playing: bool },
    TimeChanged { time: u64 },
    SpeedChanged { speed: f64 },
    SelectionChanged { selected: Option<String> },
}

/// Explicit owner of all playback state. Mutated through `&mut` only.
#[derive(Debug, Default)]
pub struct PlaybackStore {
    clock: PlaybackClock,
    trajectory: Option<Arc<Trajectory>>,
    events: Arc<EventList>,
    sync: EventSynchronizer,
    changes: VecDeque<StoreChange>,
}

impl PlaybackStore {
    /// Creates an empty store: no trajectory, no events, duration 0.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // INGEST
    // ========================================================================

    /// Replaces the trajectory, resetting the clock and the selection.
    pub fn load_experiment(&mut self, trajectory: impl Into<Arc<Trajectory>>) {
        let trajectory = trajectory.into();
        let duration = trajectory.duration();
        let was_playing = self.clock.is_playing();
        let previous_time = self.clock.current_time();

        info!(
            "Loaded experiment '{}' ({} samples, {}ms)",
            trajectory.id(),
            trajectory.len(),
            duration
        );

        self.clock.set_duration(duration);
        self.push_change(StoreChange::ExperimentLoaded {
            id: trajectory.id().to_string(),
            duration,
        });
        self.trajectory = Some(trajectory);

        if was_playing {
            self.push_change(StoreChange::PlayStateChanged { playing: false });
        }
        if previous_time != 0 {
            self.push_change(StoreChange::TimeChanged { time: 0 });
        }
        self.clear_selection();
    }

    /// Replaces the timeline events and clears the selection.
    ///
    /// The next time change selects against the new list.
    pub fn load_timeline_events(&mut self, events: impl Into<Arc<EventList>>) {
        let events = events.into();
        info!("Loaded {} timeline events", events.len());

        self.push_change(StoreChange::EventsLoaded { count: events.len() });
        self.events = events;
        self.clear_selection();
    }

    // ========================================================================
    // TRANSPORT
    // ========================================================================

    pub fn play(&mut self) -> bool {
        if !self.clock.play() {
            return false;
        }
        debug!("Playback started at {}ms", self.clock.current_time());
        self.push_change(StoreChange::PlayStateChanged { playing: true });
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.clock.pause() {
            return false;
        }
        debug!("Playback paused at {}ms", self.clock.current_time());
        self.push_change(StoreChange::PlayStateChanged { playing: false });
        true
    }

    pub fn toggle(&mut self) -> bool {
        if self.clock.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Pauses, rewinds to 0 and clears the selection.
    pub fn reset(&mut self) {
        let was_playing = self.clock.is_playing();
        let previous_time = self.clock.current_time();
        self.clock.reset();
        debug!("Playback reset");

        if was_playing {
            self.push_change(StoreChange::PlayStateChanged { playing: false });
        }
        if previous_time != 0 {
            self.push_change(StoreChange::TimeChanged { time: 0 });
        }
        self.clear_selection();
    }

    /// Sets the speed multiplier, clamped to `[MIN_SPEED, MAX_SPEED]`.
    pub fn set_speed(&mut self, speed: f64) {
        if self.clock.set_speed(speed) {
            self.push_change(StoreChange::SpeedChanged {
                speed: self.clock.speed(),
            });
        }
    }

    // ========================================================================
    // TIME
    // ========================================================================

    /// Seeks to `time` (clamped to `[0, duration]`) and reselects the
    /// nearest event.
    pub fn set_current_time(&mut self, time: u64) {
        if self.clock.set_current_time(time) {
            self.push_change(StoreChange::TimeChanged {
                time: self.clock.current_time(),
            });
        }
        self.resync_selection();
    }

    /// Seeks with sub-millisecond precision.
    pub fn set_current_time_ms(&mut self, time_ms: f64) {
        let before = self.clock.current_time();
        self.clock.set_current_time_ms(time_ms);
        if self.clock.current_time() != before {
            self.push_change(StoreChange::TimeChanged {
                time: self.clock.current_time(),
            });
        }
        self.resync_selection();
    }

    /// Advances playback by one frame of `delta_ms` wall time.
    pub fn advance(&mut self, delta_ms: f64) -> Advance {
        let before = self.clock.current_time();
        let advance = self.clock.advance(delta_ms);

        if self.clock.current_time() != before {
            self.on_time_changed();
        }
        if advance.reached_end {
            debug!("Playback reached end at {}ms", self.clock.duration());
            self.push_change(StoreChange::PlayStateChanged { playing: false });
        }
        advance
    }

    // ========================================================================
    // SELECTION
    // ========================================================================

    /// Jumps to a timeline event: pause, seek to its time, select it.
    ///
    /// An unknown id is logged and leaves the store untouched.
    pub fn select_event(&mut self, id: &str) -> Result<(), PlaybackError> {
        let Some(time) = self.events.get(id).map(|e| e.time) else {
            warn!("Ignoring selection of unknown timeline event '{}'", id);
            return Err(PlaybackError::UnknownEventId(id.to_string()));
        };

        self.pause();
        if self.clock.set_current_time(time) {
            self.push_change(StoreChange::TimeChanged {
                time: self.clock.current_time(),
            });
        }

        let previous = self.sync.selected().map(str::to_owned);
        self.sync.select(&self.events, id)?;
        if previous.as_deref() != Some(id) {
            self.push_selection();
        }
        debug!("Selected timeline event '{}' at {}ms", id, time);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if self.sync.clear() {
            self.push_selection();
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Pose of the vehicle at the current time. `None` without samples.
    pub fn pose(&self, mode: ViewMode) -> Option<Pose> {
        let trajectory = self.trajectory.as_deref()?;
        resolve_pose(trajectory, self.clock.current_time(), mode)
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.snapshot()
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn current_time(&self) -> u64 {
        self.clock.current_time()
    }

    pub fn duration(&self) -> u64 {
        self.clock.duration()
    }

    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn selected_event_id(&self) -> Option<&str> {
        self.sync.selected()
    }

    pub fn selected_event(&self) -> Option<&TimelineEvent> {
        self.sync.selected().and_then(|id| self.events.get(id))
    }

    pub fn trajectory(&self) -> Option<&Arc<Trajectory>> {
        self.trajectory.as_ref()
    }

    pub fn events(&self) -> &Arc<EventList> {
        &self.events
    }

    /// Takes all queued changes, oldest first.
    pub fn drain_changes(&mut self) -> Vec<StoreChange> {
        self.changes.drain(..).collect()
    }

    /// Number of changes waiting to be drained.
    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn push_change(&mut self, change: StoreChange) {
        if matches!(change, StoreChange::TimeChanged { .. })
            && matches!(self.changes.back(), Some(StoreChange::TimeChanged { .. }))
        {
            self.changes.pop_back();
        }
        if self.changes.len() >= MAX_QUEUED_CHANGES {
            self.changes.pop_front();
        }
        self.changes.push_back(change);
    }

    fn on_time_changed(&mut self) {
        self.push_change(StoreChange::TimeChanged {
            time: self.clock.current_time(),
        });
        self.resync_selection();
    }

    fn resync_selection(&mut self) {
        if self.sync.sync(&self.events, self.clock.current_time()) {
            self.push_selection();
        }
    }

    fn push_selection(&mut self) {
        self.push_change(StoreChange::SelectionChanged {
            selected: self.sync.selected().map(str::to_owned),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::FollowStyle;
    use crate::trajectory::Sample;
    use approx::assert_relative_eq;

    /// 60 s straight line along +x, one sample per second.
    fn minute_route() -> Trajectory {
        let samples = (0..=60)
            .map(|i| Sample::new(i as f64, 0.0, 0.0, 1_000 + i * 1_000, 5.0, 0.0))
            .collect();
        Trajectory::new("exp-1", "Minute route", samples).unwrap()
    }

    fn scenario_events() -> EventList {
        EventList::new(vec![
            TimelineEvent::new("a", 0, "Start"),
            TimelineEvent::new("b", 30_000, "Stopped at stop sign"),
            TimelineEvent::new("c", 50_000, "Speed reduced"),
        ])
        .unwrap()
    }

    fn loaded_store() -> PlaybackStore {
        let mut store = PlaybackStore::new();
        store.load_experiment(minute_route());
        store.load_timeline_events(scenario_events());
        store.drain_changes();
        store
    }

    #[test]
    fn test_store_scenario() {
        let mut store = loaded_store();
        assert_eq!(store.duration(), 60_000);

        store.set_current_time(29_999);
        assert_eq!(store.selected_event_id(), Some("b"));

        store.set_current_time(15_000);
        assert_eq!(store.selected_event_id(), Some("a"));

        store.play();
        store.select_event("c").unwrap();
        assert_eq!(store.current_time(), 50_000);
        assert_eq!(store.selected_event_id(), Some("c"));
        assert!(!store.is_playing());
    }

    #[test]
    fn test_select_event_round_trip() {
        let mut store = loaded_store();

        for id in ["a", "b", "c"] {
            store.select_event(id).unwrap();
            let event = store.selected_event().unwrap();
            assert_eq!(event.id, id);
            assert_eq!(store.current_time(), event.time);
        }
    }

    #[test]
    fn test_select_unknown_event_leaves_state() {
        let mut store = loaded_store();
        store.set_current_time(12_345);
        store.play();
        store.drain_changes();

        let result = store.select_event("zzz");
        assert_eq!(result, Err(PlaybackError::UnknownEventId("zzz".to_string())));
        assert_eq!(store.current_time(), 12_345);
        assert!(store.is_playing());
        assert_eq!(store.selected_event_id(), Some("a"));
        assert!(store.drain_changes().is_empty());
    }

    #[test]
    fn test_selection_follows_clock_advance() {
        let mut store = loaded_store();
        store.set_current_time(39_000);
        store.play();

        // 16 frames of ~1s at 1x
        for _ in 0..16 {
            store.advance(1_000.0);
        }
        assert_eq!(store.current_time(), 55_000);
        assert_eq!(store.selected_event_id(), Some("c"));
    }

    #[test]
    fn test_advance_auto_stops_at_end() {
        let mut store = loaded_store();
        store.set_speed(5.0);
        store.play();

        let mut ends = 0;
        for _ in 0..2_000 {
            if store.advance(16.0).reached_end {
                ends += 1;
            }
            assert!(store.current_time() <= store.duration());
        }

        assert_eq!(ends, 1);
        assert_eq!(store.current_time(), 60_000);
        assert!(!store.is_playing());
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut store = loaded_store();

        store.set_speed(7.0);
        assert_relative_eq!(store.speed(), 5.0);

        store.set_speed(0.0);
        assert_relative_eq!(store.speed(), 0.1);
    }

    #[test]
    fn test_seek_clamps_and_is_idempotent() {
        let mut store = loaded_store();

        store.set_current_time(90_000);
        assert_eq!(store.current_time(), 60_000);
        let changes = store.drain_changes();

        store.set_current_time(90_000);
        assert_eq!(store.current_time(), 60_000);
        assert!(store.drain_changes().is_empty());
        assert!(changes.contains(&StoreChange::TimeChanged { time: 60_000 }));
    }

    #[test]
    fn test_reset_clears_selection() {
        let mut store = loaded_store();
        store.select_event("b").unwrap();
        store.play();

        store.reset();
        assert_eq!(store.current_time(), 0);
        assert!(!store.is_playing());
        assert_eq!(store.selected_event_id(), None);
    }

    #[test]
    fn test_load_experiment_resets_playback() {
        let mut store = loaded_store();
        store.select_event("c").unwrap();
        store.play();
        store.drain_changes();

        store.load_experiment(minute_route());

        assert_eq!(store.current_time(), 0);
        assert!(!store.is_playing());
        assert_eq!(store.selected_event_id(), None);

        let changes = store.drain_changes();
        assert_eq!(
            changes[0],
            StoreChange::ExperimentLoaded {
                id: "exp-1".to_string(),
                duration: 60_000
            }
        );
        assert!(changes.contains(&StoreChange::SelectionChanged { selected: None }));
    }

    #[test]
    fn test_load_events_clears_then_next_seek_reselects() {
        let mut store = loaded_store();
        store.set_current_time(49_000);
        assert_eq!(store.selected_event_id(), Some("c"));

        store.load_timeline_events(
            EventList::new(vec![TimelineEvent::new("only", 1_000, "Only")]).unwrap(),
        );
        assert_eq!(store.selected_event_id(), None);

        store.set_current_time(49_500);
        assert_eq!(store.selected_event_id(), Some("only"));
    }

    #[test]
    fn test_redundant_writes_are_silent() {
        let mut store = loaded_store();
        store.set_current_time(100);
        store.drain_changes();

        store.set_current_time(200);
        let changes = store.drain_changes();
        assert_eq!(changes, vec![StoreChange::TimeChanged { time: 200 }]);

        store.pause();
        store.set_speed(1.0);
        assert!(store.drain_changes().is_empty());
    }

    #[test]
    fn test_play_at_end_keeps_time() {
        let mut store = loaded_store();
        store.set_current_time(60_000);
        assert_eq!(store.selected_event_id(), Some("c"));
        store.drain_changes();

        assert!(store.play());
        assert_eq!(store.current_time(), 60_000);
        assert_eq!(store.selected_event_id(), Some("c"));
        assert_eq!(store.drain_changes(), vec![StoreChange::PlayStateChanged { playing: true }]);

        // The next frame stops it again at the end
        let advance = store.advance(16.0);
        assert!(advance.reached_end);
        assert!(!store.is_playing());
        assert_eq!(store.current_time(), 60_000);
    }

    #[test]
    fn test_undrained_changes_stay_bounded() {
        let mut store = loaded_store();
        store.set_speed(0.1);

        for _ in 0..3 {
            store.reset();
            store.play();
            while store.is_playing() {
                store.advance(16.0);
            }
            assert!(store.pending_changes() < 64);
        }
        assert_eq!(store.current_time(), 60_000);

        let changes = store.drain_changes();
        let times = changes
            .iter()
            .filter(|c| matches!(c, StoreChange::TimeChanged { .. }))
            .count();
        assert!(times < 20, "{:?}", changes);
        assert_eq!(changes.last(), Some(&StoreChange::PlayStateChanged { playing: false }));
    }

    #[test]
    fn test_consecutive_time_changes_collapse() {
        let mut store = loaded_store();
        store.set_current_time(50);
        store.drain_changes();

        store.set_current_time(100);
        store.set_current_time(200);
        store.set_current_time(300);
        assert_eq!(store.drain_changes(), vec![StoreChange::TimeChanged { time: 300 }]);
    }

    #[test]
    fn test_change_queue_is_capped() {
        let mut store = loaded_store();
        store.drain_changes();

        for i in 0..MAX_QUEUED_CHANGES as u64 + 10 {
            // Alternating speed and time keeps entries from collapsing
            store.set_speed(if i % 2 == 0 { 2.0 } else { 3.0 });
            store.set_current_time(i % 2);
        }
        assert_eq!(store.pending_changes(), MAX_QUEUED_CHANGES);

        let changes = store.drain_changes();
        assert_eq!(changes.len(), MAX_QUEUED_CHANGES);
        assert_eq!(store.pending_changes(), 0);
    }

    #[test]
    fn test_pose_uses_relative_time() {
        let mut store = loaded_store();
        assert!(PlaybackStore::new().pose(ViewMode::Free).is_none());

        store.set_current_time(10_000);
        let pose = store.pose(ViewMode::Follow(FollowStyle::Chase)).unwrap();
        assert_eq!(pose.timestamp, 11_000);
        assert_relative_eq!(pose.position.x, 10.0);
        assert!(pose.camera.is_some());
    }

    #[test]
    fn test_empty_trajectory_cannot_play() {
        let mut store = PlaybackStore::new();
        store.load_experiment(Trajectory::empty("blank", "Blank"));

        assert_eq!(store.duration(), 0);
        assert!(!store.play());
        assert!(store.pose(ViewMode::Free).is_none());
    }
}
