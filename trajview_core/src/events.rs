//! The Event Synchronizer - keeps the timeline selection in step with the clock
//!
//! Timeline events are a short, externally supplied list (typically fewer than
//! ten entries) with no ordering guarantee, so lookup is a linear scan.
//!
//! The selection works in both directions:
//! - **Clock → selection**: every time change reselects the event nearest the
//!   new time.
//! - **Selection → clock**: picking an event moves the clock to its time.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::error::PlaybackError;

/// Display category of a timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    #[default]
    Info,
    Failure,
}

/// A discrete, labelled moment on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Unique within its list
    pub id: String,

    /// Playback time in milliseconds
    pub time: u64,

    /// Headline, e.g. "Obstacle detected"
    #[serde(alias = "event")]
    pub label: String,

    /// Secondary text, e.g. "15 msec"
    #[serde(default, alias = "details")]
    pub detail: String,

    #[serde(default, alias = "type")]
    pub severity: Severity,
}

impl TimelineEvent {
    pub fn new(id: impl Into<String>, time: u64, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            time,
            label: label.into(),
            detail: String::new(),
            severity: Severity::Info,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

// ============================================================================
// EVENT LIST
// ============================================================================

/// Errors raised while building or loading an event list.
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("Duplicate timeline event id: {0}")]
    DuplicateId(String),

    #[error("Failed to read timeline: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse timeline: {0}")]
    Json(#[from] serde_json::Error),
}

/// An immutable list of timeline events with unique ids.
///
/// Order is preserved as supplied; it decides tie-breaks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TimelineEvent>", into = "Vec<TimelineEvent>")]
pub struct EventList {
    events: Vec<TimelineEvent>,
}

impl TryFrom<Vec<TimelineEvent>> for EventList {
    type Error = TimelineError;

    fn try_from(events: Vec<TimelineEvent>) -> Result<Self, Self::Error> {
        EventList::new(events)
    }
}

impl From<EventList> for Vec<TimelineEvent> {
    fn from(list: EventList) -> Self {
        list.events
    }
}

impl EventList {
    /// Creates a list, rejecting duplicate ids.
    pub fn new(events: Vec<TimelineEvent>) -> Result<Self, TimelineError> {
        for (i, event) in events.iter().enumerate() {
            if events[..i].iter().any(|e| e.id == event.id) {
                return Err(TimelineError::DuplicateId(event.id.clone()));
            }
        }
        Ok(Self { events })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a JSON array of events.
    pub fn from_json_str(json: &str) -> Result<Self, TimelineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a JSON array of events from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TimelineError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn as_slice(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimelineEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Looks up an event by id.
    pub fn get(&self, id: &str) -> Option<&TimelineEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

impl<'a> IntoIterator for &'a EventList {
    type Item = &'a TimelineEvent;
    type IntoIter = std::slice::Iter<'a, TimelineEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

// ============================================================================
// NEAREST EVENT
// ============================================================================

/// Returns the event whose time is closest to `time`.
///
/// First occurrence wins on ties. `None` only for an empty list.
pub fn nearest_event(events: &[TimelineEvent], time: u64) -> Option<&TimelineEvent> {
    let mut best: Option<(&TimelineEvent, u64)> = None;

    for event in events {
        let distance = event.time.abs_diff(time);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((event, distance)),
        }
    }

    best.map(|(event, _)| event)
}

/// Id of the event nearest to `time`.
pub fn update_selection(events: &[TimelineEvent], time: u64) -> Option<&str> {
    nearest_event(events, time).map(|e| e.id.as_str())
}

// ============================================================================
// SYNCHRONIZER
// ============================================================================

/// Holds the selected event id and keeps it consistent with the clock.
#[derive(Debug, Clone, Default)]
pub struct EventSynchronizer {
    selected: Option<String>,
}

impl EventSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Recomputes the selection for `time`.
    ///
    /// Returns true only when the selected id actually changed; an unchanged
    /// id is not rewritten.
    pub fn sync(&mut self, events: &EventList, time: u64) -> bool {
        let next = update_selection(events.as_slice(), time);
        if next == self.selected.as_deref() {
            return false;
        }
        self.selected = next.map(str::to_owned);
        true
    }

    /// Selects `id` directly and returns the event's time.
    ///
    /// Unknown ids leave the selection unchanged.
    pub fn select(&mut self, events: &EventList, id: &str) -> Result<u64, PlaybackError> {
        let event = events
            .get(id)
            .ok_or_else(|| PlaybackError::UnknownEventId(id.to_string()))?;
        let time = event.time;
        if self.selected.as_deref() != Some(id) {
            self.selected = Some(event.id.clone());
        }
        Ok(time)
    }

    /// Clears the selection. Returns true if something was selected.
    pub fn clear(&mut self) -> bool {
        self.selected.take().is_some()
    }
}
