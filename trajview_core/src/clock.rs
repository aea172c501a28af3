//! The Playback Clock - virtual time, speed, and the play/pause state machine
//!
//! Time is integrated per rendered frame: `t += delta * speed`. The clock keeps
//! fractional milliseconds internally so that slow playback (0.1x at 60Hz is
//! 1.6ms per frame) does not stall on rounding, and reports whole milliseconds.
//!
//! # States
//!
//! ```text
//!            play()                 advance() reaches duration
//!   Paused ─────────► Playing ─────────────────────────────────► Paused
//!     ▲                  │
//!     └──── pause() ─────┘        reset(): any ─► Paused, t = 0
//! ```
//!
//! Playback stops exactly once at the end; it never loops.

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/// Slowest accepted playback speed.
pub const MIN_SPEED: f64 = 0.1;

/// Fastest accepted playback speed.
pub const MAX_SPEED: f64 = 5.0;

/// Multipliers offered by the speed selector.
pub const SPEED_PRESETS: [f64; 6] = [0.25, 0.5, 1.0, 1.5, 2.0, 3.0];

/// Frame interval the renderer is tuned for (60Hz).
pub const NOMINAL_FRAME_MS: f64 = 16.0;

/// Run state of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockState {
    Paused,
    Playing,
}

/// Snapshot of the clock, in the shape the UI consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,

    /// Milliseconds since the start of the trajectory
    pub current_time: u64,

    /// Total playback length in milliseconds
    pub duration: u64,

    pub speed: f64,
}

/// Outcome of a single [`PlaybackClock::advance`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Advance {
    /// Reported `current_time` changed
    pub moved: bool,

    /// This step hit the end and paused playback
    pub reached_end: bool,
}

/// The playback clock.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    state: ClockState,

    /// Current time in fractional milliseconds, always in `[0, duration]`
    current_ms: f64,

    duration: u64,

    speed: f64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl PlaybackClock {
    /// Creates a paused clock at time 0 with speed 1.0.
    pub fn new(duration: u64) -> Self {
        Self {
            state: ClockState::Paused,
            current_ms: 0.0,
            duration,
            speed: 1.0,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == ClockState::Playing
    }

    /// Current time in whole milliseconds.
    pub fn current_time(&self) -> u64 {
        (self.current_ms.floor() as u64).min(self.duration)
    }

    /// Current time including the fractional part.
    pub fn current_time_precise(&self) -> f64 {
        self.current_ms
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Fraction of the recording played, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.duration == 0 {
            0.0
        } else {
            self.current_ms / self.duration as f64
        }
    }

    pub fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            is_playing: self.is_playing(),
            current_time: self.current_time(),
            duration: self.duration,
            speed: self.speed,
        }
    }

    /// Installs a new duration: paused, back at 0. Speed is kept.
    pub fn set_duration(&mut self, duration: u64) {
        self.duration = duration;
        self.current_ms = 0.0;
        self.state = ClockState::Paused;
    }

    /// Starts playback. Returns true if the state changed.
    ///
    /// Nothing to play when the duration is 0. Time is left alone; at the end
    /// the next `advance` stops playback again.
    pub fn play(&mut self) -> bool {
        if self.is_playing() || self.duration == 0 {
            return false;
        }
        self.state = ClockState::Playing;
        true
    }

    /// Pauses playback. Returns true if the state changed.
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.state = ClockState::Paused;
        true
    }

    /// Play/pause button.
    pub fn toggle(&mut self) -> bool {
        if self.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Back to 0, paused. Returns true if anything changed.
    pub fn reset(&mut self) -> bool {
        let changed = self.is_playing() || self.current_ms != 0.0;
        self.state = ClockState::Paused;
        self.current_ms = 0.0;
        changed
    }

    /// Sets playback speed, clamped to `[MIN_SPEED, MAX_SPEED]`.
    ///
    /// Non-finite input is ignored. Returns true if the stored speed changed.
    pub fn set_speed(&mut self, speed: f64) -> bool {
        if !speed.is_finite() {
            return false;
        }
        let clamped = speed.clamp(MIN_SPEED, MAX_SPEED);
        let changed = clamped != self.speed;
        self.speed = clamped;
        changed
    }

    /// Seeks to `time`, clamped to `[0, duration]`. Play state is unchanged.
    ///
    /// Returns true if the reported time changed.
    pub fn set_current_time(&mut self, time: u64) -> bool {
        let before = self.current_time();
        self.current_ms = time.min(self.duration) as f64;
        self.current_time() != before
    }

    /// Seeks to a fractional time such as a slider position.
    ///
    /// Negative and NaN values clamp to 0, large ones to the duration.
    pub fn set_current_time_ms(&mut self, time_ms: f64) -> bool {
        let before = self.current_time();
        self.current_ms = if time_ms.is_nan() {
            0.0
        } else {
            time_ms.clamp(0.0, self.duration as f64)
        };
        self.current_time() != before
    }

    /// Checks that `time` lies in `[0, duration]` without seeking.
    pub fn validate_time(&self, time: u64) -> Result<u64, PlaybackError> {
        if time > self.duration {
            Err(PlaybackError::OutOfRangeTime {
                time,
                duration: self.duration,
            })
        } else {
            Ok(time)
        }
    }

    /// Integrates one frame of `delta_ms` milliseconds.
    ///
    /// Only moves while playing. Any positive delta is accepted; zero,
    /// negative or non-finite deltas are ignored. Reaching the duration clamps
    /// to it and pauses.
    pub fn advance(&mut self, delta_ms: f64) -> Advance {
        if !self.is_playing() || !delta_ms.is_finite() || delta_ms <= 0.0 {
            return Advance::default();
        }

        let before = self.current_time();
        let next = self.current_ms + delta_ms * self.speed;
        let end = self.duration as f64;

        if next >= end {
            self.current_ms = end;
            self.state = ClockState::Paused;
            Advance {
                moved: self.current_time() != before,
                reached_end: true,
            }
        } else {
            self.current_ms = next;
            Advance {
                moved: self.current_time() != before,
                reached_end: false,
            }
        }
    }
}

/// Formats milliseconds as `m:ss` for the time display.
pub fn format_clock(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_new_clock_is_paused_at_zero() {
        let clock = PlaybackClock::new(60_000);
        assert_eq!(clock.state(), ClockState::Paused);
        assert_eq!(clock.current_time(), 0);
        assert_eq!(clock.speed(), 1.0);
    }

    #[test]
    fn test_play_pause_are_idempotent() {
        let mut clock = PlaybackClock::new(1000);

        assert!(clock.play());
        assert!(!clock.play());
        assert!(clock.is_playing());

        assert!(clock.pause());
        assert!(!clock.pause());
        assert!(!clock.is_playing());
    }

    #[test]
    fn test_play_without_duration_is_noop() {
        let mut clock = PlaybackClock::new(0);
        assert!(!clock.play());
        assert_eq!(clock.state(), ClockState::Paused);
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut clock = PlaybackClock::new(1000);

        clock.set_speed(7.0);
        assert_eq!(clock.speed(), 5.0);

        clock.set_speed(0.0);
        assert_eq!(clock.speed(), 0.1);

        clock.set_speed(f64::NAN);
        assert_eq!(clock.speed(), 0.1);

        for preset in SPEED_PRESETS {
            clock.set_speed(preset);
            assert_eq!(clock.speed(), preset);
        }
    }

    #[test]
    fn test_set_speed_keeps_play_state() {
        let mut clock = PlaybackClock::new(1000);
        clock.play();
        clock.set_speed(2.0);
        assert!(clock.is_playing());
    }

    #[test]
    fn test_advance_integrates_speed() {
        let mut clock = PlaybackClock::new(60_000);
        clock.set_speed(2.0);
        clock.play();

        let step = clock.advance(NOMINAL_FRAME_MS);
        assert!(step.moved);
        assert!(!step.reached_end);
        assert_eq!(clock.current_time(), 32);
    }

    #[test]
    fn test_advance_keeps_fractional_progress() {
        let mut clock = PlaybackClock::new(1000);
        clock.set_speed(0.5);
        clock.play();

        // 1.5ms per frame; whole-ms rounding would lose half of it
        let first = clock.advance(3.0);
        assert!(first.moved);
        for _ in 0..4 {
            clock.advance(3.0);
        }
        assert_eq!(clock.current_time(), 7);
        assert_relative_eq!(clock.current_time_precise(), 7.5, epsilon = 1e-9);
    }

    #[test]
    fn test_advance_ignored_while_paused_or_bad_delta() {
        let mut clock = PlaybackClock::new(1000);
        assert_eq!(clock.advance(16.0), Advance::default());

        clock.play();
        assert_eq!(clock.advance(0.0), Advance::default());
        assert_eq!(clock.advance(-5.0), Advance::default());
        assert_eq!(clock.advance(f64::INFINITY), Advance::default());
        assert_eq!(clock.current_time(), 0);
    }

    #[test]
    fn test_auto_stop_at_end() {
        let mut clock = PlaybackClock::new(100);
        clock.play();

        let step = clock.advance(250.0);
        assert!(step.reached_end);
        assert_eq!(clock.current_time(), 100);
        assert!(!clock.is_playing());

        // Stopped for good; further frames do nothing
        assert_eq!(clock.advance(16.0), Advance::default());
    }

    #[test]
    fn test_play_at_end_does_not_rewind() {
        let mut clock = PlaybackClock::new(100);
        clock.play();
        clock.advance(100.0);
        assert_eq!(clock.current_time(), 100);

        assert!(clock.play());
        assert_eq!(clock.current_time(), 100);

        let advance = clock.advance(16.0);
        assert!(advance.reached_end);
        assert!(!advance.moved);
        assert!(!clock.is_playing());
        assert_eq!(clock.current_time(), 100);
    }

    #[test]
    fn test_set_current_time_clamps() {
        let mut clock = PlaybackClock::new(60_000);

        clock.set_current_time(90_000);
        assert_eq!(clock.current_time(), 60_000);
        assert!(!clock.set_current_time(90_000));

        clock.set_current_time_ms(-10.0);
        assert_eq!(clock.current_time(), 0);

        clock.set_current_time_ms(f64::NAN);
        assert_eq!(clock.current_time(), 0);

        clock.set_current_time_ms(1234.9);
        assert_eq!(clock.current_time(), 1234);
    }

    #[test]
    fn test_scrub_keeps_play_state() {
        let mut clock = PlaybackClock::new(1000);
        clock.play();
        clock.set_current_time(500);
        assert!(clock.is_playing());
    }

    #[test]
    fn test_reset() {
        let mut clock = PlaybackClock::new(1000);
        assert!(!clock.reset());

        clock.play();
        clock.advance(300.0);
        assert!(clock.reset());
        assert_eq!(clock.current_time(), 0);
        assert!(!clock.is_playing());
    }

    #[test]
    fn test_validate_time() {
        let clock = PlaybackClock::new(1000);
        assert_eq!(clock.validate_time(1000), Ok(1000));
        assert_eq!(
            clock.validate_time(1001),
            Err(PlaybackError::OutOfRangeTime { time: 1001, duration: 1000 })
        );
    }

    #[test]
    fn test_progress_and_snapshot() {
        let mut clock = PlaybackClock::new(2000);
        clock.set_current_time(500);
        assert_relative_eq!(clock.progress(), 0.25);

        let state = clock.snapshot();
        assert_eq!(state.current_time, 500);
        assert_eq!(state.duration, 2000);
        assert!(!state.is_playing);

        assert_eq!(PlaybackClock::new(0).progress(), 0.0);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(59_999), "0:59");
        assert_eq!(format_clock(60_000), "1:00");
        assert_eq!(format_clock(754_321), "12:34");
    }

    proptest! {
        #[test]
        fn prop_advance_never_exceeds_duration_and_stops(
            duration in 1u64..100_000,
            start in 0u64..100_000,
            speed in 0.0f64..8.0,
            deltas in prop::collection::vec(0.1f64..500.0, 1..32),
        ) {
            let mut clock = PlaybackClock::new(duration);
            clock.set_speed(speed);
            clock.set_current_time(start);
            clock.play();

            for delta in deltas {
                clock.advance(delta);
                prop_assert!(clock.current_time() <= duration);
            }

            // Keep feeding frames: playback must end at the duration
            let mut frames = 0u64;
            while clock.is_playing() {
                clock.advance(NOMINAL_FRAME_MS);
                frames += 1;
                prop_assert!(frames < 1_000_000);
            }
            prop_assert_eq!(clock.current_time(), duration);
        }

        #[test]
        fn prop_set_current_time_is_idempotent(
            duration in 0u64..100_000,
            time in 0u64..200_000,
        ) {
            let mut clock = PlaybackClock::new(duration);
            clock.set_current_time(time);
            let first = clock.current_time();
            prop_assert_eq!(first, time.min(duration));

            prop_assert!(!clock.set_current_time(time));
            prop_assert_eq!(clock.current_time(), first);
        }
    }
}
