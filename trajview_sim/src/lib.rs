//! TrajView Deterministic Playback Simulator
//!
//! Drives the playback engine with a virtual frame source instead of a real
//! display, so entire sessions (play, scrub, click events, swap recordings)
//! run in milliseconds and replay bit-for-bit from a single seed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        SimWorld                          │
//! │  ┌────────────────┐   frames   ┌──────────────────────┐  │
//! │  │   SimContext   │──────────► │    PlaybackDriver    │  │
//! │  │ virtual clock  │            └──────────┬───────────┘  │
//! │  │ seeded jitter  │                       ▼              │
//! │  └────────────────┘            ┌──────────────────────┐  │
//! │                                │    PlaybackStore     │  │
//! │  ┌────────────────┐  recording │  clock │ selection   │  │
//! │  │ RouteGenerator │──────────► └──────────┬───────────┘  │
//! │  └────────────────┘                       ▼              │
//! │                             ScenarioRunner assertions    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use trajview_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::ScrubStorm);
//! assert!(result.passed);
//! ```

mod context;
mod generator;
mod world;
pub mod exporter;
pub mod runner;
pub mod scenarios;
pub mod visualizer;

pub use context::{SimContext, MIN_FRAME};
pub use exporter::{SimExport, SimFrame};
pub use generator::{demo_events, Manoeuvre, RouteGenerator, Segment, DEMO_SEGMENTS, ROUTE_DURATION_MS, SAMPLE_INTERVAL_MS};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use visualizer::RerunLogger;
pub use world::{SimConfig, SimWorld};
