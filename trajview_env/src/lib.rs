//! TrajView Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam that lets the playback engine be
//! driven by either a **Production** frame clock (tokio) or a **Simulated**
//! one (virtual time, seeded jitter).
//!
//! # Core Concept: Frame-Driven Playback
//!
//! The engine itself never blocks. Everything that waits - the gap between two
//! rendered frames - lives behind [`PlaybackContext::next_frame`]. Stopping the
//! context is the cancellation signal for whoever is driving playback.
//!
//! # Example
//!
//! ```ignore
//! use trajview_env::{PlaybackContext, TokioContext};
//!
//! async fn frame_loop<Ctx: PlaybackContext>(ctx: &Ctx) {
//!     while let Ok(tick) = ctx.next_frame().await {
//!         advance_playback(tick.delta_ms());
//!     }
//! }
//! ```

mod context;
mod types;
mod error;
mod tokio_impl;

pub use context::PlaybackContext;
pub use types::{frame_interval_for, FrameTick, DEFAULT_FRAME_RATE_HZ};
pub use error::EnvError;
pub use tokio_impl::TokioContext;
