//! Error types for the TrajView frame-driver abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The frame source was stopped (teardown, user closed the view)
    #[error("Frame driver stopped")]
    DriverStopped,
    
    /// Context operation failed
    #[error("Context error: {0}")]
    ContextError(String),
    
    /// No frame arrived within the allotted time
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl EnvError {
    /// Creates a context error.
    pub fn context(msg: impl Into<String>) -> Self {
        Self::ContextError(msg.into())
    }
    
    /// Returns true if this error means the frame source has shut down.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::DriverStopped)
    }
}
