//! Error types for the watchdog crate.

use thiserror::Error;
use tickwork_scheduler::SchedulerError;

/// Errors that can occur during watchdog operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchdogError {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The registry's scheduler rejected the operation.
    #[error("Watchdog registry unavailable: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl WatchdogError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Whether the registry has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Scheduler(err) if err.is_closed())
    }
}

/// A specialized `Result` type for watchdog operations.
pub type WatchdogResult<T = ()> = Result<T, WatchdogError>;
