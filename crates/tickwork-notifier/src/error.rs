//! Error types for the notifier crate.

use thiserror::Error;
use tickwork_scheduler::SchedulerError;

/// Errors raised by notifier operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifierError {
    /// Periodic notifiers need a period of at least one microsecond.
    #[error("Notifier '{0}' period must be at least 1us")]
    ZeroPeriod(String),

    /// The notifier has been closed.
    #[error("Notifier '{0}' is closed")]
    Closed(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Error from the underlying scheduler.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl NotifierError {
    /// Create a closed error.
    #[must_use]
    pub fn closed(name: impl Into<String>) -> Self {
        Self::Closed(name.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

/// A specialized `Result` type for notifier operations.
pub type NotifierResult<T = ()> = Result<T, NotifierError>;
