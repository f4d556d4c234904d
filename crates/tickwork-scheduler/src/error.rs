//! Error types for the scheduler crate.

use crate::entry::EntryId;
use thiserror::Error;

/// Errors returned synchronously by scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The scheduler has been closed; no further entries are accepted.
    #[error("Scheduler '{0}' is closed")]
    Closed(String),

    /// A periodic entry was requested with a zero period.
    #[error("Period of entry {0} must be greater than 0")]
    ZeroPeriod(EntryId),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The loop thread could not be spawned.
    #[error("Failed to spawn scheduler thread '{name}': {reason}")]
    ThreadSpawn {
        /// Requested thread name.
        name: String,
        /// OS error description.
        reason: String,
    },
}

impl SchedulerError {
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

    /// Create a thread spawn error.
    #[must_use]
    pub fn thread_spawn(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ThreadSpawn {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error reports use of a closed scheduler.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// A specialized `Result` type for scheduler operations.
pub type SchedulerResult<T = ()> = Result<T, SchedulerError>;
