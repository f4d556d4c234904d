//! Error types for the robot main loop.

use thiserror::Error;
use tickwork_scheduler::SchedulerError;
use tickwork_watchdog::WatchdogError;

/// Errors that can occur while running a robot program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RobotError {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A periodic callback was registered with a period under one microsecond.
    #[error("Periodic callback needs a non-zero period")]
    ZeroPeriod,

    /// `start_competition` was called a second time.
    #[error("Competition already started")]
    AlreadyStarted,

    /// The robot has ended its competition or been closed.
    #[error("Robot '{0}' is closed")]
    Closed(String),

    /// The main-loop scheduler rejected the operation.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// The loop-overrun watchdog could not be set up.
    #[error(transparent)]
    Watchdog(#[from] WatchdogError),
}

impl RobotError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a closed error.
    #[must_use]
    pub fn closed(name: impl Into<String>) -> Self {
        Self::Closed(name.into())
    }
}

/// A specialized `Result` type for robot operations.
pub type RobotResult<T = ()> = Result<T, RobotError>;
