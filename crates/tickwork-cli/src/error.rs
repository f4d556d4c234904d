//! Error types for tickctl

use thiserror::Error;
use tickwork_alarm::AlarmError;
use tickwork_notifier::NotifierError;
use tickwork_robot::RobotError;
use tickwork_scheduler::SchedulerError;
use tickwork_watchdog::WatchdogError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Simulation stalled: {0}")]
    Stalled(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Alarm(#[from] AlarmError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Robot(#[from] RobotError),

    #[error(transparent)]
    Watchdog(#[from] WatchdogError),

    #[error(transparent)]
    Notifier(#[from] NotifierError),
}
