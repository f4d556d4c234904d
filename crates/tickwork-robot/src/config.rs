//! Robot main-loop configuration.

use crate::DEFAULT_LOOP_PERIOD_MS;
use crate::error::{RobotError, RobotResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tickwork_scheduler::SchedulerConfig;
use tickwork_watchdog::WatchdogConfig;

/// Configuration for a [`crate::TimedRobot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimedRobotConfig {
    /// Main-loop period.
    pub period: Duration,
    /// Run the simulation hooks.
    pub simulation: bool,
    /// Name of the main-loop thread.
    pub thread_name: String,
    /// Name of the loop-overrun watchdog thread.
    pub watchdog_thread_name: String,
    /// Minimum time between two loop overrun warnings.
    pub overrun_warning_interval: Duration,
}

impl Default for TimedRobotConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(DEFAULT_LOOP_PERIOD_MS),
            simulation: false,
            thread_name: "robot-loop".to_string(),
            watchdog_thread_name: "robot-watchdog".to_string(),
            overrun_warning_interval: Duration::from_secs(1),
        }
    }
}

impl TimedRobotConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the period is under one microsecond or a thread name
    /// is empty.
    pub fn validate(&self) -> RobotResult<()> {
        if self.period < Duration::from_micros(1) {
            return Err(RobotError::invalid_configuration(
                "period must be at least one microsecond",
            ));
        }
        if self.thread_name.is_empty() || self.watchdog_thread_name.is_empty() {
            return Err(RobotError::invalid_configuration(
                "thread names must not be empty",
            ));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> TimedRobotConfigBuilder {
        TimedRobotConfigBuilder::default()
    }

    pub(crate) fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            thread_name: self.thread_name.clone(),
            overrun_warning_interval: self.overrun_warning_interval,
            ..SchedulerConfig::default()
        }
    }

    pub(crate) fn watchdog_config(&self) -> WatchdogConfig {
        WatchdogConfig {
            thread_name: self.watchdog_thread_name.clone(),
            timeout_print_period: self.overrun_warning_interval,
            ..WatchdogConfig::default()
        }
    }
}

/// Builder for `TimedRobotConfig`.
#[derive(Debug, Default)]
pub struct TimedRobotConfigBuilder {
    config: TimedRobotConfig,
}

impl TimedRobotConfigBuilder {
    /// Set the main-loop period.
    #[must_use]
    pub fn period(mut self, period: Duration) -> Self {
        self.config.period = period;
        self
    }

    /// Enable or disable the simulation hooks.
    #[must_use]
    pub fn simulation(mut self, simulation: bool) -> Self {
        self.config.simulation = simulation;
        self
    }

    /// Set the main-loop thread name.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Set the loop-overrun watchdog thread name.
    #[must_use]
    pub fn watchdog_thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.watchdog_thread_name = name.into();
        self
    }

    /// Set the overrun warning rate limit.
    #[must_use]
    pub fn overrun_warning_interval(mut self, interval: Duration) -> Self {
        self.config.overrun_warning_interval = interval;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> RobotResult<TimedRobotConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
