//! Watchdog registry configuration.

use crate::error::{WatchdogError, WatchdogResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tickwork_scheduler::SchedulerConfig;

/// Configuration shared by a registry and its watchdogs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Name of the registry's loop thread.
    pub thread_name: String,
    /// Minimum time between two timeout warnings of one watchdog.
    pub timeout_print_period: Duration,
    /// Minimum time between two epoch dumps of one watchdog.
    pub epoch_print_period: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            thread_name: "watchdog".to_string(),
            timeout_print_period: Duration::from_secs(1),
            epoch_print_period: Duration::from_secs(1),
        }
    }
}

impl WatchdogConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread name is empty.
    pub fn validate(&self) -> WatchdogResult<()> {
        if self.thread_name.is_empty() {
            return Err(WatchdogError::invalid_configuration(
                "thread_name must not be empty",
            ));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> WatchdogConfigBuilder {
        WatchdogConfigBuilder::default()
    }

    pub(crate) fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::named(self.thread_name.clone())
    }
}

/// Builder for `WatchdogConfig`.
#[derive(Debug, Default)]
pub struct WatchdogConfigBuilder {
    config: WatchdogConfig,
}

impl WatchdogConfigBuilder {
    /// Set the loop thread name.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Set the timeout warning rate limit.
    #[must_use]
    pub fn timeout_print_period(mut self, period: Duration) -> Self {
        self.config.timeout_print_period = period;
        self
    }

    /// Set the epoch dump rate limit.
    #[must_use]
    pub fn epoch_print_period(mut self, period: Duration) -> Self {
        self.config.epoch_print_period = period;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> WatchdogResult<WatchdogConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_builder() -> TestResult {
        let config = WatchdogConfig::builder()
            .thread_name("wd")
            .timeout_print_period(Duration::from_millis(500))
            .build()?;
        assert_eq!(config.thread_name, "wd");
        assert_eq!(config.timeout_print_period, Duration::from_millis(500));
        assert_eq!(config.epoch_print_period, Duration::from_secs(1));
        Ok(())
    }

    #[test]
    fn test_empty_thread_name_rejected() {
        let result = WatchdogConfig::builder().thread_name("").build();
        assert!(matches!(result, Err(WatchdogError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_serde_roundtrip_keeps_defaults() -> TestResult {
        let config: WatchdogConfig = serde_json::from_str("{}")?;
        assert_eq!(config, WatchdogConfig::default());
        Ok(())
    }
}
