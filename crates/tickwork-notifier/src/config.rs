//! Notifier configuration.

use crate::error::{NotifierError, NotifierResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tickwork_scheduler::SchedulerConfig;

/// Configuration of a notifier with a dedicated scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Notifier name; also names the loop thread.
    pub name: String,
    /// Minimum time between two overrun warnings.
    pub overrun_warning_interval: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            name: "notifier".to_string(),
            overrun_warning_interval: Duration::from_secs(1),
        }
    }
}

impl NotifierConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty.
    pub fn validate(&self) -> NotifierResult<()> {
        if self.name.is_empty() {
            return Err(NotifierError::invalid_configuration("name must not be empty"));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> NotifierConfigBuilder {
        NotifierConfigBuilder::default()
    }

    /// Scheduler configuration for the dedicated loop.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            thread_name: self.name.clone(),
            overrun_warning_interval: self.overrun_warning_interval,
            ..SchedulerConfig::default()
        }
    }
}

/// Builder for `NotifierConfig`.
#[derive(Debug, Default)]
pub struct NotifierConfigBuilder {
    config: NotifierConfig,
}

impl NotifierConfigBuilder {
    /// Set the notifier name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the minimum interval between overrun warnings.
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
    pub fn build(self) -> NotifierResult<NotifierConfig> {
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
        let config = NotifierConfig::builder().name("blink").build()?;
        assert_eq!(config.name, "blink");
        assert_eq!(config.scheduler_config().thread_name, "blink");
        Ok(())
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = NotifierConfig::builder().name("").build();
        assert!(matches!(result, Err(NotifierError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_json_defaults() -> TestResult {
        let config: NotifierConfig = serde_json::from_str(r#"{"name":"led"}"#)?;
        assert_eq!(config.name, "led");
        assert_eq!(config.overrun_warning_interval, Duration::from_secs(1));
        Ok(())
    }
}
