//! Scheduler configuration.

use crate::entry::CallbackFault;
use crate::error::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Hook invoked on the loop thread for every callback panic.
pub type FaultHook = Arc<dyn Fn(&CallbackFault) + Send + Sync>;

/// Configuration of one scheduler loop.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Name of the loop thread and of its alarm.
    pub thread_name: String,
    /// Minimum time between two overrun warnings.
    pub overrun_warning_interval: Duration,
    /// Lateness samples retained for percentile queries.
    pub lateness_samples: usize,
    /// Optional fault hook; not serialized.
    #[serde(skip)]
    pub fault_hook: Option<FaultHook>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_name: "tickwork-loop".to_string(),
            overrun_warning_interval: Duration::from_secs(1),
            lateness_samples: crate::DEFAULT_LATENESS_SAMPLES,
            fault_hook: None,
        }
    }
}

impl fmt::Debug for SchedulerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerConfig")
            .field("thread_name", &self.thread_name)
            .field("overrun_warning_interval", &self.overrun_warning_interval)
            .field("lateness_samples", &self.lateness_samples)
            .field("fault_hook", &self.fault_hook.is_some())
            .finish()
    }
}

impl SchedulerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread name is empty or contains a NUL byte.
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.thread_name.is_empty() {
            return Err(SchedulerError::invalid_configuration(
                "thread_name must not be empty",
            ));
        }
        if self.thread_name.contains('\0') {
            return Err(SchedulerError::invalid_configuration(
                "thread_name must not contain NUL bytes",
            ));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }

    /// Default configuration with a different thread name.
    #[must_use]
    pub fn named(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            ..Self::default()
        }
    }
}

/// Builder for `SchedulerConfig`.
#[derive(Debug, Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    /// Set the loop thread name.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Set the minimum interval between overrun warnings.
    #[must_use]
    pub fn overrun_warning_interval(mut self, interval: Duration) -> Self {
        self.config.overrun_warning_interval = interval;
        self
    }

    /// Set the lateness sample capacity.
    #[must_use]
    pub fn lateness_samples(mut self, samples: usize) -> Self {
        self.config.lateness_samples = samples;
        self
    }

    /// Install a fault hook.
    #[must_use]
    pub fn fault_hook(mut self, hook: impl Fn(&CallbackFault) + Send + Sync + 'static) -> Self {
        self.config.fault_hook = Some(Arc::new(hook));
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> SchedulerResult<SchedulerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
