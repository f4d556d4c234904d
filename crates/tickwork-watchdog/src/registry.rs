//! Shared scheduler loop for watchdogs.

use crate::config::WatchdogConfig;
use crate::error::WatchdogResult;
use std::sync::Arc;
use tickwork_alarm::Timebase;
use tickwork_scheduler::Scheduler;
use tracing::info;

/// One alarm and one loop thread serving every watchdog created on it.
///
/// Registries are explicit objects: create one per independent group of
/// watchdogs and hand it to [`crate::Watchdog::new`].
#[derive(Debug)]
pub struct WatchdogRegistry {
    config: WatchdogConfig,
    scheduler: Scheduler,
}

impl WatchdogRegistry {
    /// Create a registry and spawn its loop thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the thread cannot be
    /// spawned.
    pub fn new(timebase: &dyn Timebase, config: WatchdogConfig) -> WatchdogResult<Arc<Self>> {
        config.validate()?;
        let scheduler = Scheduler::new(timebase, config.scheduler_config())?;
        info!(registry = %config.thread_name, "Watchdog registry started");
        Ok(Arc::new(Self { config, scheduler }))
    }

    /// Registry configuration.
    #[must_use]
    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Current time on the registry clock.
    #[must_use]
    pub fn now_us(&self) -> u64 {
        self.scheduler.now_us()
    }

    /// Number of armed watchdogs.
    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.scheduler.len()
    }

    /// Whether [`WatchdogRegistry::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.scheduler.is_closed()
    }

    /// Disarm every watchdog and join the loop thread.
    pub fn close(&self) {
        self.scheduler.close();
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}
