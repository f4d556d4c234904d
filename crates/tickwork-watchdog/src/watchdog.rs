//! The `Watchdog` facade.

use crate::error::WatchdogResult;
use crate::registry::WatchdogRegistry;
use crate::tracer::EpochTracer;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tickwork_scheduler::drift::duration_to_us;
use tickwork_scheduler::{Callback, EntryId, PrintThrottle, TimerEntry};
use tracing::{debug, warn};

#[derive(Debug)]
struct WatchdogState {
    start_us: u64,
    timeout_us: u64,
    expired: bool,
    suppress_timeout_message: bool,
    timeout_throttle: PrintThrottle,
    tracer: EpochTracer,
}

/// Deadman's switch that runs a callback when it is not fed in time.
///
/// A watchdog starts disabled. [`Watchdog::enable`] (or its aliases
/// [`Watchdog::reset`] and [`Watchdog::feed`]) arms it for `now + timeout`; every
/// later call pushes the deadline out again. If the deadline passes, the
/// registry thread logs a rate-limited warning, marks the watchdog expired and
/// runs the callback once. It is not re-armed until enabled again.
pub struct Watchdog {
    registry: Arc<WatchdogRegistry>,
    id: EntryId,
    state: Arc<Mutex<WatchdogState>>,
    callback: Callback,
}

impl Watchdog {
    /// Create a disabled watchdog on `registry`.
    pub fn new<F>(registry: &Arc<WatchdogRegistry>, timeout: Duration, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let config = registry.config();
        let state = WatchdogState {
            start_us: registry.now_us(),
            timeout_us: duration_to_us(timeout),
            expired: false,
            suppress_timeout_message: false,
            timeout_throttle: PrintThrottle::new(config.timeout_print_period),
            tracer: EpochTracer::new(config.epoch_print_period),
        };
        Self {
            id: registry.scheduler().allocate_id(),
            registry: Arc::clone(registry),
            state: Arc::new(Mutex::new(state)),
            callback: Arc::new(callback),
        }
    }

    /// Time since the watchdog was last enabled.
    #[must_use]
    pub fn time_elapsed(&self) -> Duration {
        let start_us = self.state.lock().start_us;
        Duration::from_micros(self.registry.now_us().saturating_sub(start_us))
    }

    /// Change the timeout. This restarts and enables the watchdog.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry has been closed.
    pub fn set_timeout(&self, timeout: Duration) -> WatchdogResult<()> {
        self.state.lock().timeout_us = duration_to_us(timeout);
        self.enable()
    }

    /// Current timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_micros(self.state.lock().timeout_us)
    }

    /// Whether the watchdog fired since it was last enabled.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.state.lock().expired
    }

    /// Record the time since the previous epoch under `name`.
    pub fn add_epoch(&self, name: &str) {
        let now_us = self.registry.now_us();
        self.state.lock().tracer.add_epoch(name, now_us);
    }

    /// Log the recorded epochs, at most once per epoch print period.
    ///
    /// Returns whether anything was logged.
    pub fn print_epochs(&self) -> bool {
        let now_us = self.registry.now_us();
        self.state.lock().tracer.print_epochs(now_us)
    }

    /// Recorded epochs in first-seen order.
    #[must_use]
    pub fn epochs(&self) -> Vec<(String, Duration)> {
        self.state.lock().tracer.epochs()
    }

    /// Silence the timeout warning. The callback still runs.
    pub fn suppress_timeout_message(&self, suppress: bool) {
        self.state.lock().suppress_timeout_message = suppress;
    }

    /// Arm the watchdog for one timeout from now and clear its epochs.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry has been closed.
    pub fn enable(&self) -> WatchdogResult<()> {
        let now_us = self.registry.now_us();
        let deadline_us = {
            let mut state = self.state.lock();
            state.start_us = now_us;
            state.expired = false;
            state.tracer.clear_epochs(now_us);
            now_us.saturating_add(state.timeout_us)
        };
        let entry = TimerEntry::one_shot(self.id, self.entry_callback(), deadline_us).with_name("watchdog");
        self.registry.scheduler().insert(entry)?;
        Ok(())
    }

    /// Same as [`Watchdog::enable`].
    ///
    /// # Errors
    ///
    /// Returns an error if the registry has been closed.
    pub fn reset(&self) -> WatchdogResult<()> {
        self.enable()
    }

    /// Same as [`Watchdog::enable`].
    ///
    /// # Errors
    ///
    /// Returns an error if the registry has been closed.
    pub fn feed(&self) -> WatchdogResult<()> {
        self.enable()
    }

    /// Disarm the watchdog.
    ///
    /// A timeout callback already running on the registry thread is not
    /// interrupted; no later one starts.
    pub fn disable(&self) {
        if self.registry.scheduler().remove(self.id) {
            debug!(watchdog = %self.id, "Watchdog disabled");
        }
    }

    /// Whether the watchdog is armed.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.registry.scheduler().contains(self.id)
    }

    fn entry_callback(&self) -> Callback {
        let registry: Weak<WatchdogRegistry> = Arc::downgrade(&self.registry);
        let state = Arc::clone(&self.state);
        let callback = Arc::clone(&self.callback);
        let id = self.id;
        Arc::new(move || {
            let now_us = registry.upgrade().map_or(0, |registry| registry.now_us());
            let warning = {
                let mut state = state.lock();
                state.expired = true;
                let print = !state.suppress_timeout_message && state.timeout_throttle.should_print(now_us);
                print.then_some(state.timeout_us)
            };
            if let Some(timeout_us) = warning {
                let secs = Duration::from_micros(timeout_us).as_secs_f64();
                warn!(watchdog = %id, "Watchdog not fed within {secs:.6}s");
            }
            callback();
        })
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("id", &self.id)
            .field("timeout", &self.timeout())
            .field("expired", &self.is_expired())
            .finish_non_exhaustive()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchdogConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tickwork_alarm::SimTimebase;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn counting(registry: &Arc<WatchdogRegistry>, timeout: Duration) -> (Watchdog, Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        let inner = Arc::clone(&count);
        let watchdog = Watchdog::new(registry, timeout, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (watchdog, count)
    }

    #[test]
    fn test_starts_disabled() -> TestResult {
        let timebase = SimTimebase::new();
        let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
        let (watchdog, count) = counting(&registry, Duration::from_millis(10));

        assert!(!watchdog.is_enabled());
        timebase.step(Duration::from_millis(50))?;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!watchdog.is_expired());
        Ok(())
    }

    #[test]
    fn test_time_elapsed_since_enable() -> TestResult {
        let timebase = SimTimebase::new();
        let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
        let (watchdog, _) = counting(&registry, Duration::from_secs(1));

        timebase.step(Duration::from_millis(40))?;
        watchdog.enable()?;
        timebase.step(Duration::from_millis(30))?;
        assert_eq!(watchdog.time_elapsed(), Duration::from_millis(30));
        Ok(())
    }

    #[test]
    fn test_suppressed_message_still_runs_callback() -> TestResult {
        let timebase = SimTimebase::new();
        let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
        let (watchdog, count) = counting(&registry, Duration::from_millis(5));

        watchdog.suppress_timeout_message(true);
        watchdog.enable()?;
        timebase.step(Duration::from_millis(5))?;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(watchdog.is_expired());
        Ok(())
    }

    #[test]
    fn test_drop_disarms() -> TestResult {
        let timebase = SimTimebase::new();
        let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
        let (watchdog, count) = counting(&registry, Duration::from_millis(5));

        watchdog.enable()?;
        assert_eq!(registry.armed_count(), 1);
        drop(watchdog);
        assert_eq!(registry.armed_count(), 0);
        timebase.step(Duration::from_millis(10))?;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[test]
    fn test_enable_after_close() -> TestResult {
        let timebase = SimTimebase::new();
        let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
        let (watchdog, _) = counting(&registry, Duration::from_millis(5));

        registry.close();
        let err = watchdog.enable().err();
        assert!(err.is_some_and(|err| err.is_closed()));
        watchdog.disable();
        Ok(())
    }
}
