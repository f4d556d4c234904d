//! Epoch tracing for attributing time inside a monitored section.

use std::fmt::Write as _;
use std::time::Duration;
use tickwork_scheduler::PrintThrottle;
use tracing::info;

/// Records how long each named step of a section took.
///
/// Each [`EpochTracer::add_epoch`] stores the time since the previous epoch (or
/// since the last reset) under the given name. Re-adding a name overwrites its
/// time but keeps its original position.
#[derive(Debug, Clone)]
pub struct EpochTracer {
    start_us: u64,
    epochs: Vec<(String, u64)>,
    throttle: PrintThrottle,
}

impl EpochTracer {
    /// Create a tracer whose dumps are limited to one per `print_period`.
    #[must_use]
    pub fn new(print_period: Duration) -> Self {
        Self {
            start_us: 0,
            epochs: Vec::new(),
            throttle: PrintThrottle::new(print_period),
        }
    }

    /// Restart the epoch timer at `now_us` without dropping recorded epochs.
    pub fn reset_timer(&mut self, now_us: u64) {
        self.start_us = now_us;
    }

    /// Drop recorded epochs and restart the timer at `now_us`.
    pub fn clear_epochs(&mut self, now_us: u64) {
        self.epochs.clear();
        self.start_us = now_us;
    }

    /// Record `name` as the time elapsed since the previous epoch.
    pub fn add_epoch(&mut self, name: &str, now_us: u64) {
        let elapsed = now_us.saturating_sub(self.start_us);
        match self.epochs.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = elapsed,
            None => self.epochs.push((name.to_string(), elapsed)),
        }
        self.start_us = now_us;
    }

    /// Recorded epochs in first-seen order.
    #[must_use]
    pub fn epochs(&self) -> Vec<(String, Duration)> {
        self.epochs
            .iter()
            .map(|(name, us)| (name.clone(), Duration::from_micros(*us)))
            .collect()
    }

    /// Render the epochs as one `name: seconds` line each.
    #[must_use]
    pub fn format_epochs(&self) -> String {
        let mut out = String::new();
        for (name, us) in &self.epochs {
            let secs = Duration::from_micros(*us).as_secs_f64();
            // Writing into a String cannot fail.
            let _written = writeln!(out, "\t{name}: {secs:.6}s");
        }
        out
    }

    /// Log the epochs at `info` unless a dump happened within the print period.
    ///
    /// Returns whether the epochs were logged.
    pub fn print_epochs(&mut self, now_us: u64) -> bool {
        if self.epochs.is_empty() || !self.throttle.should_print(now_us) {
            return false;
        }
        info!(epochs = %self.format_epochs(), "Epoch timings");
        true
    }
}

impl Default for EpochTracer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
