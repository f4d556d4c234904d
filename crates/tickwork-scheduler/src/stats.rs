//! Dispatch counters.

use serde::{Deserialize, Serialize};

/// Counters maintained by the scheduler loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    /// Alarm fires handled by the loop.
    pub wakeups: u64,
    /// Fires that found no due entry (a removal or re-arm raced the alarm).
    pub empty_wakeups: u64,
    /// Callbacks invoked.
    pub dispatched: u64,
    /// Dispatches late by at least one full period.
    pub overruns: u64,
    /// Periods skipped by drift correction.
    pub skipped_periods: u64,
    /// Callbacks that panicked.
    pub faults: u64,
}

impl DispatchStats {
    pub(crate) fn record_wakeup(&mut self, due: usize) {
        self.wakeups = self.wakeups.saturating_add(1);
        if due == 0 {
            self.empty_wakeups = self.empty_wakeups.saturating_add(1);
        }
    }

    pub(crate) fn record_overrun(&mut self, skipped: u64) {
        self.overruns = self.overruns.saturating_add(1);
        self.skipped_periods = self.skipped_periods.saturating_add(skipped);
    }
}
