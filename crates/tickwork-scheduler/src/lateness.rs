//! Dispatch lateness tracking.
//!
//! Lateness is the distance between an entry's expiration time and the wake time
//! of the dispatch that ran it. Samples go into a bounded ring buffer so the
//! percentile queries cost nothing on the loop thread.

use serde::{Deserialize, Serialize};

/// Lateness statistics collected by the scheduler loop.
///
/// - `record` is O(1) amortized and does not allocate once the ring is full
/// - percentiles use quickselect over a reused scratch buffer
#[derive(Debug, Clone)]
pub struct LatenessMetrics {
    /// Number of dispatched entries.
    pub total_dispatches: u64,

    /// Dispatches that were late by at least one full period.
    pub overruns: u64,

    /// Largest lateness observed, in microseconds.
    pub max_lateness_us: u64,

    /// Most recent lateness sample.
    pub last_lateness_us: u64,

    lateness_sum_us: u128,
    samples: Vec<u64>,
    max_samples: usize,
    next_sample_index: usize,
    scratch: Vec<u64>,
}

impl Default for LatenessMetrics {
    fn default() -> Self {
        Self::with_capacity(crate::DEFAULT_LATENESS_SAMPLES)
    }
}

impl LatenessMetrics {
    /// Create a collector with the default sample capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collector that keeps the latest `max_samples` samples.
    #[must_use]
    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            total_dispatches: 0,
            overruns: 0,
            max_lateness_us: 0,
            last_lateness_us: 0,
            lateness_sum_us: 0,
            samples: Vec::with_capacity(max_samples),
            max_samples,
            next_sample_index: 0,
            scratch: Vec::with_capacity(max_samples),
        }
    }

    /// Record one dispatch.
    pub fn record(&mut self, lateness_us: u64, overrun: bool) {
        self.total_dispatches = self.total_dispatches.saturating_add(1);
        if overrun {
            self.overruns = self.overruns.saturating_add(1);
        }
        self.max_lateness_us = self.max_lateness_us.max(lateness_us);
        self.last_lateness_us = lateness_us;
        self.lateness_sum_us = self.lateness_sum_us.saturating_add(u128::from(lateness_us));

        if self.max_samples == 0 {
            return;
        }

        if self.samples.len() < self.max_samples {
            self.samples.push(lateness_us);
        } else {
            if let Some(slot) = self.samples.get_mut(self.next_sample_index) {
                *slot = lateness_us;
            }
            self.next_sample_index = (self.next_sample_index + 1) % self.max_samples;
        }
    }

    /// Lateness at `percentile` (0.0 to 1.0) over the retained samples, or 0
    /// without samples.
    pub fn percentile_us(&mut self, percentile: f64) -> u64 {
        if self.samples.is_empty() {
            return 0;
        }

        let percentile = percentile.clamp(0.0, 1.0);
        self.scratch.clear();
        self.scratch.extend_from_slice(&self.samples);

        let len = self.scratch.len();
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "sample counts are far below 2^52 and the product is clamped to len"
        )]
        let index = ((len as f64 * percentile) as usize).min(len.saturating_sub(1));
        let (_, value, _) = self.scratch.select_nth_unstable(index);
        *value
    }

    /// Median lateness.
    pub fn p50_us(&mut self) -> u64 {
        self.percentile_us(0.50)
    }

    /// 99th percentile lateness.
    pub fn p99_us(&mut self) -> u64 {
        self.percentile_us(0.99)
    }

    /// Mean lateness across every recorded dispatch.
    #[must_use]
    pub fn mean_us(&self) -> u64 {
        if self.total_dispatches == 0 {
            return 0;
        }
        let mean = self.lateness_sum_us / u128::from(self.total_dispatches);
        u64::try_from(mean).unwrap_or(u64::MAX)
    }

    /// Number of retained samples.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Point-in-time summary.
    pub fn snapshot(&mut self) -> LatenessSnapshot {
        LatenessSnapshot {
            total_dispatches: self.total_dispatches,
            overruns: self.overruns,
            max_us: self.max_lateness_us,
            mean_us: self.mean_us(),
            p50_us: self.p50_us(),
            p99_us: self.p99_us(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&mut self) {
        self.total_dispatches = 0;
        self.overruns = 0;
        self.max_lateness_us = 0;
        self.last_lateness_us = 0;
        self.lateness_sum_us = 0;
        self.samples.clear();
        self.next_sample_index = 0;
        self.scratch.clear();
    }
}

/// Summary of [`LatenessMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatenessSnapshot {
    /// Number of dispatched entries.
    pub total_dispatches: u64,
    /// Dispatches late by at least one period.
    pub overruns: u64,
    /// Largest lateness.
    pub max_us: u64,
    /// Mean lateness.
    pub mean_us: u64,
    /// Median lateness over retained samples.
    pub p50_us: u64,
    /// 99th percentile lateness over retained samples.
    pub p99_us: u64,
}
