//! Rate limiting for repeated diagnostics.

use std::time::Duration;

/// Allows a message at most once per interval of clock time.
///
/// The first call always passes. Time is supplied by the caller so the throttle
/// follows simulated clocks too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintThrottle {
    interval_us: u64,
    last_us: Option<u64>,
}

impl PrintThrottle {
    /// Create a throttle with the given minimum interval between messages.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_us: crate::drift::duration_to_us(interval),
            last_us: None,
        }
    }

    /// Whether a message may be emitted at `now_us`; records the emission if so.
    pub fn should_print(&mut self, now_us: u64) -> bool {
        let allowed = match self.last_us {
            None => true,
            Some(last) => now_us.saturating_sub(last) >= self.interval_us,
        };
        if allowed {
            self.last_us = Some(now_us);
        }
        allowed
    }

    /// Forget the last emission so the next message passes.
    pub fn reset(&mut self) {
        self.last_us = None;
    }

    /// Configured interval in microseconds.
    #[must_use]
    pub fn interval_us(&self) -> u64 {
        self.interval_us
    }
}

impl Default for PrintThrottle {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
