//! Error types for the alarm crate.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by timebase operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlarmError {
    /// Simulated alarms did not settle within the real-time bound.
    #[error("Alarms did not become idle within {waited:?} (busy: {busy})")]
    QuiescenceTimeout {
        /// Real time spent waiting.
        waited: Duration,
        /// Names of the alarms still busy.
        busy: String,
    },

    /// A simulated step would overflow the clock.
    #[error("Simulated clock overflow stepping {delta_us}us from {now_us}us")]
    ClockOverflow {
        /// Clock reading before the step.
        now_us: u64,
        /// Requested step.
        delta_us: u64,
    },
}

impl AlarmError {
    /// Create a quiescence timeout error.
    #[must_use]
    pub fn quiescence_timeout(waited: Duration, busy: impl Into<String>) -> Self {
        Self::QuiescenceTimeout {
            waited,
            busy: busy.into(),
        }
    }
}

/// A specialized `Result` type for alarm operations.
pub type AlarmResult<T = ()> = Result<T, AlarmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AlarmError::quiescence_timeout(Duration::from_millis(5), "notifier");
        assert!(err.to_string().contains("notifier"));

        let err = AlarmError::ClockOverflow {
            now_us: u64::MAX,
            delta_us: 1,
        };
        assert!(err.to_string().contains("overflow"));
    }
}
