//! Clock and alarm traits shared by every timebase.

use std::fmt::Debug;
use std::sync::Arc;

/// Monotonic microsecond clock.
///
/// The value must never jump backwards or be adjusted to wall-clock time; drift
/// correction in the scheduler depends on it.
pub trait Clock: Send + Sync + Debug {
    /// Current time in microseconds since the timebase epoch.
    fn now_us(&self) -> u64;
}

/// Outcome of a blocking [`Alarm::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmWake {
    /// The armed deadline was reached at `now_us`.
    Fired {
        /// Clock reading at the moment the waiter was released.
        now_us: u64,
    },
    /// The alarm was stopped; no further fires will be delivered.
    Stopped,
}

impl AlarmWake {
    /// Fire timestamp, or `None` for the stop sentinel.
    #[inline]
    #[must_use]
    pub fn fired_at(self) -> Option<u64> {
        match self {
            AlarmWake::Fired { now_us } => Some(now_us),
            AlarmWake::Stopped => None,
        }
    }
}

/// Absolute-deadline alarm that one thread blocks on.
///
/// # Thread Safety
///
/// `arm`, `cancel` and `stop` may be called from any thread while another thread is
/// blocked in `wait`. Re-arming is idempotent: only the latest deadline counts.
pub trait Alarm: Clock {
    /// Arm the alarm to fire at `deadline_us`. A deadline in the past fires on the
    /// next `wait` without blocking.
    fn arm(&self, deadline_us: u64);

    /// Disarm without waking the waiter. A subsequent `wait` blocks until re-armed or
    /// stopped.
    fn cancel(&self);

    /// Force-wake the waiter. Every current and future `wait` returns
    /// [`AlarmWake::Stopped`].
    fn stop(&self);

    /// Block until the armed deadline is reached or the alarm is stopped.
    fn wait(&self) -> AlarmWake;

    /// Whether `stop` has been called.
    fn is_stopped(&self) -> bool;

    /// Currently armed deadline, if any.
    fn deadline_us(&self) -> Option<u64>;

    /// Diagnostic name given at creation.
    fn name(&self) -> &str;
}

/// Source of alarms that share one clock.
pub trait Timebase: Clock {
    /// Create a new, disarmed alarm on this timebase.
    fn new_alarm(&self, name: &str) -> Arc<dyn Alarm>;

    /// Whether this timebase runs on simulated time.
    fn is_simulated(&self) -> bool {
        false
    }
}
