//! Panicking accessors for test code, plus real-time polling.
//!
//! `#[track_caller]` reports the failing test line instead of this module.

use std::fmt::Debug;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Take the `Ok` value of a scheduler call, or fail with the error it returned.
///
/// ```rust
/// use tickwork_test_helpers::must;
///
/// let id: Result<u64, String> = Ok(7);
/// assert_eq!(must(id), 7);
/// ```
///
/// # Panics
///
/// When `result` is `Err`.
#[track_caller]
pub fn must<T, E: Debug>(result: Result<T, E>) -> T {
    result.unwrap_or_else(|err| panic!("call failed: {err:?}"))
}

/// Take a value the test requires to exist, such as a recorded fire.
///
/// # Panics
///
/// When `option` is `None`; `what` names the missing value.
#[track_caller]
pub fn must_some<T>(option: Option<T>, what: &str) -> T {
    option.unwrap_or_else(|| panic!("missing: {what}"))
}

/// Poll `condition` until it holds or `timeout` of wall-clock time passes.
/// Returns whether it held.
///
/// Only for system-timebase tests; simulated tests step time instead.
///
/// ```rust
/// use std::time::Duration;
/// use tickwork_test_helpers::wait_until;
///
/// assert!(wait_until(Duration::from_millis(10), || true));
/// ```
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let give_up = Instant::now() + timeout;
    while !condition() {
        if Instant::now() >= give_up {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_must_passes_value_through() {
        let scheduled: Result<&str, ()> = Ok("loop");
        assert_eq!(must(scheduled), "loop");
    }

    #[test]
    #[should_panic(expected = "call failed: \"closed\"")]
    fn test_must_reports_error() {
        must(Err::<(), _>("closed"));
    }

    #[test]
    #[should_panic(expected = "missing: first fire")]
    fn test_must_some_names_missing_value() {
        must_some(Vec::<u64>::new().first(), "first fire");
    }

    #[test]
    fn test_wait_until_checks_repeatedly() {
        let polls = Cell::new(0);
        assert!(wait_until(Duration::from_secs(1), || {
            polls.set(polls.get() + 1);
            polls.get() == 3
        }));
        assert_eq!(polls.get(), 3);
    }

    #[test]
    fn test_wait_until_times_out() {
        assert!(!wait_until(Duration::from_millis(5), || false));
    }
}
