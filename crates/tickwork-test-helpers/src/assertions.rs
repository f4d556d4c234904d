//! Assertion macros for fire-time sequences.

/// Assert that fire times are strictly increasing.
///
/// ```rust
/// use tickwork_test_helpers::assert_monotonic;
///
/// assert_monotonic!(&[10, 20, 30]);
/// ```
#[macro_export]
macro_rules! assert_monotonic {
    ($times:expr $(,)?) => {
        let times = $times;
        for (at, pair) in times.windows(2).enumerate() {
            if let [earlier, later] = pair
                && earlier >= later
            {
                panic!(
                    "fire times not strictly increasing: [{}] = {:?}, [{}] = {:?}",
                    at,
                    earlier,
                    at + 1,
                    later
                );
            }
        }
    };
}

/// Assert that fire times lie on the grid `first + k * period` with no gaps.
///
/// # Example
///
/// ```rust
/// use tickwork_test_helpers::assert_period_grid;
///
/// assert_period_grid!(&[20_000u64, 40_000, 60_000], 20_000, 20_000);
/// ```
#[macro_export]
macro_rules! assert_period_grid {
    ($times:expr, $first:expr, $period:expr $(,)?) => {
        let times = $times;
        let first: u64 = $first;
        let period: u64 = $period;
        for (k, actual) in times.iter().enumerate() {
            let expected = first + period * (k as u64);
            if *actual != expected {
                panic!(
                    "assertion failed: fire {} off the period grid\n  expected: {}us\n    actual: {}us\n  all fires: {:?}",
                    k, expected, actual, times
                );
            }
        }
    };
}

/// Assert that every gap between consecutive fires is at least `min_gap`.
///
/// # Example
///
/// ```rust
/// use tickwork_test_helpers::assert_min_gap;
///
/// assert_min_gap!(&[0u64, 10, 25], 10);
/// ```
#[macro_export]
macro_rules! assert_min_gap {
    ($times:expr, $min_gap:expr $(,)?) => {
        let times = $times;
        let min_gap: u64 = $min_gap;
        for pair in times.windows(2) {
            if let [prev, next] = pair {
                let gap = next.saturating_sub(*prev);
                if gap < min_gap {
                    panic!(
                        "assertion failed: fires {}us and {}us are {}us apart (minimum {}us)",
                        prev, next, gap, min_gap
                    );
                }
            }
        }
    };
}
