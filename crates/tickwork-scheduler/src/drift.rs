//! Drift-free expiration arithmetic.
//!
//! A periodic entry stays phase-locked to its original `(expiration, period)`
//! pair: rescheduling always lands on `expiration + k * period` for some integer
//! `k`, never on `now + period`. All functions saturate at `u64::MAX` instead of
//! overflowing.

/// Next expiration of a periodic entry that fired for `expiration_us` at `now_us`.
///
/// The result is strictly later than `now_us` (unless it saturates) and lies on the
/// entry's original phase grid. An entry that is on time advances by exactly one
/// period; an entry late by `m * period + d` (`m >= 1`, `d < period`) skips `m`
/// periods.
///
/// A zero period returns `expiration_us` unchanged.
///
/// # Example
///
/// ```rust
/// use tickwork_scheduler::drift::next_expiration;
///
/// assert_eq!(next_expiration(20_000, 20_000, 20_000), 40_000);
/// assert_eq!(next_expiration(20_000, 20_000, 85_000), 100_000);
/// ```
#[inline]
#[must_use]
pub fn next_expiration(expiration_us: u64, period_us: u64, now_us: u64) -> u64 {
    if period_us == 0 {
        return expiration_us;
    }
    let behind = skipped_periods(expiration_us, period_us, now_us);
    expiration_us.saturating_add(period_us.saturating_mul(behind.saturating_add(1)))
}

/// Number of whole periods an entry missed when dispatched at `now_us`.
///
/// Non-zero exactly when `now_us - expiration_us >= period_us`, which counts as an
/// overrun.
#[inline]
#[must_use]
pub fn skipped_periods(expiration_us: u64, period_us: u64, now_us: u64) -> u64 {
    now_us
        .saturating_sub(expiration_us)
        .checked_div(period_us)
        .unwrap_or(0)
}

/// First expiration of a periodic callback phase-locked to `start_us`.
///
/// Callbacks added later than `start_us` still line up with the grid
/// `start_us + offset_us + k * period_us`; the result is the first grid point
/// after the period in progress at `now_us`.
///
/// # Example
///
/// ```rust
/// use tickwork_scheduler::drift::phase_locked_start;
///
/// // Added at t=0 with a quarter-period offset.
/// assert_eq!(phase_locked_start(0, 0, 10_000, 2_500), 12_500);
/// // Added half-way through the third period.
/// assert_eq!(phase_locked_start(0, 25_000, 10_000, 0), 30_000);
/// ```
#[inline]
#[must_use]
pub fn phase_locked_start(start_us: u64, now_us: u64, period_us: u64, offset_us: u64) -> u64 {
    let elapsed_periods = now_us
        .saturating_sub(start_us)
        .checked_div(period_us)
        .unwrap_or(0);
    start_us
        .saturating_add(offset_us)
        .saturating_add(period_us)
        .saturating_add(elapsed_periods.saturating_mul(period_us))
}

/// Convert a duration to whole microseconds, saturating at `u64::MAX`.
#[inline]
#[must_use]
pub fn duration_to_us(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
