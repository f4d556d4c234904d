//! Simulated timebase for deterministic scheduling tests.
//!
//! Simulated time never moves on its own. A test calls [`SimTimebase::step`] to
//! advance it; the step walks through every intermediate alarm deadline and, after
//! each advance, waits until all alarms are idle again. An alarm is idle when no
//! armed deadline of it is due and its waiter is not between a fire and the next
//! `wait()` call, which is exactly the window in which a scheduler loop is
//! dispatching callbacks.

use crate::clock::{Alarm, AlarmWake, Clock, Timebase};
use crate::error::{AlarmError, AlarmResult};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct SimAlarmState {
    name: String,
    deadline_us: Option<u64>,
    stopped: bool,
    dispatching: bool,
}

impl SimAlarmState {
    fn is_busy(&self, now_us: u64) -> bool {
        if self.stopped {
            return false;
        }
        self.dispatching || self.deadline_us.is_some_and(|deadline| deadline <= now_us)
    }
}

#[derive(Debug, Default)]
struct SimState {
    now_us: u64,
    next_alarm_id: u64,
    alarms: BTreeMap<u64, SimAlarmState>,
}

impl SimState {
    fn is_quiescent(&self) -> bool {
        !self.alarms.values().any(|alarm| alarm.is_busy(self.now_us))
    }

    fn busy_names(&self) -> String {
        self.alarms
            .values()
            .filter(|alarm| alarm.is_busy(self.now_us))
            .map(|alarm| alarm.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn next_deadline_after_now(&self) -> Option<u64> {
        self.alarms
            .values()
            .filter(|alarm| !alarm.stopped)
            .filter_map(|alarm| alarm.deadline_us)
            .filter(|&deadline| deadline > self.now_us)
            .min()
    }
}

#[derive(Debug)]
struct SimInner {
    state: Mutex<SimState>,
    changed: Condvar,
    quiescence_timeout: Duration,
}

/// Manually stepped clock and alarm source.
///
/// Cloning shares the same simulated clock.
///
/// # Example
///
/// ```rust
/// use tickwork_alarm::prelude::*;
///
/// let timebase = SimTimebase::new();
/// assert_eq!(timebase.now_us(), 0);
/// timebase.step_us(20_000).expect("no alarms to wait for");
/// assert_eq!(timebase.now_us(), 20_000);
/// ```
#[derive(Debug, Clone)]
pub struct SimTimebase {
    inner: Arc<SimInner>,
}

impl SimTimebase {
    /// Create a simulated timebase starting at t=0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_quiescence_timeout(Duration::from_millis(crate::DEFAULT_QUIESCENCE_TIMEOUT_MS))
    }

    /// Create a simulated timebase whose quiescence waits give up after `timeout`
    /// of real time.
    #[must_use]
    pub fn with_quiescence_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(SimInner {
                state: Mutex::new(SimState::default()),
                changed: Condvar::new(),
                quiescence_timeout: timeout,
            }),
        }
    }

    /// Advance simulated time by `delta`, firing every alarm whose deadline falls
    /// inside the step in deadline order.
    ///
    /// # Errors
    ///
    /// Returns [`AlarmError::QuiescenceTimeout`] if the woken alarm owners do not
    /// return to `wait()` within the configured real-time bound, or
    /// [`AlarmError::ClockOverflow`] if the step would overflow the clock.
    pub fn step(&self, delta: Duration) -> AlarmResult {
        self.step_us(u64::try_from(delta.as_micros()).unwrap_or(u64::MAX))
    }

    /// Microsecond variant of [`SimTimebase::step`].
    ///
    /// # Errors
    ///
    /// See [`SimTimebase::step`].
    pub fn step_us(&self, delta_us: u64) -> AlarmResult {
        let target_us = {
            let state = self.inner.state.lock();
            state
                .now_us
                .checked_add(delta_us)
                .ok_or(AlarmError::ClockOverflow {
                    now_us: state.now_us,
                    delta_us,
                })?
        };

        self.wait_for_alarms()?;

        loop {
            let reached = {
                let mut state = self.inner.state.lock();
                let next_us = state
                    .next_deadline_after_now()
                    .map_or(target_us, |deadline| deadline.min(target_us));
                state.now_us = state.now_us.max(next_us);
                self.inner.changed.notify_all();
                state.now_us >= target_us
            };

            self.wait_for_alarms()?;

            if reached {
                return Ok(());
            }
        }
    }

    /// Advance simulated time without waiting for alarm owners.
    ///
    /// This models a callback that consumes time: it may be called from inside a
    /// dispatched callback, where [`SimTimebase::step`] would wait on itself.
    pub fn advance_us(&self, delta_us: u64) {
        let mut state = self.inner.state.lock();
        state.now_us = state.now_us.saturating_add(delta_us);
        self.inner.changed.notify_all();
    }

    /// Wait until every alarm on this timebase is idle.
    ///
    /// # Errors
    ///
    /// Returns [`AlarmError::QuiescenceTimeout`] if that does not happen within the
    /// configured real-time bound.
    pub fn wait_for_alarms(&self) -> AlarmResult {
        let started = Instant::now();
        let give_up = started + self.inner.quiescence_timeout;
        let mut state = self.inner.state.lock();

        while !state.is_quiescent() {
            let timed_out = self
                .inner
                .changed
                .wait_until(&mut state, give_up)
                .timed_out();
            if timed_out && !state.is_quiescent() {
                let busy = state.busy_names();
                tracing::warn!(
                    busy = busy.as_str(),
                    now_us = state.now_us,
                    "Simulated alarms did not settle"
                );
                return Err(AlarmError::quiescence_timeout(started.elapsed(), busy));
            }
        }

        Ok(())
    }

    /// Number of live alarms created from this timebase.
    #[must_use]
    pub fn alarm_count(&self) -> usize {
        self.inner.state.lock().alarms.len()
    }

    /// Earliest armed deadline across all live alarms.
    #[must_use]
    pub fn next_deadline_us(&self) -> Option<u64> {
        let state = self.inner.state.lock();
        state
            .alarms
            .values()
            .filter(|alarm| !alarm.stopped)
            .filter_map(|alarm| alarm.deadline_us)
            .min()
    }
}

impl Default for SimTimebase {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimTimebase {
    fn now_us(&self) -> u64 {
        self.inner.state.lock().now_us
    }
}

impl Timebase for SimTimebase {
    fn new_alarm(&self, name: &str) -> Arc<dyn Alarm> {
        Arc::new(SimAlarm::register(Arc::clone(&self.inner), name))
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

/// Alarm on a [`SimTimebase`].
///
/// Dropping the alarm unregisters it, so a leaked deadline cannot stall later
/// steps.
#[derive(Debug)]
pub struct SimAlarm {
    inner: Arc<SimInner>,
    id: u64,
    name: String,
}

impl SimAlarm {
    fn register(inner: Arc<SimInner>, name: &str) -> Self {
        let id = {
            let mut state = inner.state.lock();
            let id = state.next_alarm_id;
            state.next_alarm_id = state.next_alarm_id.wrapping_add(1);
            state.alarms.insert(
                id,
                SimAlarmState {
                    name: name.to_string(),
                    deadline_us: None,
                    stopped: false,
                    dispatching: false,
                },
            );
            id
        };

        Self {
            inner,
            id,
            name: name.to_string(),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SimAlarmState) -> R) -> Option<R> {
        let mut state = self.inner.state.lock();
        let result = state.alarms.get_mut(&self.id).map(f);
        self.inner.changed.notify_all();
        result
    }

    fn poll(&self, state: &mut MutexGuard<'_, SimState>) -> Option<AlarmWake> {
        let now_us = state.now_us;
        let alarm = state.alarms.get_mut(&self.id)?;

        if alarm.stopped {
            alarm.dispatching = false;
            return Some(AlarmWake::Stopped);
        }

        match alarm.deadline_us {
            Some(deadline) if deadline <= now_us => {
                alarm.deadline_us = None;
                alarm.dispatching = true;
                Some(AlarmWake::Fired { now_us })
            }
            _ => {
                alarm.dispatching = false;
                None
            }
        }
    }
}

impl Clock for SimAlarm {
    fn now_us(&self) -> u64 {
        self.inner.state.lock().now_us
    }
}

impl Alarm for SimAlarm {
    fn arm(&self, deadline_us: u64) {
        self.with_state(|alarm| {
            if !alarm.stopped {
                alarm.deadline_us = Some(deadline_us);
            }
        });
    }

    fn cancel(&self) {
        self.with_state(|alarm| alarm.deadline_us = None);
    }

    fn stop(&self) {
        self.with_state(|alarm| {
            alarm.stopped = true;
            alarm.deadline_us = None;
        });
    }

    fn wait(&self) -> AlarmWake {
        let mut state = self.inner.state.lock();
        loop {
            let wake = self.poll(&mut state);
            self.inner.changed.notify_all();
            match wake {
                Some(wake) => return wake,
                None if !state.alarms.contains_key(&self.id) => return AlarmWake::Stopped,
                None => self.inner.changed.wait(&mut state),
            }
        }
    }

    fn is_stopped(&self) -> bool {
        self.with_state(|alarm| alarm.stopped).unwrap_or(true)
    }

    fn deadline_us(&self) -> Option<u64> {
        self.with_state(|alarm| alarm.deadline_us).flatten()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SimAlarm {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        state.alarms.remove(&self.id);
        self.inner.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_step_without_alarms() -> TestResult {
        let timebase = SimTimebase::new();
        timebase.step_us(1_500)?;
        assert_eq!(timebase.now_us(), 1_500);
        timebase.step(Duration::from_millis(2))?;
        assert_eq!(timebase.now_us(), 3_500);
        Ok(())
    }

    #[test]
    fn test_due_alarm_fires_without_blocking() {
        let timebase = SimTimebase::new();
        let alarm = timebase.new_alarm("due");
        alarm.arm(0);
        assert_eq!(alarm.wait(), AlarmWake::Fired { now_us: 0 });
        assert_eq!(alarm.deadline_us(), None);
    }

    #[test]
    fn test_step_waits_for_waiter_to_return() -> TestResult {
        let timebase = SimTimebase::new();
        let alarm = timebase.new_alarm("counter");
        let fired_at = Arc::new(AtomicU64::new(0));

        alarm.arm(1_000);
        let waiter = {
            let alarm = Arc::clone(&alarm);
            let fired_at = Arc::clone(&fired_at);
            thread::spawn(move || {
                while let AlarmWake::Fired { now_us } = alarm.wait() {
                    fired_at.store(now_us, Ordering::SeqCst);
                }
            })
        };

        timebase.step_us(999)?;
        assert_eq!(fired_at.load(Ordering::SeqCst), 0);

        timebase.step_us(1)?;
        assert_eq!(fired_at.load(Ordering::SeqCst), 1_000);

        alarm.stop();
        waiter.join().map_err(|_| "waiter panicked")?;
        Ok(())
    }

    #[test]
    fn test_step_visits_intermediate_deadlines() -> TestResult {
        let timebase = SimTimebase::new();
        let alarm = timebase.new_alarm("periodic");
        let fires = Arc::new(parking_lot::Mutex::new(Vec::new()));

        alarm.arm(10);
        let waiter = {
            let alarm = Arc::clone(&alarm);
            let fires = Arc::clone(&fires);
            thread::spawn(move || {
                while let AlarmWake::Fired { now_us } = alarm.wait() {
                    fires.lock().push(now_us);
                    alarm.arm(now_us + 10);
                }
            })
        };

        timebase.step_us(35)?;
        assert_eq!(*fires.lock(), vec![10, 20, 30]);

        alarm.stop();
        waiter.join().map_err(|_| "waiter panicked")?;
        Ok(())
    }

    #[test]
    fn test_stuck_owner_times_out() {
        let timebase = SimTimebase::with_quiescence_timeout(Duration::from_millis(20));
        let alarm = timebase.new_alarm("nobody-waits");
        alarm.arm(5);

        let result = timebase.step_us(10);
        assert!(matches!(
            result,
            Err(AlarmError::QuiescenceTimeout { ref busy, .. }) if busy == "nobody-waits"
        ));
    }

    #[test]
    fn test_dropped_alarm_is_unregistered() -> TestResult {
        let timebase = SimTimebase::new();
        let alarm = timebase.new_alarm("dropped");
        alarm.arm(5);
        assert_eq!(timebase.alarm_count(), 1);
        drop(alarm);
        assert_eq!(timebase.alarm_count(), 0);
        timebase.step_us(10)?;
        Ok(())
    }

    #[test]
    fn test_advance_does_not_wait() {
        let timebase = SimTimebase::new();
        let alarm = timebase.new_alarm("advance");
        alarm.arm(5);
        timebase.advance_us(10);
        assert_eq!(timebase.now_us(), 10);
        assert_eq!(alarm.wait(), AlarmWake::Fired { now_us: 10 });
    }

    #[test]
    fn test_stop_is_sticky() {
        let timebase = SimTimebase::new();
        let alarm = timebase.new_alarm("stop");
        alarm.stop();
        alarm.arm(0);
        assert!(alarm.is_stopped());
        assert_eq!(alarm.wait(), AlarmWake::Stopped);
        assert_eq!(alarm.wait(), AlarmWake::Stopped);
    }
}
