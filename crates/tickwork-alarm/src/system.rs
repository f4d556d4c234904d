//! System timebase backed by the monotonic `Instant` clock.

use crate::clock::{Alarm, AlarmWake, Clock, Timebase};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic timebase whose epoch is the moment of construction.
///
/// # Example
///
/// ```rust
/// use tickwork_alarm::prelude::*;
///
/// let timebase = SystemTimebase::new();
/// let alarm = timebase.new_alarm("tick");
/// alarm.arm(timebase.now_us() + 500);
/// assert!(alarm.wait().fired_at().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct SystemTimebase {
    epoch: Instant,
    spin_tail: Duration,
}

impl SystemTimebase {
    /// Create a timebase with the default busy-spin tail.
    #[must_use]
    pub fn new() -> Self {
        Self::with_spin_tail(Duration::from_micros(crate::DEFAULT_SPIN_TAIL_US))
    }

    /// Create a timebase that busy-spins for the final `spin_tail` of every wait.
    ///
    /// `Duration::ZERO` disables spinning entirely.
    #[must_use]
    pub fn with_spin_tail(spin_tail: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            spin_tail,
        }
    }

    /// Busy-spin tail applied before each deadline.
    #[inline]
    #[must_use]
    pub fn spin_tail(&self) -> Duration {
        self.spin_tail
    }
}

impl Default for SystemTimebase {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemTimebase {
    fn now_us(&self) -> u64 {
        micros_since(self.epoch)
    }
}

impl Timebase for SystemTimebase {
    fn new_alarm(&self, name: &str) -> Arc<dyn Alarm> {
        Arc::new(SystemAlarm::new(name, self.epoch, self.spin_tail))
    }
}

fn micros_since(epoch: Instant) -> u64 {
    u64::try_from(epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
}

#[derive(Debug, Default)]
struct AlarmState {
    deadline_us: Option<u64>,
    stopped: bool,
}

/// Condvar-based alarm on a [`SystemTimebase`].
///
/// The waiter sleeps with `Condvar::wait_until` until `spin_tail` before the
/// deadline, then releases the lock and busy-spins for the remainder.
#[derive(Debug)]
pub struct SystemAlarm {
    name: String,
    epoch: Instant,
    spin_tail: Duration,
    state: Mutex<AlarmState>,
    wakeup: Condvar,
}

impl SystemAlarm {
    fn new(name: &str, epoch: Instant, spin_tail: Duration) -> Self {
        Self {
            name: name.to_string(),
            epoch,
            spin_tail,
            state: Mutex::new(AlarmState::default()),
            wakeup: Condvar::new(),
        }
    }

    fn instant_of(&self, deadline_us: u64) -> Option<Instant> {
        self.epoch.checked_add(Duration::from_micros(deadline_us))
    }

    fn spin_until(&self, guard: &mut MutexGuard<'_, AlarmState>, target: Instant) {
        MutexGuard::unlocked(guard, || {
            while Instant::now() < target {
                std::hint::spin_loop();
            }
        });
    }
}

impl Clock for SystemAlarm {
    fn now_us(&self) -> u64 {
        micros_since(self.epoch)
    }
}

impl Alarm for SystemAlarm {
    fn arm(&self, deadline_us: u64) {
        let mut state = self.state.lock();
        if state.stopped {
            return;
        }
        state.deadline_us = Some(deadline_us);
        self.wakeup.notify_all();
    }

    fn cancel(&self) {
        let mut state = self.state.lock();
        state.deadline_us = None;
        self.wakeup.notify_all();
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        state.stopped = true;
        state.deadline_us = None;
        self.wakeup.notify_all();
    }

    fn wait(&self) -> AlarmWake {
        let mut state = self.state.lock();
        loop {
            if state.stopped {
                return AlarmWake::Stopped;
            }

            let Some(deadline_us) = state.deadline_us else {
                self.wakeup.wait(&mut state);
                continue;
            };

            let now_us = self.now_us();
            if now_us >= deadline_us {
                state.deadline_us = None;
                return AlarmWake::Fired { now_us };
            }

            let Some(target) = self.instant_of(deadline_us) else {
                // Unrepresentable deadline: only a re-arm or stop can release us.
                self.wakeup.wait(&mut state);
                continue;
            };
            let sleep_until = target.checked_sub(self.spin_tail).unwrap_or(target);
            if Instant::now() < sleep_until {
                // Re-evaluate after any wake: the deadline may have been moved.
                let _timeout = self.wakeup.wait_until(&mut state, sleep_until);
            } else {
                self.spin_until(&mut state, target);
            }
        }
    }

    fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    fn deadline_us(&self) -> Option<u64> {
        self.state.lock().deadline_us
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_past_deadline_fires_immediately() {
        let timebase = SystemTimebase::new();
        let alarm = timebase.new_alarm("past");
        alarm.arm(0);
        let wake = alarm.wait();
        assert!(wake.fired_at().is_some());
        assert_eq!(alarm.deadline_us(), None);
    }

    #[test]
    fn test_fire_not_before_deadline() {
        let timebase = SystemTimebase::with_spin_tail(Duration::ZERO);
        let alarm = timebase.new_alarm("deadline");
        let deadline = timebase.now_us() + 2_000;
        alarm.arm(deadline);
        match alarm.wait() {
            AlarmWake::Fired { now_us } => assert!(now_us >= deadline),
            AlarmWake::Stopped => panic!("alarm should fire"),
        }
    }

    #[test]
    fn test_stop_wakes_blocked_waiter() {
        let timebase = SystemTimebase::new();
        let alarm = timebase.new_alarm("stop");
        let waiter = {
            let alarm = Arc::clone(&alarm);
            thread::spawn(move || alarm.wait())
        };

        thread::sleep(Duration::from_millis(5));
        alarm.stop();

        let wake = waiter.join().map_err(|_| "waiter panicked");
        assert_eq!(wake, Ok(AlarmWake::Stopped));
        assert!(alarm.is_stopped());
        assert_eq!(alarm.wait(), AlarmWake::Stopped);
    }

    #[test]
    fn test_rearm_sooner_wakes_waiter() {
        let timebase = SystemTimebase::new();
        let alarm = timebase.new_alarm("rearm");
        alarm.arm(timebase.now_us() + 60_000_000);

        let waiter = {
            let alarm = Arc::clone(&alarm);
            thread::spawn(move || alarm.wait())
        };

        thread::sleep(Duration::from_millis(5));
        alarm.arm(timebase.now_us() + 1_000);

        let wake = waiter.join().map_err(|_| "waiter panicked");
        assert!(matches!(wake, Ok(AlarmWake::Fired { .. })));
    }

    #[test]
    fn test_arm_after_stop_is_ignored() {
        let timebase = SystemTimebase::new();
        let alarm = timebase.new_alarm("ignored");
        alarm.stop();
        alarm.arm(10);
        assert_eq!(alarm.deadline_us(), None);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let timebase = SystemTimebase::new();
        let a = timebase.now_us();
        let b = timebase.now_us();
        assert!(b >= a);
    }
}
