//! Scheduler loop: one thread multiplexing every entry onto one alarm.

use crate::config::{FaultHook, SchedulerConfig};
use crate::drift::{duration_to_us, next_expiration, skipped_periods};
use crate::entry::{Callback, CallbackFault, EntryId, TimerEntry};
use crate::error::{SchedulerError, SchedulerResult};
use crate::lateness::{LatenessMetrics, LatenessSnapshot};
use crate::queue::DeadlineQueue;
use crate::stats::DispatchStats;
use crate::throttle::PrintThrottle;
use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tickwork_alarm::{Alarm, AlarmWake, Timebase};
use tracing::{debug, error, info, warn};

#[derive(Debug)]
struct LoopState {
    queue: DeadlineQueue,
    running: bool,
    /// Entries popped for the current tick and not yet finished.
    in_flight: HashSet<EntryId>,
    executing: Option<EntryId>,
    stats: DispatchStats,
    lateness: LatenessMetrics,
    overrun_throttle: PrintThrottle,
}

/// Entries are never dropped while `state` is locked: a callback may own a
/// facade whose `Drop` locks it again.
struct Shared {
    name: String,
    alarm: Arc<dyn Alarm>,
    state: Mutex<LoopState>,
    finished: Condvar,
    next_id: AtomicU64,
    dispatch_time_us: AtomicU64,
    fault_hook: Option<FaultHook>,
}

impl Shared {
    /// Arm the alarm to the queue minimum, or disarm when idle.
    fn rearm(&self, state: &LoopState) {
        match state.queue.next_deadline_us() {
            Some(deadline) if state.running => self.alarm.arm(deadline),
            _ => self.alarm.cancel(),
        }
    }

    fn run(&self) {
        debug!(scheduler = %self.name, "Scheduler loop started");

        while let AlarmWake::Fired { now_us } = self.alarm.wait() {
            let Some(due) = self.collect_due(now_us) else {
                break;
            };

            for entry in due {
                if !self.dispatch(entry, now_us) {
                    break;
                }
            }

            let mut state = self.state.lock();
            state.in_flight.clear();
            if !state.running {
                break;
            }
            self.rearm(&state);
        }

        debug!(scheduler = %self.name, "Scheduler loop exited");
    }

    fn collect_due(&self, now_us: u64) -> Option<Vec<TimerEntry>> {
        let mut state = self.state.lock();
        if !state.running {
            return None;
        }
        self.dispatch_time_us.store(now_us, Ordering::Release);

        let mut due = Vec::new();
        while let Some(entry) = state.queue.pop_due(now_us) {
            state.in_flight.insert(entry.id);
            due.push(entry);
        }
        state.stats.record_wakeup(due.len());
        Some(due)
    }

    /// Run one due entry. Returns `false` once the scheduler has been closed.
    fn dispatch(&self, mut entry: TimerEntry, now_us: u64) -> bool {
        let lateness_us = now_us.saturating_sub(entry.expiration_us);
        let skipped = skipped_periods(entry.expiration_us, entry.period_us, now_us);

        let warn_overrun = {
            let mut state = self.state.lock();
            if !state.running {
                return false;
            }
            if !state.in_flight.contains(&entry.id) {
                // Removed or replaced by an earlier callback of this tick.
                return true;
            }
            state.executing = Some(entry.id);
            state.stats.dispatched = state.stats.dispatched.saturating_add(1);
            state.lateness.record(lateness_us, skipped > 0);
            if skipped > 0 {
                state.stats.record_overrun(skipped);
                state.overrun_throttle.should_print(now_us)
            } else {
                false
            }
        };

        if warn_overrun {
            warn!(
                scheduler = %self.name,
                entry = %entry.label(),
                late_us = lateness_us,
                skipped,
                "Deadline overrun, skipping missed periods"
            );
        }

        let callback = Arc::clone(&entry.callback);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback()));
        let faulted = match outcome {
            Ok(()) => false,
            Err(payload) => {
                self.report_fault(&CallbackFault::from_panic(&entry, payload.as_ref()));
                true
            }
        };

        let mut state = self.state.lock();
        state.executing = None;
        if faulted {
            state.stats.faults = state.stats.faults.saturating_add(1);
        }
        let retired = if state.in_flight.remove(&entry.id) && state.running && entry.is_periodic() {
            entry.expiration_us = next_expiration(entry.expiration_us, entry.period_us, now_us);
            state.queue.insert(entry)
        } else {
            Some(entry)
        };
        self.finished.notify_all();
        drop(state);
        drop(retired);
        true
    }

    fn report_fault(&self, fault: &CallbackFault) {
        error!(
            scheduler = %self.name,
            entry = %fault.id,
            name = fault.name.as_deref().unwrap_or(""),
            message = fault.message.as_str(),
            "Scheduled callback panicked"
        );

        if let Some(hook) = &self.fault_hook
            && panic::catch_unwind(AssertUnwindSafe(|| hook(fault))).is_err()
        {
            error!(scheduler = %self.name, "Fault hook panicked");
        }
    }

    /// Returns whether anything was cancelled, plus the unqueued entry for the
    /// caller to drop once the lock is released.
    fn remove_locked(&self, state: &mut LoopState, id: EntryId) -> (bool, Option<TimerEntry>) {
        if !state.running {
            return (false, None);
        }
        let unqueued = state.queue.remove(id);
        let in_flight = state.in_flight.remove(&id);
        if unqueued.is_some() {
            self.rearm(state);
        }
        (unqueued.is_some() || in_flight, unqueued)
    }
}

/// Deadline-multiplexing scheduler owning one alarm and one loop thread.
///
/// Every callback runs on the loop thread, so two entries of one scheduler never
/// overlap. Producers only take the queue lock for the duration of a heap
/// operation; callbacks are invoked with the lock released and may call back into
/// the scheduler.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
/// use tickwork_alarm::SimTimebase;
/// use tickwork_scheduler::prelude::*;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let timebase = SimTimebase::new();
/// let scheduler = Scheduler::new(&timebase, SchedulerConfig::default())?;
///
/// let fires = Arc::new(AtomicU32::new(0));
/// let counter = Arc::clone(&fires);
/// scheduler.add_periodic(
///     Arc::new(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     }),
///     Duration::from_millis(20),
///     20_000,
/// )?;
///
/// timebase.step(Duration::from_millis(100))?;
/// assert_eq!(fires.load(Ordering::SeqCst), 5);
/// scheduler.close();
/// # Ok(())
/// # }
/// ```
pub struct Scheduler {
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl Scheduler {
    /// Create a scheduler on `timebase` and spawn its loop thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the thread cannot be
    /// spawned.
    pub fn new(timebase: &dyn Timebase, config: SchedulerConfig) -> SchedulerResult<Self> {
        config.validate()?;

        let alarm = timebase.new_alarm(&config.thread_name);
        let shared = Arc::new(Shared {
            name: config.thread_name.clone(),
            alarm,
            state: Mutex::new(LoopState {
                queue: DeadlineQueue::new(),
                running: true,
                in_flight: HashSet::new(),
                executing: None,
                stats: DispatchStats::default(),
                lateness: LatenessMetrics::with_capacity(config.lateness_samples),
                overrun_throttle: PrintThrottle::new(config.overrun_warning_interval),
            }),
            finished: Condvar::new(),
            next_id: AtomicU64::new(0),
            dispatch_time_us: AtomicU64::new(0),
            fault_hook: config.fault_hook.clone(),
        });

        let loop_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || loop_shared.run())
            .map_err(|e| SchedulerError::thread_spawn(&config.thread_name, e))?;
        let thread_id = handle.thread().id();

        info!(scheduler = %config.thread_name, "Scheduler started");

        Ok(Self {
            shared,
            thread: Mutex::new(Some(handle)),
            thread_id,
        })
    }

    /// Loop thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Reserve a fresh entry id. Ids are handed out in increasing order.
    #[must_use]
    pub fn allocate_id(&self) -> EntryId {
        EntryId::from_raw(self.shared.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Queue `entry`, replacing any registration with the same id.
    ///
    /// Replacing an entry that is being dispatched keeps the running invocation
    /// but discards its reschedule in favour of `entry`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Closed`] after [`Scheduler::close`].
    pub fn insert(&self, entry: TimerEntry) -> SchedulerResult<EntryId> {
        let id = entry.id;
        let replaced = {
            let mut state = self.shared.state.lock();
            if !state.running {
                drop(state);
                drop(entry);
                return Err(SchedulerError::closed(&self.shared.name));
            }
            state.in_flight.remove(&id);
            let replaced = state.queue.insert(entry);
            self.shared.rearm(&state);
            replaced
        };
        drop(replaced);
        Ok(id)
    }

    /// Register a periodic callback whose first expiration is `first_expiration_us`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ZeroPeriod`] for a zero period and
    /// [`SchedulerError::Closed`] after [`Scheduler::close`].
    pub fn add_periodic(
        &self,
        callback: Callback,
        period: Duration,
        first_expiration_us: u64,
    ) -> SchedulerResult<EntryId> {
        let id = self.allocate_id();
        let period_us = duration_to_us(period);
        if period_us == 0 {
            return Err(SchedulerError::ZeroPeriod(id));
        }
        self.insert(TimerEntry::periodic(id, callback, period_us, first_expiration_us))
    }

    /// Register a callback that fires once at `expiration_us`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Closed`] after [`Scheduler::close`].
    pub fn add_one_shot(&self, callback: Callback, expiration_us: u64) -> SchedulerResult<EntryId> {
        let id = self.allocate_id();
        self.insert(TimerEntry::one_shot(id, callback, expiration_us))
    }

    /// Cancel a registration.
    ///
    /// An invocation already running is not interrupted but will not be
    /// rescheduled. Returns whether anything was cancelled; always `false` after
    /// close.
    pub fn remove(&self, id: EntryId) -> bool {
        let (removed, unqueued) = {
            let mut state = self.shared.state.lock();
            self.shared.remove_locked(&mut state, id)
        };
        drop(unqueued);
        removed
    }

    /// Like [`Scheduler::remove`], then wait for a running invocation of `id` to
    /// return.
    ///
    /// Called from the loop thread itself (for example by the callback being
    /// removed) this does not wait.
    pub fn remove_and_wait(&self, id: EntryId) -> bool {
        let mut state = self.shared.state.lock();
        let (removed, unqueued) = self.shared.remove_locked(&mut state, id);
        if !self.is_loop_thread() {
            while state.executing == Some(id) {
                self.shared.finished.wait(&mut state);
            }
        }
        drop(state);
        drop(unqueued);
        removed
    }

    /// Whether `id` is queued or being dispatched.
    #[must_use]
    pub fn contains(&self, id: EntryId) -> bool {
        let state = self.shared.state.lock();
        state.queue.contains(id) || state.in_flight.contains(&id)
    }

    /// Queued entries, excluding those popped for the current tick.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().queue.is_empty()
    }

    /// Earliest queued expiration.
    #[must_use]
    pub fn next_deadline_us(&self) -> Option<u64> {
        self.shared.state.lock().queue.next_deadline_us()
    }

    /// Current time on the scheduler's clock.
    #[must_use]
    pub fn now_us(&self) -> u64 {
        self.shared.alarm.now_us()
    }

    /// Wake time of the current or most recent dispatch; 0 before the first.
    #[must_use]
    pub fn dispatch_time_us(&self) -> u64 {
        self.shared.dispatch_time_us.load(Ordering::Acquire)
    }

    /// Dispatch counters.
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.shared.state.lock().stats
    }

    /// Lateness summary.
    #[must_use]
    pub fn lateness(&self) -> LatenessSnapshot {
        self.shared.state.lock().lateness.snapshot()
    }

    /// Whether the calling thread is this scheduler's loop thread.
    #[must_use]
    pub fn is_loop_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Whether [`Scheduler::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.shared.state.lock().running
    }

    /// Stop dispatching, drop every entry and join the loop thread.
    ///
    /// Idempotent. When called from a callback on the loop thread the loop exits
    /// once that callback returns and no join is attempted.
    pub fn close(&self) {
        let (was_running, drained) = {
            let mut state = self.shared.state.lock();
            let was_running = state.running;
            state.running = false;
            let drained = std::mem::take(&mut state.queue);
            state.in_flight.clear();
            self.shared.finished.notify_all();
            (was_running, drained)
        };
        self.shared.alarm.stop();
        drop(drained);

        if was_running {
            info!(scheduler = %self.shared.name, "Scheduler closed");
        }

        if self.is_loop_thread() {
            return;
        }

        let handle = self.thread.lock().take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            error!(scheduler = %self.shared.name, "Scheduler thread panicked");
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.shared.name)
            .field("closed", &self.is_closed())
            .field("queued", &self.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use tickwork_alarm::SimTimebase;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn counter() -> (Arc<AtomicU32>, Callback) {
        let count = Arc::new(AtomicU32::new(0));
        let inner = Arc::clone(&count);
        let callback: Callback = Arc::new(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn test_one_shot_fires_once() -> TestResult {
        let timebase = SimTimebase::new();
        let scheduler = Scheduler::new(&timebase, SchedulerConfig::named("one-shot"))?;
        let (count, callback) = counter();

        let id = scheduler.add_one_shot(callback, 5_000)?;
        assert!(scheduler.contains(id));
        assert_eq!(scheduler.next_deadline_us(), Some(5_000));

        timebase.step_us(4_999)?;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        timebase.step_us(10_000)?;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.contains(id));
        assert!(scheduler.is_empty());
        Ok(())
    }

    #[test]
    fn test_zero_period_rejected() -> TestResult {
        let timebase = SimTimebase::new();
        let scheduler = Scheduler::new(&timebase, SchedulerConfig::default())?;
        let (_, callback) = counter();
        let result = scheduler.add_periodic(callback, Duration::ZERO, 0);
        assert!(matches!(result, Err(SchedulerError::ZeroPeriod(_))));
        Ok(())
    }

    #[test]
    fn test_remove_before_fire() -> TestResult {
        let timebase = SimTimebase::new();
        let scheduler = Scheduler::new(&timebase, SchedulerConfig::default())?;
        let (count, callback) = counter();

        let id = scheduler.add_periodic(callback, Duration::from_millis(10), 10_000)?;
        assert!(scheduler.remove(id));
        assert!(!scheduler.remove(id));
        assert_eq!(scheduler.next_deadline_us(), None);

        timebase.step_us(50_000)?;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[test]
    fn test_insert_after_close_is_error() -> TestResult {
        let timebase = SimTimebase::new();
        let scheduler = Scheduler::new(&timebase, SchedulerConfig::named("closed"))?;
        scheduler.close();
        scheduler.close();

        let (_, callback) = counter();
        let result = scheduler.add_one_shot(callback, 0);
        assert_eq!(result, Err(SchedulerError::closed("closed")));
        assert!(!scheduler.remove(EntryId::from_raw(0)));
        assert!(scheduler.is_closed());
        Ok(())
    }

    #[test]
    fn test_ids_are_monotonic() -> TestResult {
        let timebase = SimTimebase::new();
        let scheduler = Scheduler::new(&timebase, SchedulerConfig::default())?;
        let a = scheduler.allocate_id();
        let b = scheduler.allocate_id();
        assert!(a < b);
        Ok(())
    }

    #[test]
    fn test_invalid_config_rejected() {
        let timebase = SimTimebase::new();
        let result = Scheduler::new(&timebase, SchedulerConfig::named(""));
        assert!(matches!(result, Err(SchedulerError::InvalidConfiguration(_))));
        assert_eq!(timebase.alarm_count(), 0);
    }

    #[test]
    fn test_drop_releases_alarm() -> TestResult {
        let timebase = SimTimebase::new();
        let scheduler = Scheduler::new(&timebase, SchedulerConfig::default())?;
        assert_eq!(timebase.alarm_count(), 1);
        drop(scheduler);
        assert_eq!(timebase.alarm_count(), 0);
        Ok(())
    }
}
