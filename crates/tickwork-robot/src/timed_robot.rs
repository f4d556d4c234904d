//! The `TimedRobot` main-loop multiplexer.

use crate::config::TimedRobotConfig;
use crate::error::{RobotError, RobotResult};
use crate::mode::{ModeSource, RobotMode};
use crate::program::{Hook, RobotProgram, run_mode_hook};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;
use tickwork_alarm::Timebase;
use tickwork_scheduler::drift::{duration_to_us, phase_locked_start};
use tickwork_scheduler::{Callback, DispatchStats, LatenessSnapshot, Scheduler, TimerEntry};
use tickwork_watchdog::{Watchdog, WatchdogRegistry};
use tracing::{debug, info, warn};

struct RobotCore<P> {
    program: P,
    last_mode: Option<RobotMode>,
    ds_connected_called: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Starting,
    Running,
    Ended,
}

struct Lifecycle {
    phase: Phase,
    pending: Vec<TimerEntry>,
}

/// Runs a [`RobotProgram`] and extra periodic callbacks on one loop thread.
///
/// The loop function and every callback from [`TimedRobot::add_periodic`] are
/// phase-locked to the construction time. Nothing dispatches until
/// [`TimedRobot::start_competition`] is called.
pub struct TimedRobot<P: RobotProgram> {
    config: TimedRobotConfig,
    scheduler: Scheduler,
    watchdog_registry: Arc<WatchdogRegistry>,
    owns_registry: bool,
    loop_watchdog: Arc<Watchdog>,
    modes: Arc<dyn ModeSource>,
    core: Arc<Mutex<RobotCore<P>>>,
    lifecycle: Mutex<Lifecycle>,
    lifecycle_changed: Condvar,
    start_time_us: u64,
}

impl<P: RobotProgram> TimedRobot<P> {
    /// Create a robot around `program`, reading modes from `modes`.
    ///
    /// Spawns the main-loop thread and a private registry thread for the
    /// loop-overrun watchdog; [`TimedRobot::close`] joins both.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a thread cannot be
    /// spawned.
    pub fn new(
        timebase: &dyn Timebase,
        program: P,
        modes: Arc<dyn ModeSource>,
        config: TimedRobotConfig,
    ) -> RobotResult<Self> {
        config.validate()?;
        let registry = WatchdogRegistry::new(timebase, config.watchdog_config())?;
        Self::build(timebase, program, modes, registry, true, config)
    }

    /// Like [`TimedRobot::new`], but the loop-overrun watchdog runs on an
    /// existing `registry`, so the robot spawns only its main-loop thread.
    ///
    /// The registry is left open by [`TimedRobot::close`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the registry is closed
    /// or the loop thread cannot be spawned.
    pub fn with_watchdog_registry(
        timebase: &dyn Timebase,
        program: P,
        modes: Arc<dyn ModeSource>,
        registry: Arc<WatchdogRegistry>,
        config: TimedRobotConfig,
    ) -> RobotResult<Self> {
        config.validate()?;
        if registry.is_closed() {
            return Err(RobotError::closed(registry.config().thread_name.as_str()));
        }
        Self::build(timebase, program, modes, registry, false, config)
    }

    fn build(
        timebase: &dyn Timebase,
        program: P,
        modes: Arc<dyn ModeSource>,
        watchdog_registry: Arc<WatchdogRegistry>,
        owns_registry: bool,
        config: TimedRobotConfig,
    ) -> RobotResult<Self> {
        let scheduler = Scheduler::new(timebase, config.scheduler_config())?;

        let period_secs = config.period.as_secs_f64();
        let loop_watchdog = Arc::new(Watchdog::new(&watchdog_registry, config.period, move || {
            warn!("Loop time of {period_secs}s overrun");
        }));

        let start_time_us = scheduler.now_us();
        let robot = Self {
            scheduler,
            watchdog_registry,
            owns_registry,
            loop_watchdog,
            modes,
            core: Arc::new(Mutex::new(RobotCore {
                program,
                last_mode: None,
                ds_connected_called: false,
            })),
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Idle,
                pending: Vec::new(),
            }),
            lifecycle_changed: Condvar::new(),
            start_time_us,
            config,
        };

        let loop_callback = robot.loop_func();
        robot.schedule(loop_callback, robot.config.period, Duration::ZERO, "loop_func")?;
        Ok(robot)
    }

    /// Add a callback running every `period`, shifted by `offset`.
    ///
    /// The first run is at `start + offset + period`, advanced by whole periods
    /// past the current time; `start` is the construction time.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::ZeroPeriod`] for a period under one microsecond and
    /// [`RobotError::Closed`] once the competition ended.
    pub fn add_periodic<F>(&self, callback: F, period: Duration, offset: Duration) -> RobotResult<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule(Arc::new(callback), period, offset, "periodic")
    }

    fn schedule(&self, callback: Callback, period: Duration, offset: Duration, name: &str) -> RobotResult<()> {
        let period_us = duration_to_us(period);
        if period_us == 0 {
            return Err(RobotError::ZeroPeriod);
        }

        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.phase == Phase::Ended {
            return Err(RobotError::closed(&self.config.thread_name));
        }
        let first_us = phase_locked_start(
            self.start_time_us,
            self.scheduler.now_us(),
            period_us,
            duration_to_us(offset),
        );
        let entry = TimerEntry::periodic(self.scheduler.allocate_id(), callback, period_us, first_us).with_name(name);
        debug!(robot = %self.config.thread_name, id = %entry.id, first_us, period_us, "Periodic callback added");
        if lifecycle.phase == Phase::Running {
            self.scheduler.insert(entry)?;
        } else {
            lifecycle.pending.push(entry);
        }
        Ok(())
    }

    /// Run the program until [`TimedRobot::end_competition`].
    ///
    /// Calls `robot_init` (and `simulation_init` in simulation) on this thread,
    /// starts dispatching the loop and all added callbacks, then blocks.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::AlreadyStarted`] on a second call and
    /// [`RobotError::Closed`] after the competition ended.
    pub fn start_competition(&self) -> RobotResult<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            match lifecycle.phase {
                Phase::Idle => lifecycle.phase = Phase::Starting,
                Phase::Ended => return Err(RobotError::closed(&self.config.thread_name)),
                Phase::Starting | Phase::Running => return Err(RobotError::AlreadyStarted),
            }
        }

        {
            let mut core = self.core.lock();
            core.program.robot_init();
            if self.config.simulation {
                core.program.simulation_init();
            }
        }

        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.phase == Phase::Ended {
            return Ok(());
        }
        for entry in std::mem::take(&mut lifecycle.pending) {
            self.scheduler.insert(entry)?;
        }
        lifecycle.phase = Phase::Running;
        self.lifecycle_changed.notify_all();
        info!(robot = %self.config.thread_name, "Robot program startup complete");

        while lifecycle.phase != Phase::Ended {
            self.lifecycle_changed.wait(&mut lifecycle);
        }
        Ok(())
    }

    /// Stop dispatching and release [`TimedRobot::start_competition`].
    ///
    /// Joins the loop thread unless called from it.
    pub fn end_competition(&self) {
        let pending = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.phase == Phase::Ended {
                return;
            }
            lifecycle.phase = Phase::Ended;
            self.lifecycle_changed.notify_all();
            std::mem::take(&mut lifecycle.pending)
        };
        drop(pending);
        self.loop_watchdog.disable();
        self.scheduler.close();
        info!(robot = %self.config.thread_name, "Competition ended");
    }

    /// End the competition and join the loop thread, plus the watchdog
    /// registry thread when the robot created it.
    pub fn close(&self) {
        self.end_competition();
        if self.owns_registry {
            self.watchdog_registry.close();
        }
    }

    /// Registry running the loop-overrun watchdog.
    #[must_use]
    pub fn watchdog_registry(&self) -> &Arc<WatchdogRegistry> {
        &self.watchdog_registry
    }

    /// Whether the loop is dispatching.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle.lock().phase == Phase::Running
    }

    /// Main-loop period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.config.period
    }

    /// Clock time at construction; the phase reference of every callback.
    #[must_use]
    pub fn start_time_us(&self) -> u64 {
        self.start_time_us
    }

    /// Wake time of the current or most recent tick.
    #[must_use]
    pub fn loop_start_time_us(&self) -> u64 {
        self.scheduler.dispatch_time_us()
    }

    /// Mode last entered by the loop function.
    #[must_use]
    pub fn current_mode(&self) -> Option<RobotMode> {
        self.core.lock().last_mode
    }

    /// Epochs recorded by the loop-overrun watchdog during the latest tick.
    #[must_use]
    pub fn loop_epochs(&self) -> Vec<(String, Duration)> {
        self.loop_watchdog.epochs()
    }

    /// Dispatch counters of the main loop.
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.scheduler.stats()
    }

    /// Wake-up lateness of the main loop.
    #[must_use]
    pub fn lateness(&self) -> LatenessSnapshot {
        self.scheduler.lateness()
    }

    /// Run `f` with exclusive access to the program.
    ///
    /// Blocks while a tick is running.
    pub fn with_program<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        f(&mut self.core.lock().program)
    }

    fn loop_func(&self) -> Callback {
        let core = Arc::clone(&self.core);
        let modes = Arc::clone(&self.modes);
        let watchdog = Arc::clone(&self.loop_watchdog);
        let simulation = self.config.simulation;

        Arc::new(move || {
            if let Err(err) = watchdog.reset() {
                debug!(error = %err, "Loop watchdog unavailable");
            }
            let mode = modes.mode();
            {
                let mut guard = core.lock();
                let core = &mut *guard;

                if !core.ds_connected_called && modes.is_ds_attached() {
                    core.ds_connected_called = true;
                    core.program.driver_station_connected();
                }

                if core.last_mode != Some(mode) {
                    if let Some(last) = core.last_mode {
                        run_mode_hook(&mut core.program, last, Hook::Exit);
                    }
                    let epoch = run_mode_hook(&mut core.program, mode, Hook::Init);
                    watchdog.add_epoch(&epoch);
                    debug!(from = ?core.last_mode, to = %mode, "Robot mode changed");
                    core.last_mode = Some(mode);
                }

                let epoch = run_mode_hook(&mut core.program, mode, Hook::Periodic);
                watchdog.add_epoch(&epoch);

                core.program.robot_periodic();
                watchdog.add_epoch("robotPeriodic()");

                if simulation {
                    core.program.simulation_periodic();
                    watchdog.add_epoch("simulationPeriodic()");
                }
            }
            watchdog.disable();
            if watchdog.is_expired() {
                watchdog.print_epochs();
            }
        })
    }
}

impl<P: RobotProgram> std::fmt::Debug for TimedRobot<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedRobot")
            .field("config", &self.config)
            .field("start_time_us", &self.start_time_us)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl<P: RobotProgram> Drop for TimedRobot<P> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::SimDriverStation;
    use tickwork_alarm::SimTimebase;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    struct Idle;

    impl RobotProgram for Idle {}

    fn idle_robot(timebase: &SimTimebase) -> RobotResult<TimedRobot<Idle>> {
        TimedRobot::new(timebase, Idle, Arc::new(SimDriverStation::new()), TimedRobotConfig::default())
    }

    #[test]
    fn test_zero_period_callback_rejected() -> TestResult {
        let timebase = SimTimebase::new();
        let robot = idle_robot(&timebase)?;
        let result = robot.add_periodic(|| {}, Duration::ZERO, Duration::ZERO);
        assert_eq!(result, Err(RobotError::ZeroPeriod));
        Ok(())
    }

    #[test]
    fn test_nothing_dispatches_before_start() -> TestResult {
        let timebase = SimTimebase::new();
        let robot = idle_robot(&timebase)?;
        timebase.step(Duration::from_millis(100))?;
        assert_eq!(robot.stats().dispatched, 0);
        assert_eq!(robot.current_mode(), None);
        Ok(())
    }

    #[test]
    fn test_close_is_idempotent() -> TestResult {
        let timebase = SimTimebase::new();
        let robot = idle_robot(&timebase)?;
        robot.close();
        robot.close();
        robot.end_competition();

        assert!(matches!(robot.start_competition(), Err(RobotError::Closed(_))));
        assert!(matches!(
            robot.add_periodic(|| {}, Duration::from_millis(5), Duration::ZERO),
            Err(RobotError::Closed(_))
        ));
        Ok(())
    }

    #[test]
    fn test_start_time_is_construction_time() -> TestResult {
        let timebase = SimTimebase::new();
        timebase.step(Duration::from_millis(7))?;
        let robot = idle_robot(&timebase)?;
        assert_eq!(robot.start_time_us(), 7_000);
        assert_eq!(robot.period(), Duration::from_millis(20));
        Ok(())
    }
}
