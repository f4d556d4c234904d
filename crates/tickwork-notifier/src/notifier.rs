//! The `Notifier` facade.

use crate::config::NotifierConfig;
use crate::error::{NotifierError, NotifierResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tickwork_alarm::Timebase;
use tickwork_scheduler::drift::duration_to_us;
use tickwork_scheduler::{Callback, EntryId, Scheduler, TimerEntry};
use tracing::debug;

type Handler = Arc<Mutex<Option<Callback>>>;

/// Timer that invokes a handler once after a delay or periodically.
///
/// Restarting a running notifier replaces its schedule. The handler can be
/// swapped at any time with [`Notifier::set_callback`]; the swap takes effect at
/// the next fire.
pub struct Notifier {
    name: String,
    scheduler: Arc<Scheduler>,
    owns_scheduler: bool,
    id: EntryId,
    handler: Handler,
    closed: AtomicBool,
}

impl Notifier {
    /// Create a notifier with its own scheduler loop on `timebase`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the loop thread cannot
    /// be spawned.
    pub fn new<F>(timebase: &dyn Timebase, callback: F, config: NotifierConfig) -> NotifierResult<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        config.validate()?;
        let scheduler = Arc::new(Scheduler::new(timebase, config.scheduler_config())?);
        Ok(Self::with_scheduler(scheduler, true, Arc::new(callback), config.name))
    }

    /// Create a notifier that shares `scheduler` with other users.
    ///
    /// Closing such a notifier only stops it; the scheduler keeps running.
    pub fn on_scheduler<F>(scheduler: Arc<Scheduler>, callback: F, name: impl Into<String>) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_scheduler(scheduler, false, Arc::new(callback), name.into())
    }

    fn with_scheduler(scheduler: Arc<Scheduler>, owns_scheduler: bool, callback: Callback, name: String) -> Self {
        let id = scheduler.allocate_id();
        Self {
            name,
            scheduler,
            owns_scheduler,
            id,
            handler: Arc::new(Mutex::new(Some(callback))),
            closed: AtomicBool::new(false),
        }
    }

    /// Notifier name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the handler invoked on each fire.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.handler.lock() = Some(Arc::new(callback));
    }

    /// Fire once, `delay` from now. A zero delay fires on the next dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`NotifierError::Closed`] after [`Notifier::close`] or a wrapped
    /// scheduler error if the scheduler was closed.
    pub fn start_single(&self, delay: Duration) -> NotifierResult<()> {
        self.ensure_open()?;
        let at_us = self.scheduler.now_us().saturating_add(duration_to_us(delay));
        let entry = TimerEntry::one_shot(self.id, self.entry_callback(), at_us).with_name(self.name.as_str());
        self.scheduler.insert(entry)?;
        debug!(notifier = %self.name, at_us, "Notifier started single-shot");
        Ok(())
    }

    /// Fire every `period`, the first time one period from now.
    ///
    /// # Errors
    ///
    /// Returns [`NotifierError::ZeroPeriod`] for a period under one microsecond,
    /// [`NotifierError::Closed`] after [`Notifier::close`], or a wrapped scheduler
    /// error.
    pub fn start_periodic(&self, period: Duration) -> NotifierResult<()> {
        self.ensure_open()?;
        let period_us = duration_to_us(period);
        if period_us == 0 {
            return Err(NotifierError::ZeroPeriod(self.name.clone()));
        }
        let first_us = self.scheduler.now_us().saturating_add(period_us);
        let entry = TimerEntry::periodic(self.id, self.entry_callback(), period_us, first_us)
            .with_name(self.name.as_str());
        self.scheduler.insert(entry)?;
        debug!(notifier = %self.name, period_us, first_us, "Notifier started periodic");
        Ok(())
    }

    /// Cancel pending fires and wait for a running handler to return.
    ///
    /// The loop keeps running; the notifier can be started again.
    pub fn stop(&self) {
        self.scheduler.remove_and_wait(self.id);
    }

    /// Whether a fire is pending or the handler is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.scheduler.contains(self.id)
    }

    /// Stop permanently; a dedicated loop thread is joined.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.owns_scheduler {
            self.scheduler.close();
        } else {
            self.stop();
        }
    }

    /// Whether [`Notifier::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> NotifierResult<()> {
        if self.is_closed() {
            return Err(NotifierError::closed(&self.name));
        }
        Ok(())
    }

    fn entry_callback(&self) -> Callback {
        let handler = Arc::clone(&self.handler);
        Arc::new(move || {
            // Clone out so the handler may call set_callback on its own notifier.
            let current = handler.lock().clone();
            if let Some(callback) = current {
                callback();
            }
        })
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("owns_scheduler", &self.owns_scheduler)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.close();
    }
}
