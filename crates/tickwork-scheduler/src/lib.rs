//! Deadline-multiplexing periodic callback scheduler.
//!
//! One loop thread and one alarm serve any number of independently periodic or
//! one-shot callbacks:
//!
//! - **DeadlineQueue**: indexed min-heap ordered by expiration, then registration
//! - **Scheduler**: loop thread that arms the alarm to the queue minimum, dispatches
//!   every due entry in deadline order and reschedules periodic ones
//! - **drift**: phase-locked rescheduling that skips missed periods after an overrun
//! - **LatenessMetrics** / **DispatchStats**: dispatch diagnostics
//!
//! # Guarantees
//!
//! - Callbacks only ever run on the loop thread, never under the queue lock
//! - A periodic entry's expirations stay on `first + k * period`
//! - A panicking callback is reported and does not stop the loop
//! - Inserting after `close()` is an error; removing after `close()` is a no-op

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod drift;
pub mod entry;
pub mod error;
pub mod lateness;
pub mod queue;
pub mod scheduler;
pub mod stats;
pub mod throttle;

pub mod prelude;

pub use config::{FaultHook, SchedulerConfig, SchedulerConfigBuilder};
pub use entry::{Callback, CallbackFault, EntryId, TimerEntry};
pub use error::{SchedulerError, SchedulerResult};
pub use lateness::{LatenessMetrics, LatenessSnapshot};
pub use queue::DeadlineQueue;
pub use scheduler::Scheduler;
pub use stats::DispatchStats;
pub use throttle::PrintThrottle;

/// Default number of lateness samples kept for percentile queries.
pub const DEFAULT_LATENESS_SAMPLES: usize = 1_024;
