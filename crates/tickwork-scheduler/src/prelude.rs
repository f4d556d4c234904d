//! Prelude module for common scheduler types.

pub use crate::config::{FaultHook, SchedulerConfig};
pub use crate::entry::{Callback, CallbackFault, EntryId, TimerEntry};
pub use crate::error::{SchedulerError, SchedulerResult};
pub use crate::lateness::LatenessSnapshot;
pub use crate::scheduler::Scheduler;
pub use crate::stats::DispatchStats;
