//! Absolute-deadline alarm primitive for the tickwork scheduler.
//!
//! A scheduler loop needs exactly one thing from the platform: a timer that can be
//! armed with an absolute wake time in microseconds and that a single thread can
//! block on. This crate provides that abstraction and two implementations:
//!
//! - **SystemTimebase**: monotonic `Instant` clock, condvar deadline wait with an
//!   optional busy-spin tail for sub-millisecond precision
//! - **SimTimebase**: simulated time that only moves when a test steps it, so every
//!   scheduling decision can be checked deterministically
//!
//! # Contract
//!
//! - `Alarm::arm` replaces any earlier deadline and may be called from any thread
//! - `Alarm::wait` returns [`AlarmWake::Fired`] once the armed deadline is reached
//!   (a fire consumes the arm) or [`AlarmWake::Stopped`] after `stop()`
//! - `Alarm::cancel` disarms without waking the waiter
//! - All times share the timebase's clock: microseconds since the timebase epoch
//!
//! # Example
//!
//! ```rust
//! use tickwork_alarm::prelude::*;
//!
//! let timebase = SimTimebase::new();
//! let alarm = timebase.new_alarm("example");
//! alarm.arm(1_000);
//! timebase.advance_us(1_000);
//! assert_eq!(alarm.wait(), AlarmWake::Fired { now_us: 1_000 });
//! ```

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]

pub mod clock;
pub mod error;
pub mod sim;
pub mod system;

pub mod prelude;

pub use clock::{Alarm, AlarmWake, Clock, Timebase};
pub use error::{AlarmError, AlarmResult};
pub use sim::{SimAlarm, SimTimebase};
pub use system::{SystemAlarm, SystemTimebase};

/// Default busy-spin tail for the system alarm (80µs).
pub const DEFAULT_SPIN_TAIL_US: u64 = 80;

/// Default real-time bound on a simulated quiescence wait (5s).
pub const DEFAULT_QUIESCENCE_TIMEOUT_MS: u64 = 5_000;
