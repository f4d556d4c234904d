//! Prelude for the tickwork-alarm crate.
//!
//! ```rust
//! use tickwork_alarm::prelude::*;
//! ```

pub use crate::clock::{Alarm, AlarmWake, Clock, Timebase};
pub use crate::error::{AlarmError, AlarmResult};
pub use crate::sim::{SimAlarm, SimTimebase};
pub use crate::system::{SystemAlarm, SystemTimebase};
