//! Prelude module for common watchdog types.

pub use crate::config::WatchdogConfig;
pub use crate::error::{WatchdogError, WatchdogResult};
pub use crate::registry::WatchdogRegistry;
pub use crate::tracer::EpochTracer;
pub use crate::watchdog::Watchdog;
