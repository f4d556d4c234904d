//! Feed-or-fault watchdogs on a shared scheduler thread.
//!
//! A [`WatchdogRegistry`] owns one scheduler loop. Every [`Watchdog`] created on it
//! is a single one-shot entry that `enable()`/`reset()`/`feed()` pushes back to
//! `now + timeout`. If the watchdog is not fed in time the loop thread logs a
//! rate-limited warning and runs the watchdog's callback once; an expired watchdog
//! stays quiet until it is enabled again.
//!
//! Each watchdog also carries an [`EpochTracer`] for attributing time inside the
//! monitored section, printed on demand once the watchdog has expired.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tickwork_alarm::SimTimebase;
//! use tickwork_watchdog::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let timebase = SimTimebase::new();
//! let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
//! let watchdog = Watchdog::new(&registry, Duration::from_millis(100), || {});
//!
//! watchdog.enable()?;
//! timebase.step(Duration::from_millis(150))?;
//! assert!(watchdog.is_expired());
//! # Ok(())
//! # }
//! ```

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod registry;
pub mod tracer;
pub mod watchdog;

pub mod prelude;

pub use config::{WatchdogConfig, WatchdogConfigBuilder};
pub use error::{WatchdogError, WatchdogResult};
pub use registry::WatchdogRegistry;
pub use tracer::EpochTracer;
pub use watchdog::Watchdog;
