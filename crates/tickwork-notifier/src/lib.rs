//! Single-shot and periodic notifier timers.
//!
//! A [`Notifier`] owns one registration on a [`tickwork_scheduler::Scheduler`]. By
//! default each notifier gets a dedicated scheduler (one alarm and one loop
//! thread); [`Notifier::on_scheduler`] shares an existing one instead, trading
//! per-notifier isolation for fewer threads.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tickwork_alarm::SimTimebase;
//! use tickwork_notifier::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let timebase = SimTimebase::new();
//! let notifier = Notifier::new(&timebase, || println!("tick"), NotifierConfig::default())?;
//! notifier.start_periodic(Duration::from_millis(5))?;
//! timebase.step(Duration::from_millis(20))?;
//! notifier.stop();
//! # Ok(())
//! # }
//! ```

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod notifier;

pub mod prelude;

pub use config::{NotifierConfig, NotifierConfigBuilder};
pub use error::{NotifierError, NotifierResult};
pub use notifier::Notifier;
