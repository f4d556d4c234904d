//! Shared test utilities for tickwork.
//!
//! # Modules
//!
//! - [`mod@must`] - Panicking accessors and wall-clock polling
//! - [`assertions`] - Assertion macros for fire-time sequences
//! - [`fire_log`] - Thread-safe recorder of callback fires
//! - [`probe`] - Overlap detection for mutual-exclusion checks
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! tickwork-test-helpers = { workspace = true }
//! ```
//!
//! ```rust,ignore
//! use tickwork_test_helpers::prelude::*;
//! ```

#![allow(clippy::unwrap_used, clippy::panic, reason = "test-only crate")]

pub mod assertions;
pub mod fire_log;
pub mod must;
pub mod prelude;
pub mod probe;

pub use fire_log::{FireEvent, FireLog};
pub use must::*;
pub use probe::ExclusionProbe;
