//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use tickwork_test_helpers::prelude::*;
//! ```

pub use crate::fire_log::{FireEvent, FireLog};
pub use crate::must::{must, must_some, wait_until};
pub use crate::probe::ExclusionProbe;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
