//! Prelude module for common notifier types.

pub use crate::config::NotifierConfig;
pub use crate::error::{NotifierError, NotifierResult};
pub use crate::notifier::Notifier;
