//! Timer entries and their identities.

use std::fmt;
use std::sync::Arc;

/// Shared zero-argument callback.
///
/// The scheduler only ever holds a reference-counted handle; captured state stays
/// owned by whoever created the closure.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Stable identity of a registration, assigned by the scheduler.
///
/// Ordering follows allocation order, which is also the tie-break between
/// entries sharing a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
    /// Wrap a raw identifier.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier value.
    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One scheduled callback.
#[derive(Clone)]
pub struct TimerEntry {
    /// Registration identity.
    pub id: EntryId,
    /// Action to invoke on the loop thread.
    pub callback: Callback,
    /// Period in microseconds; `0` marks a one-shot entry.
    pub period_us: u64,
    /// Absolute expiration time in microseconds.
    pub expiration_us: u64,
    /// Diagnostic name used in logs and fault reports.
    pub name: Option<Arc<str>>,
}

impl TimerEntry {
    /// Create a periodic entry whose first expiration is `first_expiration_us`.
    #[must_use]
    pub fn periodic(id: EntryId, callback: Callback, period_us: u64, first_expiration_us: u64) -> Self {
        Self {
            id,
            callback,
            period_us,
            expiration_us: first_expiration_us,
            name: None,
        }
    }

    /// Create a one-shot entry expiring at `expiration_us`.
    #[must_use]
    pub fn one_shot(id: EntryId, callback: Callback, expiration_us: u64) -> Self {
        Self {
            id,
            callback,
            period_us: 0,
            expiration_us,
            name: None,
        }
    }

    /// Attach a diagnostic name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether the entry is rescheduled after it fires.
    #[inline]
    #[must_use]
    pub fn is_periodic(&self) -> bool {
        self.period_us > 0
    }

    /// Name for diagnostics, falling back to the id.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => self.id.to_string(),
        }
    }

    /// Heap ordering key: soonest expiration, then registration order.
    #[inline]
    pub(crate) fn key(&self) -> (u64, EntryId) {
        (self.expiration_us, self.id)
    }
}

impl fmt::Debug for TimerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEntry")
            .field("id", &self.id)
            .field("period_us", &self.period_us)
            .field("expiration_us", &self.expiration_us)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Report for a callback that panicked on the loop thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFault {
    /// Faulting registration.
    pub id: EntryId,
    /// Registration name, if any.
    pub name: Option<Arc<str>>,
    /// Panic payload rendered as text.
    pub message: String,
}

impl CallbackFault {
    pub(crate) fn from_panic(entry: &TimerEntry, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Self {
            id: entry.id,
            name: entry.name.clone(),
            message,
        }
    }
}

impl fmt::Display for CallbackFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "callback {} ({}) panicked: {}", self.id, name, self.message),
            None => write!(f, "callback {} panicked: {}", self.id, self.message),
        }
    }
}
