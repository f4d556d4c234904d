//! Overlap detection for callbacks that must never run concurrently.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts how many callbacks are inside a critical section at once.
///
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct ExclusionProbe {
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    entries: Arc<AtomicUsize>,
}

/// Marks the probe as occupied until dropped.
#[derive(Debug)]
pub struct ProbeGuard {
    active: Arc<AtomicUsize>,
}

impl ExclusionProbe {
    /// Create a probe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the critical section.
    #[must_use = "the section ends when the guard is dropped"]
    pub fn enter(&self) -> ProbeGuard {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        self.entries.fetch_add(1, Ordering::SeqCst);
        ProbeGuard {
            active: Arc::clone(&self.active),
        }
    }

    /// Highest number of simultaneous occupants ever observed.
    #[must_use]
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Total number of entries.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.entries.load(Ordering::SeqCst)
    }
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
