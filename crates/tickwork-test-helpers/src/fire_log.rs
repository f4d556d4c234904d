//! Thread-safe recorder of callback fires.

use parking_lot::Mutex;
use std::sync::Arc;
use tickwork_alarm::Clock;

/// One recorded fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireEvent {
    /// Label given to the recorder.
    pub label: String,
    /// Clock reading when the callback ran.
    pub at_us: u64,
    /// Name of the thread the callback ran on.
    pub thread: Option<String>,
}

/// Shared, append-only log of fires. Clones share the same log.
///
/// # Example
///
/// ```rust
/// use tickwork_alarm::SimTimebase;
/// use tickwork_test_helpers::FireLog;
///
/// let timebase = SimTimebase::new();
/// let log = FireLog::new();
/// let callback = log.recorder("tick", timebase.clone());
/// callback();
/// assert_eq!(log.times("tick"), vec![0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FireLog {
    events: Arc<Mutex<Vec<FireEvent>>>,
}

impl FireLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fire of `label` at `at_us` from the current thread.
    pub fn record(&self, label: &str, at_us: u64) {
        let thread = std::thread::current().name().map(str::to_string);
        self.events.lock().push(FireEvent {
            label: label.to_string(),
            at_us,
            thread,
        });
    }

    /// Callback that records `label` at the clock's current time.
    pub fn recorder<C>(&self, label: &str, clock: C) -> Arc<dyn Fn() + Send + Sync>
    where
        C: Clock + 'static,
    {
        let log = self.clone();
        let label = label.to_string();
        Arc::new(move || log.record(&label, clock.now_us()))
    }

    /// Fire times of `label` in recording order.
    #[must_use]
    pub fn times(&self, label: &str) -> Vec<u64> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.label == label)
            .map(|event| event.at_us)
            .collect()
    }

    /// Labels in recording order.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| event.label.clone())
            .collect()
    }

    /// Number of fires of `label`.
    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.label == label)
            .count()
    }

    /// Snapshot of every event.
    #[must_use]
    pub fn events(&self) -> Vec<FireEvent> {
        self.events.lock().clone()
    }

    /// Total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Forget every event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_query() {
        let log = FireLog::new();
        log.record("a", 10);
        log.record("b", 10);
        log.record("a", 20);

        assert_eq!(log.times("a"), vec![10, 20]);
        assert_eq!(log.count("b"), 1);
        assert_eq!(log.labels(), vec!["a", "b", "a"]);
        assert_eq!(log.len(), 3);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_clones_share_events() {
        let log = FireLog::new();
        let other = log.clone();
        other.record("shared", 5);
        assert_eq!(log.times("shared"), vec![5]);
    }
}
