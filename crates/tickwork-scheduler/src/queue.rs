//! Deadline queue: an indexed binary min-heap of timer entries.
//!
//! Entries live in a slot arena. The heap orders slot indices by
//! `(expiration_us, id)`, each slot remembers its heap position, and an
//! `EntryId -> slot` map gives O(log n) removal of any registration. The queue
//! itself is not synchronized; the scheduler guards it with its loop mutex.

use crate::entry::{EntryId, TimerEntry};
use std::collections::HashMap;

#[derive(Debug)]
struct Slot {
    entry: TimerEntry,
    heap_pos: usize,
}

/// Min-heap of timer entries keyed by expiration, with removal by id.
#[derive(Debug, Default)]
pub struct DeadlineQueue {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    heap: Vec<usize>,
    index: HashMap<EntryId, usize>,
}

impl DeadlineQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            heap: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert an entry, replacing any queued entry with the same id.
    ///
    /// Returns the replaced entry.
    pub fn insert(&mut self, entry: TimerEntry) -> Option<TimerEntry> {
        let replaced = self.remove(entry.id);
        let id = entry.id;
        let heap_pos = self.heap.len();
        let slot = Slot { entry, heap_pos };

        let slot_idx = match self.free.pop() {
            Some(idx) => {
                if let Some(cell) = self.slots.get_mut(idx) {
                    *cell = Some(slot);
                }
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len().saturating_sub(1)
            }
        };

        self.index.insert(id, slot_idx);
        self.heap.push(slot_idx);
        self.sift_up(heap_pos);
        replaced
    }

    /// Entry with the soonest expiration.
    #[must_use]
    pub fn peek_min(&self) -> Option<&TimerEntry> {
        let slot_idx = *self.heap.first()?;
        self.entry_at_slot(slot_idx)
    }

    /// Soonest expiration time.
    #[must_use]
    pub fn next_deadline_us(&self) -> Option<u64> {
        self.peek_min().map(|entry| entry.expiration_us)
    }

    /// Remove and return the entry with the soonest expiration.
    pub fn pop_min(&mut self) -> Option<TimerEntry> {
        if self.heap.is_empty() {
            return None;
        }
        self.remove_at(0)
    }

    /// Pop the soonest entry only if it has expired at `now_us`.
    pub fn pop_due(&mut self, now_us: u64) -> Option<TimerEntry> {
        match self.next_deadline_us() {
            Some(deadline) if deadline <= now_us => self.pop_min(),
            _ => None,
        }
    }

    /// Remove the entry registered under `id`.
    pub fn remove(&mut self, id: EntryId) -> Option<TimerEntry> {
        let slot_idx = *self.index.get(&id)?;
        let heap_pos = self.slots.get(slot_idx)?.as_ref()?.heap_pos;
        self.remove_at(heap_pos)
    }

    /// Queued entry registered under `id`.
    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&TimerEntry> {
        let slot_idx = *self.index.get(&id)?;
        self.entry_at_slot(slot_idx)
    }

    /// Whether `id` is queued.
    #[must_use]
    pub fn contains(&self, id: EntryId) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.heap.clear();
        self.index.clear();
    }

    /// Queued entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &TimerEntry> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|slot| &slot.entry))
    }

    fn entry_at_slot(&self, slot_idx: usize) -> Option<&TimerEntry> {
        self.slots
            .get(slot_idx)
            .and_then(Option::as_ref)
            .map(|slot| &slot.entry)
    }

    fn key_at(&self, heap_pos: usize) -> Option<(u64, EntryId)> {
        let slot_idx = *self.heap.get(heap_pos)?;
        self.entry_at_slot(slot_idx).map(TimerEntry::key)
    }

    fn less(&self, a: usize, b: usize) -> bool {
        match (self.key_at(a), self.key_at(b)) {
            (Some(left), Some(right)) => left < right,
            _ => false,
        }
    }

    fn sync_position(&mut self, heap_pos: usize) {
        let Some(&slot_idx) = self.heap.get(heap_pos) else {
            return;
        };
        if let Some(Some(slot)) = self.slots.get_mut(slot_idx) {
            slot.heap_pos = heap_pos;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.sync_position(a);
        self.sync_position(b);
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(pos, parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = pos.saturating_mul(2).saturating_add(1);
            if left >= len {
                break;
            }
            let right = left.saturating_add(1);
            let mut smallest = pos;
            if self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.swap(pos, smallest);
            pos = smallest;
        }
    }

    fn remove_at(&mut self, heap_pos: usize) -> Option<TimerEntry> {
        let last = self.heap.len().checked_sub(1)?;
        if heap_pos > last {
            return None;
        }

        self.swap(heap_pos, last);
        let slot_idx = self.heap.pop()?;
        if heap_pos < self.heap.len() {
            self.sift_down(heap_pos);
            self.sift_up(heap_pos);
        }

        let slot = self.slots.get_mut(slot_idx)?.take()?;
        self.free.push(slot_idx);
        self.index.remove(&slot.entry.id);
        Some(slot.entry)
    }
}
