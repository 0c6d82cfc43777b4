//! Bounded FIFO submission queue.
//!
//! Decouples frame submission rate from encoder consumption rate while
//! bounding memory. Backpressure is a return value, never a blocking
//! wait — the render thread must stay responsive to its host event loop.

use std::collections::VecDeque;
use std::sync::Mutex;

use framecast_core::types::SlotIndex;

/// Result of a non-blocking submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    /// Queue at capacity. Expected under steady-state load; the caller
    /// retries after draining.
    Full,
}

pub struct SubmitQueue {
    entries: Mutex<VecDeque<SlotIndex>>,
    capacity: usize,
}

impl SubmitQueue {
    /// Capacity is fixed for the queue's lifetime and floored at 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("queue lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a slot index. Never blocks; returns [`SubmitOutcome::Full`]
    /// at capacity without enqueueing.
    pub fn submit(&self, slot: SlotIndex) -> SubmitOutcome {
        let mut entries = self.entries.lock().expect("queue lock");
        if entries.len() >= self.capacity {
            return SubmitOutcome::Full;
        }
        entries.push_back(slot);
        SubmitOutcome::Queued
    }

    /// Remove and return the oldest entry, or `None` when empty.
    pub fn drain(&self) -> Option<SlotIndex> {
        self.entries.lock().expect("queue lock").pop_front()
    }

    /// Undo the most recent submit if its entry is still tail-of-queue.
    /// Used when the encoder rejects a buffer after the entry was
    /// reserved, so the failed frame never becomes drainable.
    pub fn retract(&self, slot: SlotIndex) -> bool {
        let mut entries = self.entries.lock().expect("queue lock");
        if entries.back() == Some(&slot) {
            entries.pop_back();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_submission_order() {
        let queue = SubmitQueue::new(4);
        for slot in [3, 1, 2] {
            assert_eq!(queue.submit(slot), SubmitOutcome::Queued);
        }
        assert_eq!(queue.drain(), Some(3));
        assert_eq!(queue.drain(), Some(1));
        assert_eq!(queue.drain(), Some(2));
        assert_eq!(queue.drain(), None);
    }

    #[test]
    fn drain_on_empty_returns_none() {
        let queue = SubmitQueue::new(2);
        assert_eq!(queue.drain(), None);
    }

    #[test]
    fn submit_beyond_capacity_is_rejected_without_enqueueing() {
        let queue = SubmitQueue::new(2);
        assert_eq!(queue.submit(0), SubmitOutcome::Queued);
        assert_eq!(queue.submit(1), SubmitOutcome::Queued);
        assert_eq!(queue.submit(0), SubmitOutcome::Full);
        assert_eq!(queue.len(), 2);
        // Draining frees exactly one spot.
        assert_eq!(queue.drain(), Some(0));
        assert_eq!(queue.submit(0), SubmitOutcome::Queued);
    }

    #[test]
    fn capacity_is_floored_at_one() {
        let queue = SubmitQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        assert_eq!(queue.submit(0), SubmitOutcome::Queued);
        assert_eq!(queue.submit(1), SubmitOutcome::Full);
    }

    #[test]
    fn retract_removes_only_the_tail_entry() {
        let queue = SubmitQueue::new(3);
        queue.submit(0);
        queue.submit(1);
        assert!(!queue.retract(0), "slot 0 is not the tail");
        assert!(queue.retract(1));
        assert_eq!(queue.drain(), Some(0));
        assert_eq!(queue.drain(), None);
    }
}
