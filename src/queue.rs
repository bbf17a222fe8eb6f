//! Bounded FIFO notification queue: holds readings a monitored item
//! has decided to report until a publish cycle drains them.

use std::collections::VecDeque;

use crate::types::DataValue;

/// A bounded queue of pending notifications for one monitored item.
///
/// `capacity` is always at least 1. When full, new entries either evict
/// the oldest entry (`discard_oldest`) or overwrite the newest
/// (`!discard_oldest`); either way the surviving entry that witnessed the
/// drop has its status promoted to `GoodWithOverflowBit` and
/// [`NotificationQueue::has_overflowed`] latches until the next drain.
#[derive(Debug, Clone)]
pub(crate) struct NotificationQueue {
    capacity: usize,
    entries: VecDeque<DataValue>,
    overflowed: bool,
}

impl NotificationQueue {
    /// Create an empty queue. `capacity` is clamped to at least 1; the
    /// [`crate::normalize::ParameterNormaliser`] is expected to have
    /// already clamped it into server limits before this is called.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
            overflowed: false,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` if an entry has been dropped since the last
    /// [`NotificationQueue::extract`].
    pub(crate) fn has_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Push a new reading, applying the overflow discipline if full.
    pub(crate) fn push(&mut self, value: DataValue, discard_oldest: bool) {
        if self.capacity == 1 {
            // Fast path: single-slot queue is always an overwrite, and
            // never itself counts as an overflow.
            self.entries.clear();
            self.entries.push_back(value);
            return;
        }

        if self.entries.len() < self.capacity {
            self.entries.push_back(value);
            return;
        }

        self.overflowed = true;
        if discard_oldest {
            self.entries.pop_front();
            self.entries.push_back(value);
            if let Some(front) = self.entries.front_mut() {
                front.status = front.status.with_overflow_bit();
            }
        } else {
            let mut value = value;
            value.status = value.status.with_overflow_bit();
            if let Some(back) = self.entries.back_mut() {
                *back = value;
            } else {
                self.entries.push_back(value);
            }
        }
    }

    /// Drain and return all pending notifications, in FIFO order,
    /// clearing the overflow latch.
    pub(crate) fn extract(&mut self) -> Vec<DataValue> {
        self.overflowed = false;
        self.entries.drain(..).collect()
    }

    /// Resize the queue to a new capacity, as happens when `modify`
    /// changes `queue_size` on a live item.
    ///
    /// Shrinking with `discard_oldest` drops from the front, keeping the
    /// most recent readings; shrinking with `!discard_oldest` truncates
    /// from the back for the same reason, since the newest entry always
    /// lives at the back regardless of discipline. Shrinking to exactly 1
    /// downgrades any overflow marking, since a single-slot queue can no
    /// longer distinguish "replaced" from "overflowed".
    pub(crate) fn resize(&mut self, new_capacity: usize, discard_oldest: bool) {
        let new_capacity = new_capacity.max(1);
        if new_capacity < self.entries.len() {
            if discard_oldest {
                while self.entries.len() > new_capacity {
                    self.entries.pop_front();
                }
            } else {
                self.entries.truncate(new_capacity);
            }
        }
        self.capacity = new_capacity;
        if self.capacity == 1 {
            if let Some(only) = self.entries.back_mut() {
                only.status = only.status.without_overflow_bit();
            }
            self.overflowed = false;
        }
    }
}
