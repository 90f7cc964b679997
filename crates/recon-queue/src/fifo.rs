use std::collections::{HashSet, VecDeque};

use recon_model::QueueKey;

/// Synchronous core of the work queue.
///
/// Invariants:
/// - every key in `queue` is also in `dirty`;
/// - a key is never in `queue` and `processing` at the same time;
/// - a key in `dirty` and `processing` is re-queued on `done`.
#[derive(Debug, Default)]
pub(crate) struct Fifo {
    queue: VecDeque<QueueKey>,
    dirty: HashSet<QueueKey>,
    processing: HashSet<QueueKey>,
    shutting_down: bool,
}

impl Fifo {
    /// Returns `true` if the key became available to a getter.
    pub(crate) fn add(&mut self, key: QueueKey) -> bool {
        if self.shutting_down || self.dirty.contains(&key) {
            return false;
        }
        self.dirty.insert(key.clone());
        if self.processing.contains(&key) {
            return false;
        }
        self.queue.push_back(key);
        true
    }

    pub(crate) fn pop(&mut self) -> Option<QueueKey> {
        let key = self.queue.pop_front()?;
        self.dirty.remove(&key);
        self.processing.insert(key.clone());
        Some(key)
    }

    /// Returns `true` if the key was dirtied while in flight and is queued again.
    pub(crate) fn done(&mut self, key: &str) -> bool {
        if !self.processing.remove(key) {
            return false;
        }
        if self.dirty.contains(key) {
            self.queue.push_back(key.to_string());
            return true;
        }
        false
    }

    pub(crate) fn shut_down(&mut self) {
        self.shutting_down = true;
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }
}
