use std::{fmt, sync::Arc, time::Duration};

use recon_model::QueueKey;

use crate::queue::Shared;

/// Producer-side view of a [`crate::WorkQueue`].
///
/// Event adapters, the resync timer and sync handlers only ever enqueue keys;
/// this handle exposes exactly that and nothing that could take a key out of
/// the queue or shut it down.
#[derive(Clone)]
pub struct QueueHandle {
    shared: Arc<Shared>,
}

impl QueueHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Name of the underlying queue.
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// See [`crate::WorkQueue::add`].
    pub fn add(&self, key: impl Into<QueueKey>) {
        self.shared.add(key.into());
    }

    /// See [`crate::WorkQueue::add_after`].
    pub fn add_after(&self, key: impl Into<QueueKey>, delay: Duration) {
        self.shared.add_after(key.into(), delay);
    }

    /// See [`crate::WorkQueue::add_rate_limited`].
    pub fn add_rate_limited(&self, key: impl Into<QueueKey>) {
        self.shared.add_rate_limited(key.into());
    }

    /// Number of keys waiting to be handed out.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.is_shutting_down()
    }
}

impl fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueHandle")
            .field("name", &self.name())
            .field("len", &self.len())
            .finish()
    }
}
