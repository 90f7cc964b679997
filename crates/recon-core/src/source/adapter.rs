use std::sync::Arc;

use recon_model::{DEFAULT_QUEUE_KEY, QueueKey};
use recon_queue::QueueHandle;
use tracing::{trace, warn};

use super::{EventHandler, FilterFn, KeysFn};

/// Key function that maps every object to [`DEFAULT_QUEUE_KEY`].
pub fn default_keys_fn<O>() -> KeysFn<O> {
    Arc::new(|_: &O| Ok(vec![QueueKey::from(DEFAULT_QUEUE_KEY)]))
}

/// Event handler that converts notifications into work keys.
///
/// Filtering follows level-triggered semantics for updates:
/// - both versions pass: keys of the new object;
/// - only the new version passes: treated as an add of the new object;
/// - only the old version passes: treated as a delete of the old object;
/// - neither passes: dropped.
pub struct EventAdapter<O> {
    source: String,
    queue: QueueHandle,
    keys_fn: KeysFn<O>,
    filter: Option<FilterFn<O>>,
}

impl<O> EventAdapter<O> {
    pub fn new(
        source: impl Into<String>,
        queue: QueueHandle,
        keys_fn: KeysFn<O>,
        filter: Option<FilterFn<O>>,
    ) -> Self {
        Self {
            source: source.into(),
            queue,
            keys_fn,
            filter,
        }
    }

    fn passes(&self, obj: &O) -> bool {
        self.filter.as_ref().is_none_or(|f| f(obj))
    }

    fn enqueue(&self, obj: &O, event: &'static str) {
        match (self.keys_fn)(obj) {
            Ok(keys) => {
                for key in keys {
                    trace!(source = %self.source, queue = %self.queue.name(), %key, event, "enqueue");
                    self.queue.add(key);
                }
            }
            Err(err) => {
                warn!(source = %self.source, event, error = %err, "failed to extract work key, notification dropped");
            }
        }
    }
}

impl<O: Send + Sync + 'static> EventHandler<O> for EventAdapter<O> {
    fn on_add(&self, obj: &O) {
        if self.passes(obj) {
            self.enqueue(obj, "add");
        }
    }

    fn on_update(&self, old: &O, new: &O) {
        if self.filter.is_none() {
            self.enqueue(new, "update");
            return;
        }
        match (self.passes(old), self.passes(new)) {
            (true, true) => self.enqueue(new, "update"),
            (false, true) => self.enqueue(new, "add"),
            (true, false) => self.enqueue(old, "delete"),
            (false, false) => {}
        }
    }

    fn on_delete(&self, obj: &O) {
        if self.passes(obj) {
            self.enqueue(obj, "delete");
        }
    }
}
