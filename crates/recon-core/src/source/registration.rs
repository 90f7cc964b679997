use std::sync::Arc;

use recon_queue::QueueHandle;
use tracing::debug;

use super::{EventAdapter, EventSource, FilterFn, KeysFn};

/// Type-erased view of a source registered with a controller.
pub(crate) trait Registration: Send + Sync {
    fn source_name(&self) -> &str;

    /// Attach the key adapter (if any) to the source, feeding `queue`.
    fn register(&self, queue: &QueueHandle);

    fn has_synced(&self) -> bool;
}

pub(crate) enum Binding<O> {
    /// Notifications become keys.
    Keys {
        keys_fn: KeysFn<O>,
        filter: Option<FilterFn<O>>,
    },
    /// Only readiness is tracked.
    Bare,
}

pub(crate) struct SourceRegistration<S: EventSource> {
    source: Arc<S>,
    binding: Binding<S::Object>,
}

impl<S: EventSource> SourceRegistration<S> {
    pub(crate) fn new(source: Arc<S>, binding: Binding<S::Object>) -> Self {
        Self { source, binding }
    }
}

impl<S: EventSource> Registration for SourceRegistration<S> {
    fn source_name(&self) -> &str {
        self.source.name()
    }

    fn register(&self, queue: &QueueHandle) {
        match &self.binding {
            Binding::Keys { keys_fn, filter } => {
                debug!(source = %self.source.name(), queue = %queue.name(), filtered = filter.is_some(), "registering event handler");
                let adapter = EventAdapter::new(
                    self.source.name(),
                    queue.clone(),
                    Arc::clone(keys_fn),
                    filter.clone(),
                );
                self.source.add_handler(Arc::new(adapter));
            }
            Binding::Bare => {
                debug!(source = %self.source.name(), "bare source, readiness only");
            }
        }
    }

    fn has_synced(&self) -> bool {
        self.source.has_synced()
    }
}
