//! Event sources and their adaptation into work keys.
//!
//! An [`EventSource`] delivers add/update/delete notifications to registered
//! [`EventHandler`]s. The controller registers one [`EventAdapter`] per source at build
//! time; the adapter turns every notification into zero or more work keys and pushes them
//! into the work queue.
use std::sync::Arc;

use recon_model::{KeyError, QueueKey};

mod adapter;
pub use adapter::{EventAdapter, default_keys_fn};

mod error;
pub use error::SourceError;

mod memory;
pub use memory::MemorySource;

pub(crate) mod registration;

/// Receiver of change notifications.
pub trait EventHandler<O>: Send + Sync + 'static {
    fn on_add(&self, obj: &O);
    fn on_update(&self, old: &O, new: &O);
    fn on_delete(&self, obj: &O);
}

/// Producer of change notifications about objects of one type.
pub trait EventSource: Send + Sync + 'static {
    type Object: Send + Sync + 'static;

    /// Name used in logs and cache-sync diagnostics.
    fn name(&self) -> &str;

    /// Subscribe a handler to every future notification.
    fn add_handler(&self, handler: Arc<dyn EventHandler<Self::Object>>);

    /// Whether the source finished its initial listing.
    fn has_synced(&self) -> bool;
}

/// Maps an object to the work keys it affects.
pub type KeysFn<O> = Arc<dyn Fn(&O) -> Result<Vec<QueueKey>, KeyError> + Send + Sync>;

/// Decides whether a notification about an object is relevant at all.
pub type FilterFn<O> = Arc<dyn Fn(&O) -> bool + Send + Sync>;
