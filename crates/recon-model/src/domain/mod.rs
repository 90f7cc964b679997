mod key;
pub use key::{KeyError, meta_namespace_key, split_meta_namespace_key};

mod labels;
pub use labels::Labels;

mod object;
pub use object::ObjectMeta;

/// Opaque identifier of one unit of reconciliation work.
///
/// Keys are compared by value; the work queue never hands out the same key to two workers at once.
pub type QueueKey = String;

/// Sentinel key used by the resync timer and by sources registered without a key function.
///
/// A handler receiving this key should reconcile "everything" rather than a single object.
pub const DEFAULT_QUEUE_KEY: &str = "key";
