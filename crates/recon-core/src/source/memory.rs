use std::{
    collections::BTreeMap,
    sync::{
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use recon_model::{ObjectMeta, QueueKey, meta_namespace_key};
use tracing::trace;

use super::{EventHandler, EventSource, SourceError};

type HandlerRef<O> = Arc<dyn EventHandler<O>>;

/// In-memory object store that acts as an event source.
///
/// Objects are keyed by [`meta_namespace_key`]. Every mutation is delivered synchronously to
/// the registered handlers after the store lock is released. A handler added after objects
/// exist receives an `on_add` for each of them.
pub struct MemorySource<O> {
    name: String,
    objects: RwLock<BTreeMap<QueueKey, O>>,
    handlers: RwLock<Vec<HandlerRef<O>>>,
    synced: AtomicBool,
}

impl<O> MemorySource<O>
where
    O: ObjectMeta + Clone + Send + Sync + 'static,
{
    /// Create an empty, not yet synced source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(BTreeMap::new()),
            handlers: RwLock::new(Vec::new()),
            synced: AtomicBool::new(false),
        }
    }

    /// Report the initial listing as complete.
    pub fn mark_synced(&self) {
        self.synced.store(true, Ordering::Release);
    }

    /// Insert a new object. Fails if the key is taken.
    pub fn create(&self, obj: O) -> Result<(), SourceError> {
        let key = meta_namespace_key(&obj)?;
        {
            let mut objects = self.write_objects();
            if objects.contains_key(&key) {
                return Err(SourceError::AlreadyExists(key));
            }
            objects.insert(key.clone(), obj.clone());
        }
        trace!(source = %self.name, %key, "object created");
        for h in self.handlers() {
            h.on_add(&obj);
        }
        Ok(())
    }

    /// Replace an existing object, returning the previous version.
    pub fn update(&self, obj: O) -> Result<O, SourceError> {
        let key = meta_namespace_key(&obj)?;
        let old = {
            let mut objects = self.write_objects();
            match objects.get_mut(&key) {
                Some(slot) => std::mem::replace(slot, obj.clone()),
                None => return Err(SourceError::NotFound(key)),
            }
        };
        trace!(source = %self.name, %key, "object updated");
        for h in self.handlers() {
            h.on_update(&old, &obj);
        }
        Ok(old)
    }

    /// Create or update depending on whether the key exists.
    pub fn upsert(&self, obj: O) -> Result<(), SourceError> {
        let key = meta_namespace_key(&obj)?;
        let old = self.write_objects().insert(key.clone(), obj.clone());
        trace!(source = %self.name, %key, existed = old.is_some(), "object upserted");
        for h in self.handlers() {
            match &old {
                Some(prev) => h.on_update(prev, &obj),
                None => h.on_add(&obj),
            }
        }
        Ok(())
    }

    /// Remove the object stored under `key`.
    pub fn delete(&self, key: &str) -> Result<O, SourceError> {
        let removed = self
            .write_objects()
            .remove(key)
            .ok_or_else(|| SourceError::NotFound(key.to_string()))?;
        trace!(source = %self.name, %key, "object deleted");
        for h in self.handlers() {
            h.on_delete(&removed);
        }
        Ok(removed)
    }

    pub fn get(&self, key: &str) -> Option<O> {
        self.read_objects().get(key).cloned()
    }

    /// All objects, ordered by key.
    pub fn list(&self) -> Vec<O> {
        self.read_objects().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read_objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_objects().is_empty()
    }

    fn handlers(&self) -> Vec<HandlerRef<O>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn read_objects(&self) -> RwLockReadGuard<'_, BTreeMap<QueueKey, O>> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_objects(&self) -> RwLockWriteGuard<'_, BTreeMap<QueueKey, O>> {
        self.objects.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<O> EventSource for MemorySource<O>
where
    O: ObjectMeta + Clone + Send + Sync + 'static,
{
    type Object = O;

    fn name(&self) -> &str {
        &self.name
    }

    fn add_handler(&self, handler: Arc<dyn EventHandler<O>>) {
        // Snapshot while holding the handler list so a concurrent mutation is seen either
        // in the replay or through the new handler.
        let existing = {
            let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
            let snapshot = self.list();
            handlers.push(Arc::clone(&handler));
            snapshot
        };
        for obj in &existing {
            handler.on_add(obj);
        }
    }

    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }
}

impl<O> std::fmt::Debug for MemorySource<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySource")
            .field("name", &self.name)
            .field("synced", &self.synced.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
