//! Sync function contract and its invocation.
use std::{future::Future, sync::Arc};

use async_trait::async_trait;

mod context;
pub use context::SyncContext;

mod error;
pub use error::{SyncError, SyncResult};

mod invoker;
pub use invoker::SyncInvoker;

/// User-supplied, idempotent reconciliation logic.
///
/// Called with a fresh [`SyncContext`] for every key a worker takes from the queue. The same
/// key is never synced concurrently with itself; different keys may be.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn sync(&self, ctx: SyncContext) -> SyncResult;
}

/// Shared handle to a reconciler.
pub type ReconcilerRef = Arc<dyn Reconciler>;

/// Adapter turning an async closure into a [`Reconciler`].
///
/// # Example
/// ```
/// use recon_core::{Reconciler, SyncContext, SyncFn, SyncResult};
///
/// let r = SyncFn::arc("echo", |ctx: SyncContext| async move {
///     println!("syncing {}", ctx.queue_key());
///     SyncResult::Ok(())
/// });
/// assert_eq!(r.name(), "echo");
/// ```
pub struct SyncFn<F> {
    name: String,
    f: F,
}

impl<F, Fut> SyncFn<F>
where
    F: Fn(SyncContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SyncResult> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Create and wrap into a shared handle.
    pub fn arc(name: impl Into<String>, f: F) -> ReconcilerRef {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Reconciler for SyncFn<F>
where
    F: Fn(SyncContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SyncResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn sync(&self, ctx: SyncContext) -> SyncResult {
        (self.f)(ctx).await
    }
}
