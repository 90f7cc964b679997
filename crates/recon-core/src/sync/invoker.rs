use std::{any::Any, sync::Arc};

use recon_queue::QueueHandle;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, trace};

use super::{ReconcilerRef, SyncContext, SyncError, SyncResult};
use crate::recorder::RecorderHandle;

/// Builds a [`SyncContext`] per key and runs the reconciler with it.
///
/// Each invocation runs on its own task and is awaited by the caller, so a panic inside the
/// reconciler surfaces as [`SyncError::Fail`] instead of unwinding through the worker.
pub struct SyncInvoker {
    controller: Arc<str>,
    reconciler: ReconcilerRef,
    queue: QueueHandle,
    recorder: RecorderHandle,
}

impl SyncInvoker {
    pub fn new(
        controller: impl Into<Arc<str>>,
        reconciler: ReconcilerRef,
        queue: QueueHandle,
        recorder: RecorderHandle,
    ) -> Self {
        Self {
            controller: controller.into(),
            reconciler,
            queue,
            recorder,
        }
    }

    /// Fresh context for `key`.
    pub fn context(&self, key: &str, token: CancellationToken) -> SyncContext {
        SyncContext::new(key, self.queue.clone(), token, Arc::clone(&self.recorder))
    }

    /// Invoke the reconciler for `key`.
    #[instrument(level = "debug", skip(self, token), fields(controller = %self.controller, reconciler = %self.reconciler.name()))]
    pub async fn invoke(&self, key: &str, token: &CancellationToken) -> SyncResult {
        self.call(self.context(key, token.clone())).await
    }

    /// Invoke the reconciler with a prepared context.
    pub async fn call(&self, ctx: SyncContext) -> SyncResult {
        let reconciler = Arc::clone(&self.reconciler);
        let res = tokio::spawn(async move { reconciler.sync(ctx).await }).await;
        match res {
            Ok(out) => {
                trace!(ok = out.is_ok(), "sync returned");
                out
            }
            Err(e) if e.is_panic() => Err(SyncError::fail(format!(
                "sync panicked: {}",
                panic_message(&*e.into_panic())
            ))),
            Err(e) => Err(SyncError::fail(format!("sync task aborted: {e}"))),
        }
    }
}

impl std::fmt::Debug for SyncInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncInvoker")
            .field("controller", &self.controller)
            .field("reconciler", &self.reconciler.name())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
