use std::sync::Arc;

use recon_model::QueueKey;
use recon_queue::WorkQueue;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    metrics::{MetricsHandle, RequeueKind, SyncOutcome},
    recorder::RecorderHandle,
    sync::{SyncError, SyncInvoker},
};

/// One pull-process-complete loop over the controller's queue.
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) controller: Arc<str>,
    pub(crate) queue: WorkQueue,
    pub(crate) invoker: Arc<SyncInvoker>,
    pub(crate) recorder: RecorderHandle,
    pub(crate) metrics: MetricsHandle,
}

impl Worker {
    /// Process keys until the token is cancelled or the queue reports shutdown.
    ///
    /// An invocation that is already running when the token fires is finished, never aborted.
    pub(crate) async fn run(self, token: CancellationToken) {
        debug!(controller = %self.controller, worker = self.id, "worker started");
        while !token.is_cancelled() {
            let Some(key) = self.queue.get().await else {
                break;
            };
            self.process(key, &token).await;
        }
        debug!(controller = %self.controller, worker = self.id, "worker stopped");
    }

    async fn process(&self, key: QueueKey, token: &CancellationToken) {
        let name = self.controller.as_ref();
        self.metrics.record_queue_depth(name, self.queue.len());
        self.metrics.record_sync_started(name);
        trace!(controller = %name, worker = self.id, %key, "sync started");

        let started = Instant::now();
        let result = self.invoker.invoke(&key, token).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let outcome = match result {
            Ok(()) => {
                self.queue.forget(&key);
                trace!(controller = %name, worker = self.id, %key, duration_ms, "sync succeeded");
                SyncOutcome::Success
            }
            Err(SyncError::Requeue { after }) => {
                let delay_ms = u64::try_from(after.as_millis()).unwrap_or(u64::MAX);
                debug!(controller = %name, worker = self.id, %key, delay_ms, "requeue requested");
                self.queue.add_after(key.clone(), after);
                self.metrics.record_requeue(name, RequeueKind::Delayed);
                SyncOutcome::Requeued
            }
            Err(err) if err.is_failure() => {
                let requeues = self.queue.num_requeues(&key);
                warn!(controller = %name, worker = self.id, %key, requeues, error = %err, "sync failed");
                self.recorder.warning(
                    "SyncFailed",
                    &format!("{name:?} controller failed to sync {key:?}, err: {err}"),
                );
                self.queue.add_rate_limited(key.clone());
                self.metrics.record_requeue(name, RequeueKind::RateLimited);
                SyncOutcome::Failure
            }
            Err(err) => {
                debug!(controller = %name, worker = self.id, %key, error = %err, "sync canceled");
                self.queue.add_rate_limited(key.clone());
                self.metrics.record_requeue(name, RequeueKind::RateLimited);
                SyncOutcome::Canceled
            }
        };

        self.metrics.record_sync_completed(name, outcome, duration_ms);
        self.queue.done(&key);
    }
}
