use std::sync::Arc;

/// Outcome of one sync invocation, for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Sync returned `Ok`.
    Success,
    /// Sync failed (error or panic) and the key was requeued with backoff.
    Failure,
    /// Sync observed cancellation and gave up.
    Canceled,
    /// Sync asked for an explicit delayed requeue.
    Requeued,
}

impl SyncOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            SyncOutcome::Success => "success",
            SyncOutcome::Failure => "failure",
            SyncOutcome::Canceled => "canceled",
            SyncOutcome::Requeued => "requeued",
        }
    }
}

/// Why a key was put back into the queue by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueKind {
    /// Delay chosen by the rate limiter.
    RateLimited,
    /// Fixed delay requested by the sync function.
    Delayed,
}

impl RequeueKind {
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            RequeueKind::RateLimited => "rate_limited",
            RequeueKind::Delayed => "delayed",
        }
    }
}

/// Backend metrics collection interface.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record that a worker took a key and is about to invoke the sync function.
    fn record_sync_started(&self, controller: &str);
    /// Record sync completion with outcome and duration.
    ///
    /// # Arguments
    /// - `controller`: controller name
    /// - `outcome`: how the invocation ended
    /// - `duration_ms`: wall time of the invocation in milliseconds
    fn record_sync_completed(&self, controller: &str, outcome: SyncOutcome, duration_ms: u64);
    /// Record a worker-initiated requeue.
    fn record_requeue(&self, controller: &str, kind: RequeueKind);
    /// Record the number of keys waiting in the queue, sampled whenever a worker takes a key.
    fn record_queue_depth(&self, controller: &str, depth: usize);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
