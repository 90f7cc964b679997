use crate::metrics::backend::{MetricsBackend, RequeueKind, SyncOutcome};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_sync_started(&self, _: &str) {}

    #[inline(always)]
    fn record_sync_completed(&self, _: &str, _: SyncOutcome, _: u64) {}

    #[inline(always)]
    fn record_requeue(&self, _: &str, _: RequeueKind) {}

    #[inline(always)]
    fn record_queue_depth(&self, _: &str, _: usize) {}
}
