use std::sync::Arc;

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntGaugeVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use recon_core::{MetricsBackend, RequeueKind, SyncOutcome};

const NAMESPACE: &str = "recon";

/// Prometheus metrics for controllers.
///
/// Every series is labelled by controller name. Other labels are bounded:
/// - `outcome`: "success", "failure", "canceled", "requeued"
/// - `kind`: "rate_limited", "delayed"
#[derive(Clone)]
pub struct PrometheusMetrics {
    syncs_started: CounterVec,
    syncs_completed: CounterVec,
    sync_duration: HistogramVec,
    requeues: CounterVec,
    queue_depth: IntGaugeVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Register all controller metrics in `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let syncs_started = CounterVec::new(
            Opts::new("syncs_started_total", "Sync invocations started").namespace(NAMESPACE),
            &["controller"],
        )?;
        registry.register(Box::new(syncs_started.clone()))?;

        let syncs_completed = CounterVec::new(
            Opts::new("syncs_completed_total", "Sync invocations completed, by outcome")
                .namespace(NAMESPACE),
            &["controller", "outcome"],
        )?;
        registry.register(Box::new(syncs_completed.clone()))?;

        let sync_duration = HistogramVec::new(
            HistogramOpts::new("sync_duration_seconds", "Sync invocation wall time in seconds")
                .namespace(NAMESPACE)
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
            &["controller"],
        )?;
        registry.register(Box::new(sync_duration.clone()))?;

        let requeues = CounterVec::new(
            Opts::new("requeues_total", "Keys put back into the queue by workers")
                .namespace(NAMESPACE),
            &["controller", "kind"],
        )?;
        registry.register(Box::new(requeues.clone()))?;

        let queue_depth = IntGaugeVec::new(
            Opts::new("queue_depth", "Keys waiting in the work queue").namespace(NAMESPACE),
            &["controller"],
        )?;
        registry.register(Box::new(queue_depth.clone()))?;

        Ok(Self {
            syncs_started,
            syncs_completed,
            sync_duration,
            requeues,
            queue_depth,
            registry,
        })
    }

    /// Create a backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Snapshot of every registered metric family.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition format, ready to serve on `/metrics`.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_sync_started(&self, controller: &str) {
        self.syncs_started.with_label_values(&[controller]).inc();
    }

    fn record_sync_completed(&self, controller: &str, outcome: SyncOutcome, duration_ms: u64) {
        self.syncs_completed
            .with_label_values(&[controller, outcome.as_label()])
            .inc();
        self.sync_duration
            .with_label_values(&[controller])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_requeue(&self, controller: &str, kind: RequeueKind) {
        self.requeues
            .with_label_values(&[controller, kind.as_label()])
            .inc();
    }

    fn record_queue_depth(&self, controller: &str, depth: usize) {
        self.queue_depth
            .with_label_values(&[controller])
            .set(i64::try_from(depth).unwrap_or(i64::MAX));
    }
}
