//! Metrics collection abstraction for controllers.
//!
//! Backends (prometheus, statsd, etc) implement [`MetricsBackend`] and are injected via
//! [`crate::ControllerFactory::with_metrics`]. Every recording call is labelled with the
//! controller name, so one backend can serve many controllers.
mod backend;
pub use backend::{MetricsBackend, MetricsHandle, RequeueKind, SyncOutcome};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
