//! Prometheus backend for controller metrics.
//!
//! [`PrometheusMetrics`] implements [`recon_core::MetricsBackend`]; hand it to
//! [`recon_core::ControllerFactory::with_metrics`] and expose [`PrometheusMetrics::gather`]
//! (or [`PrometheusMetrics::encode_text`]) from whatever HTTP stack the process already runs.
//!
//! ```rust
//! use std::sync::Arc;
//! use recon_core::{ControllerFactory, NoopRecorder, SyncContext, SyncResult};
//! use recon_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let controller = ControllerFactory::new()
//!     .with_metrics(Arc::new(metrics.clone()))
//!     .with_sync("noop", |_ctx: SyncContext| async { SyncResult::Ok(()) })
//!     .to_controller("example", Arc::new(NoopRecorder))?;
//! # let _ = controller;
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `recon_syncs_started_total{controller}` - Counter
//! - `recon_syncs_completed_total{controller, outcome}` - Counter
//! - `recon_sync_duration_seconds{controller}` - Histogram
//! - `recon_requeues_total{controller, kind}` - Counter
//! - `recon_queue_depth{controller}` - Gauge

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
