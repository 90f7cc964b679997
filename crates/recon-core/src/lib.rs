pub mod controller;
pub mod error;
pub mod factory;
pub mod map;
pub mod metrics;
pub mod recorder;
pub mod source;
pub mod sync;

pub use controller::Controller;
pub use error::ControllerError;
pub use factory::{ControllerFactory, DEFAULT_CACHE_SYNC_TIMEOUT};
pub use metrics::{MetricsBackend, MetricsHandle, NoOpMetrics, RequeueKind, SyncOutcome, noop_metrics};
pub use recorder::{EventRecorder, EventType, InMemoryRecorder, NoopRecorder, RecordedEvent, RecorderHandle};
pub use source::{EventAdapter, EventHandler, EventSource, FilterFn, KeysFn, MemorySource, SourceError};
pub use sync::{Reconciler, ReconcilerRef, SyncContext, SyncError, SyncFn, SyncInvoker, SyncResult};

pub use recon_model::{DEFAULT_QUEUE_KEY, QueueKey};
pub use recon_queue::{QueueHandle, RateLimiter, RateLimiterHandle, WorkQueue};

pub mod prelude {
    pub use crate::controller::Controller;
    pub use crate::error::ControllerError;
    pub use crate::factory::ControllerFactory;
    pub use crate::recorder::{EventRecorder, RecorderHandle};
    pub use crate::source::{EventHandler, EventSource};
    pub use crate::sync::{Reconciler, SyncContext, SyncError, SyncResult};
    pub use recon_model::{DEFAULT_QUEUE_KEY, QueueKey};
    pub use tokio_util::sync::CancellationToken;
}
