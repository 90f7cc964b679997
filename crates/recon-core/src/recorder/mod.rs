//! Event recording contract.
//!
//! Controllers surface handler failures as `(reason, message)` events. Where those
//! events end up (logs, an audit store, a cluster API) is decided by the recorder
//! injected into [`crate::ControllerFactory::to_controller`].
use std::{fmt, sync::Arc};

mod memory;
pub use memory::InMemoryRecorder;

/// Severity of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Normal => f.write_str("Normal"),
            EventType::Warning => f.write_str("Warning"),
        }
    }
}

/// One event as captured by [`InMemoryRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub component: String,
    pub kind: EventType,
    pub reason: String,
    pub message: String,
}

/// Sink for controller events.
///
/// Implementations must be cheap and non-blocking: they are called from worker tasks.
pub trait EventRecorder: Send + Sync + 'static {
    /// Component the events are attributed to.
    fn component(&self) -> &str;

    /// Record a normal (informational) event.
    fn event(&self, reason: &str, message: &str);

    /// Record a warning event.
    fn warning(&self, reason: &str, message: &str);
}

/// Shared handle to an event recorder.
pub type RecorderHandle = Arc<dyn EventRecorder>;

/// Recorder that drops every event.
#[derive(Debug, Clone, Default)]
pub struct NoopRecorder;

impl EventRecorder for NoopRecorder {
    fn component(&self) -> &str {
        "noop"
    }

    fn event(&self, _: &str, _: &str) {}

    fn warning(&self, _: &str, _: &str) {}
}
