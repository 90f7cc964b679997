//! `tracing`-backed controller event recorder.
use recon_core::EventRecorder;
use tracing::{info, warn};

/// Emits recorder events as log lines.
///
/// Normal events are logged at `info`, warnings at `warn`. Both carry `component` and
/// `reason` fields.
#[derive(Debug, Clone)]
pub struct TracingRecorder {
    component: String,
}

impl TracingRecorder {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }
}

impl EventRecorder for TracingRecorder {
    fn component(&self) -> &str {
        &self.component
    }

    fn event(&self, reason: &str, message: &str) {
        info!(target: "recon::events", component = %self.component, reason, "{message}");
    }

    fn warning(&self, reason: &str, message: &str) {
        warn!(target: "recon::events", component = %self.component, reason, "{message}");
    }
}
