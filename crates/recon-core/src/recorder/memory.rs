use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{EventRecorder, EventType, RecordedEvent};

/// Recorder that keeps every event in memory, in order.
///
/// Intended for tests and for embedding applications that poll events themselves.
#[derive(Debug)]
pub struct InMemoryRecorder {
    component: String,
    events: Mutex<Vec<RecordedEvent>>,
}

impl InMemoryRecorder {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every recorded event.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    /// Snapshot of warning events only.
    pub fn warnings(&self) -> Vec<RecordedEvent> {
        self.lock()
            .iter()
            .filter(|e| e.kind == EventType::Warning)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, kind: EventType, reason: &str, message: &str) {
        self.lock().push(RecordedEvent {
            component: self.component.clone(),
            kind,
            reason: reason.to_string(),
            message: message.to_string(),
        });
    }
}

impl EventRecorder for InMemoryRecorder {
    fn component(&self) -> &str {
        &self.component
    }

    fn event(&self, reason: &str, message: &str) {
        self.push(EventType::Normal, reason, message);
    }

    fn warning(&self, reason: &str, message: &str) {
        self.push(EventType::Warning, reason, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_events_in_order() {
        let r = InMemoryRecorder::new("periodic-controller");
        r.event("Started", "controller started");
        r.warning("SyncFailed", "boom");

        let events = r.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventType::Normal);
        assert_eq!(events[0].component, "periodic-controller");
        assert_eq!(events[1].reason, "SyncFailed");
        assert_eq!(events[1].message, "boom");
    }

    #[test]
    fn warnings_filters_normal_events() {
        let r = InMemoryRecorder::new("c");
        r.event("A", "a");
        r.warning("B", "b");

        let w = r.warnings();
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].reason, "B");
        assert_eq!(EventType::Warning.to_string(), "Warning");
    }
}
