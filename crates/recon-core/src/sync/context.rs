use std::fmt;

use recon_model::{DEFAULT_QUEUE_KEY, QueueKey};
use recon_queue::QueueHandle;
use tokio_util::sync::CancellationToken;

use crate::recorder::RecorderHandle;

/// Per-invocation context handed to a [`super::Reconciler`].
pub struct SyncContext {
    key: QueueKey,
    queue: QueueHandle,
    token: CancellationToken,
    recorder: RecorderHandle,
}

impl SyncContext {
    pub fn new(
        key: impl Into<QueueKey>,
        queue: QueueHandle,
        token: CancellationToken,
        recorder: RecorderHandle,
    ) -> Self {
        Self {
            key: key.into(),
            queue,
            token,
            recorder,
        }
    }

    /// Producer handle of the controller's queue.
    pub fn queue(&self) -> &QueueHandle {
        &self.queue
    }

    /// Key being synced.
    pub fn queue_key(&self) -> &str {
        &self.key
    }

    /// Whether this invocation was triggered by the default key (resync or an unkeyed source).
    pub fn is_default_key(&self) -> bool {
        self.key == DEFAULT_QUEUE_KEY
    }

    pub fn recorder(&self) -> &RecorderHandle {
        &self.recorder
    }

    /// Run-scoped cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the controller is shutting down.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("key", &self.key)
            .field("queue", &self.queue.name())
            .field("recorder", &self.recorder.component())
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl fmt::Display for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.queue.name(), self.key)
    }
}
