use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use recon_model::QueueKey;
use tokio::{runtime::Handle, sync::Notify, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::{
    fifo::Fifo,
    handle::QueueHandle,
    limiter::{RateLimiterHandle, default_controller_rate_limiter},
};

/// Longest delay `add_after` honours; larger delays are clamped to it.
pub const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// State shared by a [`WorkQueue`] and all of its [`QueueHandle`]s.
pub(crate) struct Shared {
    name: String,
    fifo: Mutex<Fifo>,
    ready: Notify,
    limiter: RateLimiterHandle,
    /// Deadline of every key currently parked by `add_after`.
    waiting: Mutex<HashMap<QueueKey, Instant>>,
    stop: CancellationToken,
}

impl Shared {
    fn fifo(&self) -> MutexGuard<'_, Fifo> {
        self.fifo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn waiting(&self) -> MutexGuard<'_, HashMap<QueueKey, Instant>> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn add(&self, key: QueueKey) {
        let queued = self.fifo().add(key);
        if queued {
            self.ready.notify_one();
        }
    }

    pub(crate) fn add_after(self: &Arc<Self>, key: QueueKey, delay: Duration) {
        if self.is_shutting_down() {
            return;
        }
        if delay.is_zero() {
            self.add(key);
            return;
        }
        let Ok(rt) = Handle::try_current() else {
            warn!(queue = %self.name, key = %key, "no tokio runtime for delayed add; adding now");
            self.add(key);
            return;
        };

        let delay = delay.min(MAX_DELAY);
        let deadline = Instant::now() + delay;
        {
            let mut waiting = self.waiting();
            if let Some(existing) = waiting.get(&key) {
                if *existing <= deadline {
                    trace!(queue = %self.name, key = %key, "key already waiting with an earlier deadline");
                    return;
                }
            }
            waiting.insert(key.clone(), deadline);
        }
        trace!(queue = %self.name, key = %key, delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "key parked");

        let shared = Arc::clone(self);
        rt.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    let due = {
                        let mut waiting = shared.waiting();
                        // A superseding add_after replaced the deadline; its own timer owns the key now.
                        if waiting.get(&key) == Some(&deadline) {
                            waiting.remove(&key);
                            true
                        } else {
                            false
                        }
                    };
                    if due {
                        shared.add(key);
                    }
                }
                _ = shared.stop.cancelled() => {}
            }
        });
    }

    pub(crate) fn add_rate_limited(self: &Arc<Self>, key: QueueKey) {
        let delay = self.limiter.when(&key);
        self.add_after(key, delay);
    }

    pub(crate) fn len(&self) -> usize {
        self.fifo().len()
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.fifo().is_shutting_down()
    }
}

/// Deduplicating, rate-limited queue of work keys.
///
/// `WorkQueue` is the consumer side: only the worker pool should call [`WorkQueue::get`],
/// [`WorkQueue::done`], [`WorkQueue::forget`] and [`WorkQueue::shut_down`].
/// Producers get a [`QueueHandle`] via [`WorkQueue::handle`].
///
/// Cloning is cheap; clones share the same queue.
#[derive(Clone)]
pub struct WorkQueue {
    shared: Arc<Shared>,
}

impl WorkQueue {
    /// Create a queue with the default controller rate limiter.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_rate_limiter(name, default_controller_rate_limiter())
    }

    /// Create a queue with an explicit rate limiter.
    pub fn with_rate_limiter(name: impl Into<String>, limiter: RateLimiterHandle) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                fifo: Mutex::new(Fifo::default()),
                ready: Notify::new(),
                limiter,
                waiting: Mutex::new(HashMap::new()),
                stop: CancellationToken::new(),
            }),
        }
    }

    /// Queue name used in logs and metrics.
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Producer-side handle sharing this queue.
    pub fn handle(&self) -> QueueHandle {
        QueueHandle::new(Arc::clone(&self.shared))
    }

    /// Queue `key` unless it is already queued; defer it if it is in flight.
    ///
    /// No-op after [`WorkQueue::shut_down`].
    pub fn add(&self, key: impl Into<QueueKey>) {
        self.shared.add(key.into());
    }

    /// Queue `key` once `delay` has elapsed.
    ///
    /// While a key is parked, a later deadline is ignored and an earlier one replaces it.
    /// Parked keys are dropped on shutdown.
    pub fn add_after(&self, key: impl Into<QueueKey>, delay: Duration) {
        self.shared.add_after(key.into(), delay);
    }

    /// Queue `key` after the delay chosen by the rate limiter.
    pub fn add_rate_limited(&self, key: impl Into<QueueKey>) {
        self.shared.add_rate_limited(key.into());
    }

    /// Reset the rate limiter's state for `key`.
    pub fn forget(&self, key: &str) {
        self.shared.limiter.forget(key);
    }

    /// Failures recorded by the rate limiter for `key`.
    pub fn num_requeues(&self, key: &str) -> u32 {
        self.shared.limiter.num_requeues(key)
    }

    /// Wait for the next key.
    ///
    /// Returns `None` once the queue is shut down and every queued key has been handed out.
    /// The returned key is in flight until [`WorkQueue::done`] is called for it.
    pub async fn get(&self) -> Option<QueueKey> {
        let ready = self.shared.ready.notified();
        tokio::pin!(ready);

        loop {
            // Register before inspecting the queue so an add racing with us is not missed.
            ready.as_mut().enable();
            {
                let mut fifo = self.shared.fifo();
                if let Some(key) = fifo.pop() {
                    return Some(key);
                }
                if fifo.is_shutting_down() {
                    return None;
                }
            }
            ready.as_mut().await;
            ready.set(self.shared.ready.notified());
        }
    }

    /// Mark `key` as no longer in flight, re-queueing it if it was added meanwhile.
    pub fn done(&self, key: &str) {
        let requeued = self.shared.fifo().done(key);
        if requeued {
            self.shared.ready.notify_one();
        }
    }

    /// Number of keys waiting to be handed out (in-flight and parked keys excluded).
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting keys and wake every waiting getter.
    pub fn shut_down(&self) {
        self.shared.fifo().shut_down();
        self.shared.waiting().clear();
        self.shared.stop.cancel();
        self.shared.ready.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.is_shutting_down()
    }
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("name", &self.shared.name)
            .field("len", &self.len())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}
