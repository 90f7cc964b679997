//! Controller runtime.
//!
//! [`Controller::run`] waits for every event source to report synced, then spawns the
//! worker pool, the resync timer and post-start hooks. Cancellation shuts the queue down,
//! lets in-flight invocations finish and joins everything before returning.
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use recon_model::DEFAULT_QUEUE_KEY;
use recon_queue::{QueueHandle, WorkQueue};
use tokio::{
    task::JoinSet,
    time::{Instant, MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    error::ControllerError,
    metrics::MetricsHandle,
    recorder::RecorderHandle,
    source::registration::Registration,
    sync::{ReconcilerRef, SyncContext, SyncInvoker, SyncResult},
};

mod resync;
use resync::ResyncTimer;

mod worker;
use worker::Worker;

#[cfg(test)]
mod tests;

/// How often source readiness is polled before workers start.
pub const CACHE_SYNC_POLL: Duration = Duration::from_millis(100);

/// A configured controller, produced by [`crate::ControllerFactory::to_controller`].
pub struct Controller {
    pub(crate) name: Arc<str>,
    pub(crate) queue: WorkQueue,
    pub(crate) invoker: Arc<SyncInvoker>,
    pub(crate) registrations: Vec<Box<dyn Registration>>,
    pub(crate) resync_every: Option<Duration>,
    pub(crate) cache_sync_timeout: Duration,
    pub(crate) post_start_hooks: Vec<ReconcilerRef>,
    pub(crate) recorder: RecorderHandle,
    pub(crate) metrics: MetricsHandle,
    pub(crate) started: AtomicBool,
}

impl Controller {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Producer handle of the controller's queue.
    pub fn queue(&self) -> QueueHandle {
        self.queue.handle()
    }

    /// Context for a direct [`Controller::sync`] call.
    pub fn new_context(&self, key: &str, token: CancellationToken) -> SyncContext {
        self.invoker.context(key, token)
    }

    /// Invoke the sync function once, outside the worker pool.
    pub async fn sync(&self, ctx: SyncContext) -> SyncResult {
        self.invoker.call(ctx).await
    }

    /// Run the controller until `cancel` fires.
    ///
    /// Returns only after every worker, the resync timer and every post-start hook has
    /// exited. A controller runs at most once.
    #[instrument(level = "info", skip(self, cancel), fields(controller = %self.name))]
    pub async fn run(&self, cancel: CancellationToken, workers: usize) -> Result<(), ControllerError> {
        if workers == 0 {
            return Err(ControllerError::InvalidWorkers(workers));
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ControllerError::AlreadyStarted(self.name.to_string()));
        }

        info!(workers, sources = self.registrations.len(), "starting controller");
        match self.wait_for_sources(&cancel).await {
            Ok(true) => {}
            Ok(false) => {
                self.queue.shut_down();
                info!("canceled while waiting for event sources to sync");
                return Ok(());
            }
            Err(e) => {
                self.queue.shut_down();
                return Err(e);
            }
        }

        let token = cancel.child_token();
        let mut tasks = JoinSet::new();

        for id in 1..=workers {
            let worker = Worker {
                id,
                controller: Arc::clone(&self.name),
                queue: self.queue.clone(),
                invoker: Arc::clone(&self.invoker),
                recorder: Arc::clone(&self.recorder),
                metrics: Arc::clone(&self.metrics),
            };
            tasks.spawn(worker.run(token.clone()));
        }

        if let Some(period) = self.resync_every {
            let timer = ResyncTimer::new(Arc::clone(&self.name), self.queue.handle(), period);
            tasks.spawn(timer.run(token.clone()));
        }

        for hook in &self.post_start_hooks {
            let hook = Arc::clone(hook);
            let ctx = self.invoker.context(DEFAULT_QUEUE_KEY, token.clone());
            let controller = Arc::clone(&self.name);
            tasks.spawn(async move {
                if let Err(err) = hook.sync(ctx).await {
                    warn!(%controller, hook = %hook.name(), error = %err, "post-start hook failed");
                }
            });
        }

        cancel.cancelled().await;
        info!("shutting down controller");
        self.queue.shut_down();
        token.cancel();

        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "controller task ended abnormally");
            }
        }
        info!("controller stopped");
        Ok(())
    }

    /// Poll source readiness. `Ok(false)` means cancelled while waiting.
    async fn wait_for_sources(&self, cancel: &CancellationToken) -> Result<bool, ControllerError> {
        if self.registrations.is_empty() {
            return Ok(true);
        }
        let deadline = Instant::now() + self.cache_sync_timeout;
        let mut tick = interval(CACHE_SYNC_POLL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(false),
                _ = tick.tick() => {}
            }
            let pending = self.pending_sources();
            if pending.is_empty() {
                debug!("event sources synced");
                return Ok(true);
            }
            if Instant::now() >= deadline {
                warn!(?pending, "timed out waiting for event sources to sync");
                return Err(ControllerError::CacheSyncTimeout {
                    controller: self.name.to_string(),
                    timeout_ms: u64::try_from(self.cache_sync_timeout.as_millis()).unwrap_or(u64::MAX),
                    pending,
                });
            }
            trace!(?pending, "waiting for event sources to sync");
        }
    }

    fn pending_sources(&self) -> Vec<String> {
        self.registrations
            .iter()
            .filter(|r| !r.has_synced())
            .map(|r| r.source_name().to_string())
            .collect()
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("queue", &self.queue)
            .field("sources", &self.registrations.len())
            .field("resync_every", &self.resync_every)
            .field("post_start_hooks", &self.post_start_hooks.len())
            .field("started", &self.started.load(Ordering::Relaxed))
            .finish()
    }
}
