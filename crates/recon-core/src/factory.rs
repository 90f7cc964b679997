//! Builder for [`Controller`].
use std::{
    future::Future,
    sync::{Arc, atomic::AtomicBool},
    time::Duration,
};

use recon_model::{ControllerConfig, KeyError, QueueKey};
use recon_queue::{RateLimiterHandle, WorkQueue, default_controller_rate_limiter};
use tracing::debug;

use crate::{
    controller::Controller,
    error::ControllerError,
    map::to_rate_limiter,
    metrics::{MetricsHandle, noop_metrics},
    recorder::RecorderHandle,
    source::{
        EventSource, FilterFn, KeysFn, default_keys_fn,
        registration::{Binding, Registration, SourceRegistration},
    },
    sync::{ReconcilerRef, SyncContext, SyncFn, SyncInvoker, SyncResult},
};

/// Default upper bound for waiting on event sources before workers start.
pub const DEFAULT_CACHE_SYNC_TIMEOUT: Duration = Duration::from_secs(600);

/// Step-by-step controller configuration.
///
/// Nothing is validated until [`ControllerFactory::to_controller`].
///
/// # Example
/// ```
/// use std::{sync::Arc, time::Duration};
/// use recon_core::{ControllerFactory, NoopRecorder, SyncContext, SyncResult};
///
/// let controller = ControllerFactory::new()
///     .resync_every(Duration::from_secs(30))
///     .with_sync("periodic", |_ctx: SyncContext| async { SyncResult::Ok(()) })
///     .to_controller("periodic-controller", Arc::new(NoopRecorder))
///     .unwrap();
/// assert_eq!(controller.name(), "periodic-controller");
/// ```
pub struct ControllerFactory {
    resync_every: Option<Duration>,
    registrations: Vec<Box<dyn Registration>>,
    reconciler: Option<ReconcilerRef>,
    rate_limiter: Option<RateLimiterHandle>,
    metrics: MetricsHandle,
    post_start_hooks: Vec<ReconcilerRef>,
    cache_sync_timeout: Duration,
}

impl Default for ControllerFactory {
    fn default() -> Self {
        Self {
            resync_every: None,
            registrations: Vec::new(),
            reconciler: None,
            rate_limiter: None,
            metrics: noop_metrics(),
            post_start_hooks: Vec::new(),
            cache_sync_timeout: DEFAULT_CACHE_SYNC_TIMEOUT,
        }
    }
}

impl ControllerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed resync period, rate limiting and cache-sync timeout from a validated config.
    pub fn from_config(cfg: &ControllerConfig) -> Result<Self, ControllerError> {
        cfg.validate()?;
        Ok(Self {
            resync_every: cfg.resync_period(),
            rate_limiter: Some(to_rate_limiter(&cfg.backoff, cfg.bucket.as_ref())?),
            cache_sync_timeout: cfg.cache_sync_timeout(),
            ..Self::default()
        })
    }

    /// Enqueue the default key once at start and then every `period`.
    pub fn resync_every(mut self, period: Duration) -> Self {
        self.resync_every = Some(period);
        self
    }

    /// Every notification from `sources` enqueues the default key.
    pub fn with_event_sources<S>(self, sources: impl IntoIterator<Item = Arc<S>>) -> Self
    where
        S: EventSource,
    {
        self.push_sources(sources, || Binding::Keys {
            keys_fn: default_keys_fn(),
            filter: None,
        })
    }

    /// Notifications enqueue the key computed by `key_fn`.
    pub fn with_event_sources_key_fn<S, F>(self, key_fn: F, sources: impl IntoIterator<Item = Arc<S>>) -> Self
    where
        S: EventSource,
        F: Fn(&S::Object) -> Result<QueueKey, KeyError> + Send + Sync + 'static,
    {
        let keys_fn: KeysFn<S::Object> = Arc::new(move |obj: &S::Object| key_fn(obj).map(|k| vec![k]));
        self.push_sources(sources, || Binding::Keys {
            keys_fn: Arc::clone(&keys_fn),
            filter: None,
        })
    }

    /// Notifications enqueue every key computed by `keys_fn`.
    pub fn with_event_sources_keys_fn<S, F>(self, keys_fn: F, sources: impl IntoIterator<Item = Arc<S>>) -> Self
    where
        S: EventSource,
        F: Fn(&S::Object) -> Result<Vec<QueueKey>, KeyError> + Send + Sync + 'static,
    {
        let keys_fn: KeysFn<S::Object> = Arc::new(keys_fn);
        self.push_sources(sources, || Binding::Keys {
            keys_fn: Arc::clone(&keys_fn),
            filter: None,
        })
    }

    /// Like [`Self::with_event_sources`], but only objects passing `filter` enqueue.
    pub fn with_filtered_event_sources<S, F>(self, filter: F, sources: impl IntoIterator<Item = Arc<S>>) -> Self
    where
        S: EventSource,
        F: Fn(&S::Object) -> bool + Send + Sync + 'static,
    {
        let filter: FilterFn<S::Object> = Arc::new(filter);
        self.push_sources(sources, || Binding::Keys {
            keys_fn: default_keys_fn(),
            filter: Some(Arc::clone(&filter)),
        })
    }

    /// Sources that only gate startup on their readiness; their notifications are ignored.
    pub fn with_bare_event_sources<S>(self, sources: impl IntoIterator<Item = Arc<S>>) -> Self
    where
        S: EventSource,
    {
        self.push_sources(sources, || Binding::Bare)
    }

    /// Use an async closure as the sync function.
    pub fn with_sync<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(SyncContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SyncResult> + Send + 'static,
    {
        self.with_reconciler(SyncFn::arc(name, f))
    }

    pub fn with_reconciler(mut self, reconciler: ReconcilerRef) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    /// Replace the default rate limiter used for failed keys.
    pub fn with_rate_limiter(mut self, limiter: RateLimiterHandle) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Run `hook` once after workers have started. Failures are logged.
    pub fn with_post_start_hook(mut self, hook: ReconcilerRef) -> Self {
        self.post_start_hooks.push(hook);
        self
    }

    pub fn with_cache_sync_timeout(mut self, timeout: Duration) -> Self {
        self.cache_sync_timeout = timeout;
        self
    }

    /// Validate the configuration, create the queue and register all sources.
    pub fn to_controller(
        self,
        name: impl Into<String>,
        recorder: RecorderHandle,
    ) -> Result<Controller, ControllerError> {
        let name: String = name.into();
        if name.trim().is_empty() {
            return Err(ControllerError::InvalidConfig("controller name must not be empty".into()));
        }
        let reconciler = self
            .reconciler
            .ok_or_else(|| ControllerError::MissingSync(name.clone()))?;
        if self.resync_every.is_some_and(|p| p.is_zero()) {
            return Err(ControllerError::InvalidConfig("resync period must be positive".into()));
        }
        if self.cache_sync_timeout.is_zero() {
            return Err(ControllerError::InvalidConfig("cache sync timeout must be positive".into()));
        }

        let limiter = self.rate_limiter.unwrap_or_else(default_controller_rate_limiter);
        let queue = WorkQueue::with_rate_limiter(name.clone(), limiter);
        let handle = queue.handle();
        for r in &self.registrations {
            r.register(&handle);
        }

        let name: Arc<str> = Arc::from(name);
        let invoker = SyncInvoker::new(Arc::clone(&name), reconciler, handle, Arc::clone(&recorder));
        debug!(
            controller = %name,
            sources = self.registrations.len(),
            resync_ms = self.resync_every.map(|p| u64::try_from(p.as_millis()).unwrap_or(u64::MAX)),
            hooks = self.post_start_hooks.len(),
            "controller built"
        );

        Ok(Controller {
            name,
            queue,
            invoker: Arc::new(invoker),
            registrations: self.registrations,
            resync_every: self.resync_every,
            cache_sync_timeout: self.cache_sync_timeout,
            post_start_hooks: self.post_start_hooks,
            recorder,
            metrics: self.metrics,
            started: AtomicBool::new(false),
        })
    }

    fn push_sources<S, B>(mut self, sources: impl IntoIterator<Item = Arc<S>>, binding: B) -> Self
    where
        S: EventSource,
        B: Fn() -> Binding<S::Object>,
    {
        for source in sources {
            self.registrations
                .push(Box::new(SourceRegistration::new(source, binding())));
        }
        self
    }
}
