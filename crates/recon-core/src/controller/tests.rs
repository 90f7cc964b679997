use std::{
    collections::HashSet,
    future::{Ready, ready},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use recon_model::{BackoffStrategy, Labels, ObjectMeta, meta_namespace_key};
use recon_queue::{ExponentialRateLimiter, RateLimiter};
use tokio::{
    sync::{Notify, Semaphore},
    task::JoinHandle,
    time::{Instant, sleep, timeout},
};
use tokio_util::sync::CancellationToken;

use crate::{
    ControllerFactory, MemorySource,
    controller::Controller,
    error::ControllerError,
    metrics::{MetricsBackend, RequeueKind, SyncOutcome},
    recorder::{InMemoryRecorder, NoopRecorder},
    sync::{SyncContext, SyncError, SyncFn, SyncResult},
};

#[derive(Debug, Clone)]
struct Secret {
    ns: String,
    name: String,
    labels: Labels,
}

impl Secret {
    fn new(ns: &str, name: &str) -> Self {
        Self {
            ns: ns.into(),
            name: name.into(),
            labels: Labels::new(),
        }
    }

    fn labeled(ns: &str, name: &str, key: &str, val: &str) -> Self {
        let mut s = Self::new(ns, name);
        s.labels.insert(key, val);
        s
    }
}

impl ObjectMeta for Secret {
    fn namespace(&self) -> Option<&str> {
        Some(&self.ns)
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn labels(&self) -> &Labels {
        &self.labels
    }
}

type Keys = Arc<Mutex<Vec<String>>>;

fn recording(keys: Keys) -> impl Fn(SyncContext) -> Ready<SyncResult> + Send + Sync + 'static {
    move |ctx| {
        keys.lock().unwrap().push(ctx.queue_key().to_string());
        ready(Ok(()))
    }
}

fn spawn_run(c: &Arc<Controller>, token: &CancellationToken, workers: usize) -> JoinHandle<Result<(), ControllerError>> {
    let c = Arc::clone(c);
    let token = token.clone();
    tokio::spawn(async move { c.run(token, workers).await })
}

async fn stop(token: CancellationToken, h: JoinHandle<Result<(), ControllerError>>) {
    token.cancel();
    timeout(Duration::from_secs(5), h)
        .await
        .expect("run did not return after cancel")
        .unwrap()
        .unwrap();
}

#[derive(Default)]
struct CountingMetrics {
    started: AtomicUsize,
    depth_samples: AtomicUsize,
    outcomes: Mutex<Vec<SyncOutcome>>,
    requeues: Mutex<Vec<RequeueKind>>,
}

impl MetricsBackend for CountingMetrics {
    fn record_sync_started(&self, controller: &str) {
        assert_eq!(controller, "metered");
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn record_sync_completed(&self, _: &str, outcome: SyncOutcome, _: u64) {
        self.outcomes.lock().unwrap().push(outcome);
    }

    fn record_requeue(&self, _: &str, kind: RequeueKind) {
        self.requeues.lock().unwrap().push(kind);
    }

    fn record_queue_depth(&self, _: &str, _: usize) {
        self.depth_samples.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn resync_triggers_periodic_syncs() {
    let keys = Keys::default();
    let c = ControllerFactory::new()
        .resync_every(Duration::from_millis(100))
        .with_sync("count", recording(keys.clone()))
        .to_controller("periodic-controller", Arc::new(NoopRecorder))
        .unwrap();
    let c = Arc::new(c);
    let token = CancellationToken::new();

    let h = spawn_run(&c, &token, 1);
    sleep(Duration::from_secs(1)).await;
    stop(token, h).await;

    let keys = keys.lock().unwrap();
    assert!(keys.len() >= 3, "expected at least 3 resyncs, got {}", keys.len());
    assert!(keys.iter().all(|k| k == "key"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn all_workers_finish_before_run_returns() {
    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));

    let c = {
        let started = started.clone();
        let finished = finished.clone();
        ControllerFactory::new()
            .resync_every(Duration::from_secs(60))
            .with_sync("slow", move |ctx: SyncContext| {
                let started = started.clone();
                let finished = finished.clone();
                async move {
                    if ctx.is_default_key() {
                        for i in 1..=4 {
                            ctx.queue().add(format!("TestKey{i}"));
                        }
                    }
                    started.fetch_add(1, Ordering::SeqCst);
                    ctx.cancelled().await;
                    sleep(Duration::from_millis(50)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    SyncResult::Ok(())
                }
            })
            .to_controller("multi-worker-controller", Arc::new(NoopRecorder))
            .unwrap()
    };
    let c = Arc::new(c);

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 5);

    timeout(Duration::from_secs(5), async {
        while started.load(Ordering::SeqCst) < 5 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("every worker should be busy");
    assert!(c.queue().is_empty());

    stop(token, h).await;
    assert_eq!(finished.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn source_notifications_use_default_key() {
    let src = Arc::new(MemorySource::<Secret>::new("secrets"));
    src.mark_synced();
    let keys = Keys::default();
    let c = ControllerFactory::new()
        .with_event_sources([src.clone()])
        .with_sync("record", recording(keys.clone()))
        .to_controller("informer-controller", Arc::new(NoopRecorder))
        .unwrap();
    let c = Arc::new(c);
    let token = CancellationToken::new();

    let h = spawn_run(&c, &token, 1);
    sleep(Duration::from_millis(200)).await;
    src.create(Secret::new("test", "test-secret")).unwrap();
    sleep(Duration::from_millis(200)).await;
    stop(token, h).await;

    assert_eq!(*keys.lock().unwrap(), vec!["key".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn custom_key_is_delivered_once() {
    let src = Arc::new(MemorySource::<Secret>::new("secrets"));
    src.mark_synced();
    let keys = Keys::default();
    let c = ControllerFactory::new()
        .with_event_sources_key_fn(|s: &Secret| meta_namespace_key(s), [src.clone()])
        .with_sync("record", recording(keys.clone()))
        .to_controller("queue-function-controller", Arc::new(NoopRecorder))
        .unwrap();
    let c = Arc::new(c);
    src.create(Secret::new("test", "test-secret")).unwrap();

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 1);
    sleep(Duration::from_millis(500)).await;
    stop(token, h).await;

    assert_eq!(*keys.lock().unwrap(), vec!["test/test-secret".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn failing_key_is_retried_after_backoff() {
    let limiter = Arc::new(
        ExponentialRateLimiter::new(BackoffStrategy {
            first_ms: 100,
            ..Default::default()
        })
        .unwrap(),
    );
    let recorder = Arc::new(InMemoryRecorder::new("retry-controller"));
    let times = Arc::new(Mutex::new(Vec::<Instant>::new()));

    let c = {
        let times = times.clone();
        ControllerFactory::new()
            .with_rate_limiter(limiter.clone())
            .with_sync("flaky", move |_ctx: SyncContext| {
                let mut t = times.lock().unwrap();
                t.push(Instant::now());
                let res = if t.len() <= 2 {
                    Err(SyncError::fail("not yet"))
                } else {
                    Ok(())
                };
                ready(res)
            })
            .to_controller("retry-controller", recorder.clone())
            .unwrap()
    };
    let c = Arc::new(c);
    c.queue().add("a");

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 1);
    sleep(Duration::from_secs(2)).await;
    stop(token, h).await;

    let times = times.lock().unwrap();
    assert_eq!(times.len(), 3);
    assert!(times[1] - times[0] >= Duration::from_millis(100));
    assert!(times[2] - times[1] >= Duration::from_millis(200));
    assert_eq!(limiter.num_requeues("a"), 0, "success forgets the key");

    let warnings = recorder.warnings();
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0].reason, "SyncFailed");
    assert!(warnings[0].message.contains("not yet"));
    assert!(warnings[0].message.contains("\"a\""));
}

#[tokio::test(start_paused = true)]
async fn adds_during_processing_coalesce() {
    let count = Arc::new(AtomicUsize::new(0));
    let in_flight = Arc::new(Notify::new());
    let gate = Arc::new(Semaphore::new(0));

    let c = {
        let count = count.clone();
        let in_flight = in_flight.clone();
        let gate = gate.clone();
        ControllerFactory::new()
            .with_sync("gated", move |_ctx: SyncContext| {
                let n = count.fetch_add(1, Ordering::SeqCst) + 1;
                let in_flight = in_flight.clone();
                let gate = gate.clone();
                async move {
                    if n == 1 {
                        in_flight.notify_one();
                        if let Ok(p) = gate.acquire().await {
                            p.forget();
                        }
                    }
                    SyncResult::Ok(())
                }
            })
            .to_controller("coalescing-controller", Arc::new(NoopRecorder))
            .unwrap()
    };
    let c = Arc::new(c);
    let q = c.queue();
    q.add("a");

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 2);
    in_flight.notified().await;
    for _ in 0..10 {
        q.add("a");
    }
    gate.add_permits(1);
    sleep(Duration::from_millis(500)).await;
    stop(token, h).await;

    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn a_key_is_never_processed_concurrently() {
    let in_flight = Arc::new(Mutex::new(HashSet::<String>::new()));
    let violations = Arc::new(AtomicUsize::new(0));
    let processed = Keys::default();

    let c = {
        let in_flight = in_flight.clone();
        let violations = violations.clone();
        let processed = processed.clone();
        ControllerFactory::new()
            .with_sync("exclusive", move |ctx: SyncContext| {
                let in_flight = in_flight.clone();
                let violations = violations.clone();
                let processed = processed.clone();
                async move {
                    let key = ctx.queue_key().to_string();
                    if !in_flight.lock().unwrap().insert(key.clone()) {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }
                    sleep(Duration::from_millis(5)).await;
                    in_flight.lock().unwrap().remove(&key);
                    processed.lock().unwrap().push(key);
                    SyncResult::Ok(())
                }
            })
            .to_controller("exclusive-controller", Arc::new(NoopRecorder))
            .unwrap()
    };
    let c = Arc::new(c);
    let q = c.queue();

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 4);
    for _ in 0..20 {
        for k in ["a", "b", "c"] {
            q.add(k);
        }
        sleep(Duration::from_millis(3)).await;
    }
    sleep(Duration::from_millis(100)).await;
    stop(token, h).await;

    assert_eq!(violations.load(Ordering::SeqCst), 0);
    let processed = processed.lock().unwrap();
    for k in ["a", "b", "c"] {
        assert!(processed.iter().any(|p| p == k), "{k} never processed");
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_sync_does_not_kill_the_worker() {
    let recorder = Arc::new(InMemoryRecorder::new("panic-controller"));
    let keys = Keys::default();

    let c = {
        let keys = keys.clone();
        ControllerFactory::new()
            .with_sync("panicky", move |ctx: SyncContext| {
                if ctx.queue_key() == "boom" {
                    panic!("boom");
                }
                keys.lock().unwrap().push(ctx.queue_key().to_string());
                ready(SyncResult::Ok(()))
            })
            .to_controller("panic-controller", recorder.clone())
            .unwrap()
    };
    let c = Arc::new(c);
    c.queue().add("boom");
    c.queue().add("ok");

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 1);
    sleep(Duration::from_millis(100)).await;
    stop(token, h).await;

    assert_eq!(*keys.lock().unwrap(), vec!["ok".to_string()]);
    let warnings = recorder.warnings();
    assert!(!warnings.is_empty());
    assert!(warnings[0].message.contains("sync panicked: boom"));
}

#[tokio::test]
async fn zero_workers_is_rejected() {
    let c = ControllerFactory::new()
        .with_sync("noop", recording(Keys::default()))
        .to_controller("c", Arc::new(NoopRecorder))
        .unwrap();

    let res = c.run(CancellationToken::new(), 0).await;
    assert!(matches!(res, Err(ControllerError::InvalidWorkers(0))));
    assert!(!c.queue().is_shutting_down());
}

#[tokio::test(start_paused = true)]
async fn second_run_is_rejected() {
    let c = ControllerFactory::new()
        .with_sync("noop", recording(Keys::default()))
        .to_controller("once", Arc::new(NoopRecorder))
        .unwrap();
    let c = Arc::new(c);
    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 1);
    sleep(Duration::from_millis(10)).await;

    let res = c.run(CancellationToken::new(), 1).await;
    assert!(matches!(res, Err(ControllerError::AlreadyStarted(ref n)) if n == "once"));

    stop(token, h).await;
}

#[tokio::test(start_paused = true)]
async fn workers_wait_for_sources_to_sync() {
    let src = Arc::new(MemorySource::<Secret>::new("secrets"));
    src.create(Secret::new("ns", "a")).unwrap();
    let keys = Keys::default();
    let c = ControllerFactory::new()
        .with_event_sources([src.clone()])
        .with_sync("record", recording(keys.clone()))
        .to_controller("waiting-controller", Arc::new(NoopRecorder))
        .unwrap();
    let c = Arc::new(c);

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 1);
    sleep(Duration::from_millis(350)).await;
    assert!(keys.lock().unwrap().is_empty());

    src.mark_synced();
    sleep(Duration::from_millis(250)).await;
    stop(token, h).await;

    assert_eq!(*keys.lock().unwrap(), vec!["key".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn unsynced_source_times_out() {
    let src = Arc::new(MemorySource::<Secret>::new("secrets"));
    let c = ControllerFactory::new()
        .with_event_sources([src])
        .with_cache_sync_timeout(Duration::from_millis(500))
        .with_sync("record", recording(Keys::default()))
        .to_controller("timeout-controller", Arc::new(NoopRecorder))
        .unwrap();

    let err = c.run(CancellationToken::new(), 1).await.unwrap_err();
    match err {
        ControllerError::CacheSyncTimeout { controller, pending, .. } => {
            assert_eq!(controller, "timeout-controller");
            assert_eq!(pending, vec!["secrets".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(c.queue().is_shutting_down());
}

#[tokio::test(start_paused = true)]
async fn cancel_while_waiting_for_sources() {
    let src = Arc::new(MemorySource::<Secret>::new("secrets"));
    let keys = Keys::default();
    let c = ControllerFactory::new()
        .with_event_sources([src])
        .with_sync("record", recording(keys.clone()))
        .to_controller("cancel-controller", Arc::new(NoopRecorder))
        .unwrap();
    let c = Arc::new(c);

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 1);
    sleep(Duration::from_millis(200)).await;
    stop(token, h).await;

    assert!(keys.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn filtered_sources_skip_irrelevant_objects() {
    let src = Arc::new(MemorySource::<Secret>::new("secrets"));
    src.mark_synced();
    let keys = Keys::default();
    let c = ControllerFactory::new()
        .with_filtered_event_sources(|s: &Secret| s.labels.get("app") == Some("demo"), [src.clone()])
        .with_sync("record", recording(keys.clone()))
        .to_controller("filtered-controller", Arc::new(NoopRecorder))
        .unwrap();
    let c = Arc::new(c);

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 1);
    sleep(Duration::from_millis(150)).await;

    src.create(Secret::new("ns", "other")).unwrap();
    sleep(Duration::from_millis(100)).await;
    assert!(keys.lock().unwrap().is_empty());

    src.create(Secret::labeled("ns", "mine", "app", "demo")).unwrap();
    sleep(Duration::from_millis(100)).await;
    stop(token, h).await;

    assert_eq!(*keys.lock().unwrap(), vec!["key".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn bare_sources_only_gate_startup() {
    let src = Arc::new(MemorySource::<Secret>::new("secrets"));
    let keys = Keys::default();
    let c = ControllerFactory::new()
        .with_bare_event_sources([src.clone()])
        .resync_every(Duration::from_secs(60))
        .with_sync("record", recording(keys.clone()))
        .to_controller("bare-controller", Arc::new(NoopRecorder))
        .unwrap();
    let c = Arc::new(c);

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 1);
    sleep(Duration::from_millis(300)).await;
    assert!(keys.lock().unwrap().is_empty());

    src.mark_synced();
    sleep(Duration::from_millis(200)).await;
    src.create(Secret::new("ns", "ignored")).unwrap();
    sleep(Duration::from_millis(200)).await;
    stop(token, h).await;

    assert_eq!(*keys.lock().unwrap(), vec!["key".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn sync_can_requeue_its_own_key() {
    let count = Arc::new(AtomicUsize::new(0));
    let c = {
        let count = count.clone();
        ControllerFactory::new()
            .with_sync("self-add", move |ctx: SyncContext| {
                if count.fetch_add(1, Ordering::SeqCst) == 0 {
                    ctx.queue().add(ctx.queue_key());
                }
                ready(SyncResult::Ok(()))
            })
            .to_controller("self-add-controller", Arc::new(NoopRecorder))
            .unwrap()
    };
    let c = Arc::new(c);
    c.queue().add("a");

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 2);
    sleep(Duration::from_millis(200)).await;
    stop(token, h).await;

    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn explicit_requeue_uses_requested_delay() {
    let metrics = Arc::new(CountingMetrics::default());
    let recorder = Arc::new(InMemoryRecorder::new("metered"));
    let times = Arc::new(Mutex::new(Vec::<Instant>::new()));

    let c = {
        let times = times.clone();
        ControllerFactory::new()
            .with_metrics(metrics.clone())
            .with_sync("requeue", move |_ctx: SyncContext| {
                let mut t = times.lock().unwrap();
                t.push(Instant::now());
                let res = if t.len() == 1 {
                    Err(SyncError::requeue_after(Duration::from_millis(300)))
                } else {
                    Ok(())
                };
                ready(res)
            })
            .to_controller("metered", recorder.clone())
            .unwrap()
    };
    let c = Arc::new(c);
    c.queue().add("a");

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 1);
    sleep(Duration::from_secs(1)).await;
    stop(token, h).await;

    let times = times.lock().unwrap();
    assert_eq!(times.len(), 2);
    assert!(times[1] - times[0] >= Duration::from_millis(300));
    assert!(recorder.warnings().is_empty());

    assert_eq!(metrics.started.load(Ordering::SeqCst), 2);
    assert_eq!(metrics.depth_samples.load(Ordering::SeqCst), 2);
    assert_eq!(
        *metrics.outcomes.lock().unwrap(),
        vec![SyncOutcome::Requeued, SyncOutcome::Success]
    );
    assert_eq!(*metrics.requeues.lock().unwrap(), vec![RequeueKind::Delayed]);
}

#[tokio::test(start_paused = true)]
async fn post_start_hooks_run_and_are_joined() {
    let recorder = Arc::new(InMemoryRecorder::new("hooked"));
    let hook_saw_cancel = Arc::new(AtomicBool::new(false));

    let announce = SyncFn::arc("announce", |ctx: SyncContext| async move {
        ctx.recorder().event("HookRan", "post start");
        SyncResult::Ok(())
    });
    let waiter = {
        let flag = hook_saw_cancel.clone();
        SyncFn::arc("waiter", move |ctx: SyncContext| {
            let flag = flag.clone();
            async move {
                ctx.cancelled().await;
                sleep(Duration::from_millis(20)).await;
                flag.store(true, Ordering::SeqCst);
                SyncResult::Ok(())
            }
        })
    };
    let failing = SyncFn::arc("failing", |_ctx: SyncContext| async {
        SyncResult::Err(SyncError::fail("hook error"))
    });

    let c = ControllerFactory::new()
        .with_sync("noop", recording(Keys::default()))
        .with_post_start_hook(announce)
        .with_post_start_hook(waiter)
        .with_post_start_hook(failing)
        .to_controller("hooked", recorder.clone())
        .unwrap();
    let c = Arc::new(c);

    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 1);
    sleep(Duration::from_millis(50)).await;
    stop(token, h).await;

    assert!(hook_saw_cancel.load(Ordering::SeqCst));
    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].reason, "HookRan");
}

#[tokio::test]
async fn direct_sync_uses_the_reconciler() {
    let keys = Keys::default();
    let c = ControllerFactory::new()
        .with_sync("record", recording(keys.clone()))
        .to_controller("direct", Arc::new(NoopRecorder))
        .unwrap();

    let ctx = c.new_context("ns/x", CancellationToken::new());
    c.sync(ctx).await.unwrap();
    assert_eq!(*keys.lock().unwrap(), vec!["ns/x".to_string()]);
}

/// Delays every retry for as long as a `Duration` can express.
struct UnboundedLimiter;

impl RateLimiter for UnboundedLimiter {
    fn when(&self, _key: &str) -> Duration {
        Duration::MAX
    }

    fn forget(&self, _key: &str) {}

    fn num_requeues(&self, _key: &str) -> u32 {
        0
    }
}

#[tokio::test(start_paused = true)]
async fn oversized_retry_delay_keeps_worker_alive() {
    let keys = Keys::default();
    let c = {
        let keys = keys.clone();
        ControllerFactory::new()
            .with_rate_limiter(Arc::new(UnboundedLimiter))
            .with_sync("picky", move |ctx: SyncContext| {
                keys.lock().unwrap().push(ctx.queue_key().to_string());
                let res = if ctx.queue_key() == "bad" {
                    Err(SyncError::fail("always broken"))
                } else {
                    Ok(())
                };
                ready(res)
            })
            .to_controller("unbounded-controller", Arc::new(NoopRecorder))
            .unwrap()
    };
    let c = Arc::new(c);
    let token = CancellationToken::new();
    let h = spawn_run(&c, &token, 1);

    c.queue().add("bad");
    sleep(Duration::from_secs(2)).await;
    c.queue().add("good");
    sleep(Duration::from_secs(2)).await;
    stop(token, h).await;

    assert_eq!(*keys.lock().unwrap(), vec!["bad".to_string(), "good".to_string()]);
}
