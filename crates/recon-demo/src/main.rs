use std::{sync::Arc, time::Duration};

use recon_core::{ControllerFactory, MemorySource};
use recon_model::{Labels, meta_namespace_key};
use recon_observe::{TracingRecorder, init_logger};
use recon_prometheus::PrometheusMetrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod config;
use config::AppConfig;

mod secret;
use secret::{Secret, SecretReconciler};

const CONTROLLER_NAME: &str = "secret-controller";

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) config + logger
    let cfg = AppConfig::load()?;
    init_logger(&cfg.logger)?;
    info!(workers = cfg.controller.workers, "config loaded");

    // 2) metrics
    let metrics = PrometheusMetrics::new()?;

    // 3) event source
    let secrets = Arc::new(MemorySource::<Secret>::new("secrets"));

    // 4) controller
    let controller = ControllerFactory::from_config(&cfg.controller)?
        .with_event_sources_key_fn(|s: &Secret| meta_namespace_key(s), [secrets.clone()])
        .with_reconciler(Arc::new(SecretReconciler::new(secrets.clone())))
        .with_metrics(Arc::new(metrics.clone()))
        .to_controller(CONTROLLER_NAME, Arc::new(TracingRecorder::new(CONTROLLER_NAME)))?;

    let token = CancellationToken::new();

    // 5) producer: mutates the store so the controller has something to do
    let producer = tokio::spawn(produce(secrets.clone(), token.clone()));
    secrets.mark_synced();

    // 6) shutdown on ctrl-c
    let signal_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("ctrl-c received, shutting down"),
            Err(e) => warn!(error = %e, "failed to listen for ctrl-c, shutting down"),
        }
        signal_token.cancel();
    });

    controller.run(token.clone(), cfg.controller.workers).await?;
    token.cancel();
    producer.await?;

    debug!(metrics = %metrics.encode_text()?, "final metrics");
    info!("bye");
    Ok(())
}

/// Create, update, flag as failing and delete a handful of secrets in a loop.
async fn produce(store: Arc<MemorySource<Secret>>, token: CancellationToken) {
    let mut tick = tokio::time::interval(Duration::from_secs(2));
    let mut revision = 0u64;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tick.tick() => {}
        }
        revision += 1;
        let name = format!("secret-{}", revision % 4);
        let mut labels = Labels::new();
        if revision % 7 == 0 {
            labels.insert("fail", "true");
        }
        let secret = Secret {
            namespace: "demo".to_string(),
            name,
            labels,
            revision,
        };

        if revision % 5 == 0 {
            let key = format!("{}/{}", secret.namespace, secret.name);
            match store.delete(&key) {
                Ok(_) => debug!(%key, "secret deleted"),
                Err(e) => debug!(%key, error = %e, "delete skipped"),
            }
        } else if let Err(e) = store.upsert(secret) {
            warn!(error = %e, "upsert failed");
        }
    }
}
