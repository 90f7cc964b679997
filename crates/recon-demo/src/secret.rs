use std::sync::Arc;

use async_trait::async_trait;
use recon_core::{MemorySource, Reconciler, SyncContext, SyncError, SyncResult};
use recon_model::{Labels, ObjectMeta, split_meta_namespace_key};
use tracing::info;

/// Toy domain object driven through the demo controller.
#[derive(Debug, Clone)]
pub struct Secret {
    pub namespace: String,
    pub name: String,
    pub labels: Labels,
    pub revision: u64,
}

impl ObjectMeta for Secret {
    fn namespace(&self) -> Option<&str> {
        Some(&self.namespace)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &Labels {
        &self.labels
    }
}

/// Reconciles a secret key against the in-memory store.
///
/// A secret labelled `fail=true` makes every sync of its key fail, which exercises the
/// rate-limited retry path.
pub struct SecretReconciler {
    store: Arc<MemorySource<Secret>>,
    failing: Labels,
}

impl SecretReconciler {
    pub fn new(store: Arc<MemorySource<Secret>>) -> Self {
        Self {
            store,
            failing: [("fail", "true")].into_iter().collect(),
        }
    }
}

#[async_trait]
impl Reconciler for SecretReconciler {
    fn name(&self) -> &str {
        "secret-reconciler"
    }

    async fn sync(&self, ctx: SyncContext) -> SyncResult {
        if ctx.is_default_key() {
            info!(secrets = self.store.len(), "full resync");
            for secret in self.store.list() {
                ctx.queue().add(format!("{}/{}", secret.namespace, secret.name));
            }
            return Ok(());
        }

        let (namespace, name) = split_meta_namespace_key(ctx.queue_key())?;
        let Some(secret) = self.store.get(ctx.queue_key()) else {
            info!(namespace, name, "secret gone, nothing to do");
            return Ok(());
        };
        if ctx.is_cancelled() {
            return Err(SyncError::Canceled);
        }
        if secret.labels.matches(&self.failing) {
            return Err(SyncError::fail(format!("secret {name} is marked as failing")));
        }
        info!(namespace, name, revision = secret.revision, "secret reconciled");
        Ok(())
    }
}
