//! Orphan cleanup: drop records whose source file no longer exists.
//!
//! Runs once per pass, after every file task has settled. The whole scan and
//! the bulk delete happen under the collection lock, so no file task can
//! observe a half-cleaned collection.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use vectorsync_core::models::SyncStats;
use vectorsync_core::store::CollectionGateway;

use crate::error::SyncError;
use crate::sync::CollectionLock;

pub struct OrphanReconciler {
    gateway: Arc<dyn CollectionGateway>,
    lock: CollectionLock,
}

impl OrphanReconciler {
    pub fn new(gateway: Arc<dyn CollectionGateway>, lock: CollectionLock) -> Self {
        Self { gateway, lock }
    }

    /// Delete every record whose `metadata.path` is not a regular file on
    /// disk, store the number of distinct orphaned paths in
    /// `stats.removed`, and return it.
    pub async fn reconcile(&self, stats: &Mutex<SyncStats>) -> Result<usize, SyncError> {
        let _guard = self.lock.acquire().await;

        let paths: BTreeSet<String> = self
            .gateway
            .all_path_metadata()
            .await
            .map_err(SyncError::Remote)?
            .into_iter()
            .collect();

        let mut orphans = Vec::new();
        for path in paths {
            if !is_regular_file(&path).await {
                orphans.push(path);
            }
        }

        if !orphans.is_empty() {
            debug!(orphans = ?orphans, "deleting orphaned paths");
            self.gateway
                .delete_by_paths(&orphans)
                .await
                .map_err(SyncError::Remote)?;
            info!(count = orphans.len(), "removed orphaned files");
        }

        stats.lock().await.removed = orphans.len();
        Ok(orphans.len())
    }
}

async fn is_regular_file(path: &str) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
