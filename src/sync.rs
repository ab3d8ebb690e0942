//! Sync coordinator: one concurrent pass of file-to-collection replacement.
//!
//! A pass takes the discovered file list, spawns one task per file onto a
//! [`JoinSet`], waits for every task to settle, then hands off to the
//! [`OrphanReconciler`]. Per file, a task:
//!
//! 1. looks up existing record ids for the file's path (under the lock),
//! 2. deletes them if any existed (under the lock) and counts the file as
//!    `updated`, otherwise counts it as `added`,
//! 3. reads and chunks the file, appending the project-relative path as a
//!    final chunk,
//! 4. inserts the new records in slices no larger than the store's max batch
//!    size (each slice under the lock).
//!
//! Every call on the collection goes through one [`CollectionLock`]; reads,
//! chunking, and waiting on the lock overlap freely across tasks. Counter
//! increments happen under a separate counters mutex, only after the remote
//! call they describe has succeeded.
//!
//! A file that cannot be read is skipped (its stale records are already gone)
//! and a failing remote call fails only its own file; both are listed in the
//! [`SyncReport`]. Cancellation aborts
//! every in-flight task, skips orphan cleanup, and surfaces as
//! [`SyncError::Cancelled`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vectorsync_core::chunk::{chunk_text, ChunkParams};
use vectorsync_core::models::{DocumentRecord, SyncStats};
use vectorsync_core::store::CollectionGateway;

use crate::error::SyncError;
use crate::progress::{NoProgress, SyncProgressEvent, SyncProgressReporter};
use crate::reconcile::OrphanReconciler;

/// The single mutual-exclusion lock serializing calls on one collection.
///
/// Cloning shares the lock. Every component that touches the collection
/// during a pass holds a clone of the same instance.
#[derive(Clone, Default)]
pub struct CollectionLock {
    inner: Arc<Mutex<()>>,
}

impl CollectionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the collection.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }
}

/// Settings for one pass.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Canonical project root; relative-path tokens are computed against it.
    pub project_root: PathBuf,
    pub chunk_params: ChunkParams,
    /// Maximum number of files in flight. `0` means unbounded.
    pub concurrency: usize,
}

/// How one file's task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file had no records and now has a fresh set.
    Added,
    /// The file's previous records were replaced.
    Updated,
    /// The file could not be read (missing, or not valid UTF-8). Any records
    /// it had before the pass were removed.
    Skipped { reason: String },
    /// A remote call failed while syncing this file.
    Failed { error: String },
}

/// Outcome of one file in a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

/// Result of a completed pass.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub stats: SyncStats,
    /// One entry per discovered file, in completion order.
    pub files: Vec<FileReport>,
}

impl SyncReport {
    /// Files that were skipped or failed.
    pub fn problems(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| {
            matches!(
                f.outcome,
                FileOutcome::Skipped { .. } | FileOutcome::Failed { .. }
            )
        })
    }
}

/// Runs sync passes against one collection.
pub struct SyncCoordinator {
    gateway: Arc<dyn CollectionGateway>,
    lock: CollectionLock,
    options: SyncOptions,
    progress: Arc<dyn SyncProgressReporter>,
}

impl SyncCoordinator {
    pub fn new(gateway: Arc<dyn CollectionGateway>, options: SyncOptions) -> Self {
        Self {
            gateway,
            lock: CollectionLock::new(),
            options,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn SyncProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// The lock this coordinator serializes collection calls through.
    pub fn lock(&self) -> CollectionLock {
        self.lock.clone()
    }

    /// Sync `files` into the collection, then remove orphaned records.
    ///
    /// Returns once every file task has settled and orphan cleanup has run.
    /// On cancellation no cleanup runs and [`SyncError::Cancelled`] is
    /// returned; counters committed so far are discarded with the pass.
    pub async fn run_pass(
        &self,
        files: Vec<PathBuf>,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let stats = Arc::new(Mutex::new(SyncStats::default()));
        self.progress.report(SyncProgressEvent::Discovered {
            files: files.len() as u64,
        });

        let reports = self.sync_files(files, &stats, cancel).await?;

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        self.progress.report(SyncProgressEvent::Reconciling);
        let reconciler = OrphanReconciler::new(self.gateway.clone(), self.lock.clone());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            removed = reconciler.reconcile(&stats) => {
                removed?;
            }
        }

        let stats = *stats.lock().await;
        info!(
            added = stats.added,
            updated = stats.updated,
            removed = stats.removed,
            problems = reports
                .iter()
                .filter(|r| !matches!(r.outcome, FileOutcome::Added | FileOutcome::Updated))
                .count(),
            "sync pass finished"
        );
        Ok(SyncReport {
            stats,
            files: reports,
        })
    }

    async fn sync_files(
        &self,
        files: Vec<PathBuf>,
        stats: &Arc<Mutex<SyncStats>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileReport>, SyncError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let max_batch_size = {
            let _guard = self.lock.acquire().await;
            self.gateway
                .max_batch_size()
                .await
                .map_err(SyncError::Remote)?
                .max(1)
        };
        debug!(
            files = files.len(),
            max_batch_size,
            concurrency = self.options.concurrency,
            "starting file tasks"
        );

        let ctx = Arc::new(TaskContext {
            gateway: self.gateway.clone(),
            lock: self.lock.clone(),
            stats: stats.clone(),
            project_root: self.options.project_root.clone(),
            chunk_params: self.options.chunk_params,
            max_batch_size,
            cancel: cancel.clone(),
        });
        let permits = match self.options.concurrency {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n.min(Semaphore::MAX_PERMITS)))),
        };

        let total = files.len() as u64;
        let mut set = JoinSet::new();
        for path in files {
            let ctx = ctx.clone();
            let permits = permits.clone();
            set.spawn(async move {
                let _permit = match permits {
                    Some(sem) => tokio::select! {
                        biased;
                        _ = ctx.cancel.cancelled() => return Err(SyncError::Cancelled),
                        permit = sem.acquire_owned() => {
                            Some(permit.map_err(|_| SyncError::Cancelled)?)
                        }
                    },
                    None => None,
                };
                let outcome = ctx.sync_file(&path).await?;
                Ok(FileReport { path, outcome })
            });
        }

        let mut reports = Vec::with_capacity(total as usize);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = set.join_next() => Some(next),
            };
            match next {
                None | Some(Some(Ok(Err(SyncError::Cancelled)))) => {
                    set.abort_all();
                    while set.join_next().await.is_some() {}
                    return Err(SyncError::Cancelled);
                }
                Some(None) => break,
                Some(Some(Ok(Ok(report)))) => {
                    log_outcome(&report);
                    reports.push(report);
                    self.progress.report(SyncProgressEvent::Syncing {
                        n: reports.len() as u64,
                        total,
                    });
                }
                Some(Some(Ok(Err(e)))) => return Err(e),
                Some(Some(Err(join_err))) => {
                    if join_err.is_panic() {
                        std::panic::resume_unwind(join_err.into_panic());
                    }
                }
            }
        }

        Ok(reports)
    }
}

fn log_outcome(report: &FileReport) {
    match &report.outcome {
        FileOutcome::Added | FileOutcome::Updated => {
            debug!(path = %report.path.display(), outcome = ?report.outcome, "file synced")
        }
        FileOutcome::Skipped { reason } => {
            warn!(path = %report.path.display(), reason = %reason, "file skipped")
        }
        FileOutcome::Failed { error } => {
            warn!(path = %report.path.display(), error = %error, "file failed")
        }
    }
}

/// State shared by every file task of a pass.
struct TaskContext {
    gateway: Arc<dyn CollectionGateway>,
    lock: CollectionLock,
    stats: Arc<Mutex<SyncStats>>,
    project_root: PathBuf,
    chunk_params: ChunkParams,
    max_batch_size: usize,
    cancel: CancellationToken,
}

impl TaskContext {
    /// Sync one file. Only cancellation is returned as an error; every other
    /// problem becomes the file's outcome.
    async fn sync_file(&self, path: &Path) -> Result<FileOutcome, SyncError> {
        let key = path.to_string_lossy().to_string();

        let existing = match self.locked(self.gateway.find_ids_by_path(&key)).await? {
            Ok(ids) => ids,
            Err(e) => return Ok(failed("lookup", e)),
        };

        let outcome = if existing.is_empty() {
            self.stats.lock().await.added += 1;
            FileOutcome::Added
        } else {
            if let Err(e) = self.locked(self.gateway.delete_by_path(&key)).await? {
                return Ok(failed("delete", e));
            }
            self.stats.lock().await.updated += 1;
            FileOutcome::Updated
        };

        self.check_cancelled()?;
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                return Ok(FileOutcome::Skipped {
                    reason: e.to_string(),
                })
            }
        };
        let records = self.build_records(&key, path, &content);

        for batch in records.chunks(self.max_batch_size) {
            if let Err(e) = self.locked(self.gateway.insert_batch(batch)).await? {
                return Ok(failed("insert", e));
            }
        }

        Ok(outcome)
    }

    /// One record per chunk plus a final record carrying the file's path
    /// relative to the project root.
    fn build_records(&self, key: &str, path: &Path, content: &str) -> Vec<DocumentRecord> {
        let mut records: Vec<DocumentRecord> = chunk_text(content, &self.chunk_params)
            .into_iter()
            .map(|chunk| DocumentRecord::new(chunk.text, key))
            .collect();
        records.push(DocumentRecord::new(
            relative_path_token(path, &self.project_root),
            key,
        ));
        records
    }

    /// Run `call` while holding the collection lock. Waiting for the lock
    /// gives way to cancellation.
    async fn locked<T>(
        &self,
        call: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> Result<anyhow::Result<T>, SyncError> {
        let _guard = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(SyncError::Cancelled),
            guard = self.lock.acquire() => guard,
        };
        Ok(call.await)
    }

    fn check_cancelled(&self) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn failed(step: &str, error: anyhow::Error) -> FileOutcome {
    FileOutcome::Failed {
        error: format!("{} failed: {:#}", step, error),
    }
}

/// The token appended to a file's chunks: its path relative to the project
/// root, or the full path when the file lies outside the root.
pub fn relative_path_token(path: &Path, project_root: &Path) -> String {
    path.strip_prefix(project_root)
        .map(|rel| rel.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_token() {
        let root = Path::new("/p");
        assert_eq!(relative_path_token(Path::new("/p/src/a.rs"), root), "src/a.rs");
        assert_eq!(relative_path_token(Path::new("/q/b.rs"), root), "/q/b.rs");
    }

    #[test]
    fn test_report_problems() {
        let report = SyncReport {
            stats: SyncStats::default(),
            files: vec![
                FileReport {
                    path: PathBuf::from("/p/a"),
                    outcome: FileOutcome::Added,
                },
                FileReport {
                    path: PathBuf::from("/p/b"),
                    outcome: FileOutcome::Skipped {
                        reason: "invalid UTF-8".into(),
                    },
                },
            ],
        };
        let problems: Vec<_> = report.problems().map(|f| f.path.clone()).collect();
        assert_eq!(problems, vec![PathBuf::from("/p/b")]);
    }

    #[tokio::test]
    async fn test_lock_is_shared_between_clones() {
        let lock = CollectionLock::new();
        let other = lock.clone();
        let guard = lock.acquire().await;
        assert!(other.inner.try_lock().is_err());
        drop(guard);
        assert!(other.inner.try_lock().is_ok());
    }
}
