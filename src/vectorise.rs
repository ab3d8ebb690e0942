//! `vsync vectorise`: one full sync pass for a project.
//!
//! Resolves the file selection, opens (or creates) the project's collection,
//! verifies its embedding function, and runs the [`SyncCoordinator`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::chroma::ChromaClient;
use crate::collection::open_project_collection;
use crate::config::Config;
use crate::discovery::{discover_files, DiscoveryRequest};
use crate::embedding::create_provider;
use crate::error::SyncError;
use crate::progress::SyncProgressReporter;
use crate::sync::{SyncCoordinator, SyncOptions, SyncReport};

/// Inputs of a vectorise run, after CLI and config merging.
pub struct VectoriseRequest {
    /// Canonical project root.
    pub project_root: PathBuf,
    /// Directory relative arguments are resolved against.
    pub base: PathBuf,
    pub discovery: DiscoveryRequest,
}

/// Run one sync pass over the requested files.
pub async fn run_vectorise(
    config: &Config,
    request: &VectoriseRequest,
    progress: Arc<dyn SyncProgressReporter>,
    cancel: &CancellationToken,
) -> Result<SyncReport, SyncError> {
    let chunk_params = config
        .chunk_params()
        .map_err(|e| SyncError::Config(format!("{:#}", e)))?;

    let files = discover_files(&request.discovery, &request.base, &request.project_root)?;
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    info!(
        files = files.len(),
        root = %request.project_root.display(),
        "files selected for sync"
    );

    let client =
        ChromaClient::new(&config.db).map_err(|e| SyncError::Config(format!("{:#}", e)))?;
    let embedder =
        create_provider(&config.embedding).map_err(|e| SyncError::Config(format!("{:#}", e)))?;
    let collection = until_cancelled(
        cancel,
        open_project_collection(&client, &request.project_root, &config.embedding, embedder),
    )
    .await?;

    let coordinator = SyncCoordinator::new(
        Arc::new(collection),
        SyncOptions {
            project_root: request.project_root.clone(),
            chunk_params,
            concurrency: config.sync.concurrency,
        },
    )
    .with_progress(progress);

    coordinator.run_pass(files, cancel).await
}

/// Await `fut` unless `cancel` fires first.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, SyncError>>,
) -> Result<T, SyncError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        result = fut => result,
    }
}

/// Canonical project root: `explicit` if given, otherwise the current
/// directory.
pub fn resolve_project_root(explicit: Option<&Path>) -> Result<PathBuf, SyncError> {
    let root = match explicit {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };
    root.canonicalize().map_err(|e| {
        SyncError::Config(format!(
            "project root {} is not accessible: {}",
            root.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_project_root_canonicalizes() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a");
        std::fs::create_dir(&nested).unwrap();
        let root = resolve_project_root(Some(&nested.join("..").join("a"))).unwrap();
        assert_eq!(root, nested.canonicalize().unwrap());
    }

    #[test]
    fn test_missing_project_root_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_project_root(Some(&tmp.path().join("nope"))).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[cfg(feature = "local-embeddings-fastembed")]
    #[tokio::test]
    async fn test_cancel_interrupts_collection_opening() {
        use crate::progress::NoProgress;

        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        std::fs::write(root.join("a.txt"), "a").unwrap();

        // accepts connections but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = Config::default();
        config.db.port = listener.local_addr().unwrap().port();
        config.db.timeout_secs = 60;

        let request = VectoriseRequest {
            project_root: root.clone(),
            base: root,
            discovery: DiscoveryRequest {
                specs: vec!["a.txt".into()],
                recursive: false,
                force: false,
            },
        };
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = run_vectorise(&config, &request, Arc::new(NoProgress), &cancel)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SyncError::Cancelled));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
        drop(listener);
    }
}
