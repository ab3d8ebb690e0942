//! Project collection identity.
//!
//! Each project root maps to one collection per user and host. The
//! collection name is the first 63 hex characters of
//! `sha256("{user}@{hostname}:{project_root}")`, and the collection carries
//! metadata identifying its owner so that a hash collision, or a collection
//! created by something else, is detected instead of silently reused.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::chroma::{ChromaClient, ChromaCollection, CollectionInfo};
use crate::config::EmbeddingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::SyncError;

/// Value of the `created-by` metadata key on collections this tool owns.
pub const CREATED_BY: &str = "VectorCode";

pub const META_PATH: &str = "path";
pub const META_HOSTNAME: &str = "hostname";
pub const META_CREATED_BY: &str = "created-by";
pub const META_USERNAME: &str = "username";
pub const META_EMBEDDING_FUNCTION: &str = "embedding_function";
pub const META_EMBEDDING_PARAMS: &str = "embedding_params";

const NAME_LEN: usize = 63;

/// Who is syncing: the user and host that own a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub username: String,
    pub hostname: String,
}

impl Owner {
    /// The current user (`$USER`, then `$USERNAME`) on this host.
    pub fn current() -> Self {
        let username = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "DEFAULT_USER".to_string());
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "localhost".to_string());
        Self { username, hostname }
    }

    /// Whether `info` was created by this tool for this user and host.
    pub fn owns(&self, info: &CollectionInfo) -> bool {
        info.meta_str(META_CREATED_BY) == Some(CREATED_BY)
            && info.meta_str(META_USERNAME) == Some(self.username.as_str())
            && info.meta_str(META_HOSTNAME) == Some(self.hostname.as_str())
    }
}

/// Collection name for a canonical project root.
pub fn collection_name(owner: &Owner, project_root: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}@{}:{}",
        owner.username,
        owner.hostname,
        project_root.display()
    ));
    let hex = format!("{:x}", hasher.finalize());
    hex[..NAME_LEN].to_string()
}

/// Metadata written when the collection is created.
pub fn collection_metadata(
    owner: &Owner,
    project_root: &Path,
    embedding: &EmbeddingConfig,
) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert(
        META_PATH.into(),
        Value::String(project_root.to_string_lossy().to_string()),
    );
    meta.insert(META_HOSTNAME.into(), Value::String(owner.hostname.clone()));
    meta.insert(META_CREATED_BY.into(), Value::String(CREATED_BY.into()));
    meta.insert(META_USERNAME.into(), Value::String(owner.username.clone()));
    meta.insert(
        META_EMBEDDING_FUNCTION.into(),
        Value::String(embedding.function.clone()),
    );
    // Store metadata values must be scalars, so params travel as JSON text.
    if !embedding.params.is_empty() {
        meta.insert(
            META_EMBEDDING_PARAMS.into(),
            Value::String(Value::Object(embedding.params.clone()).to_string()),
        );
    }
    meta
}

/// Fail when the stored embedding function differs from the configured one.
/// Differing parameters only produce a warning.
pub fn verify_embedding_function(
    info: &CollectionInfo,
    embedding: &EmbeddingConfig,
) -> Result<(), SyncError> {
    if let Some(stored) = info.meta_str(META_EMBEDDING_FUNCTION) {
        if stored != embedding.function {
            return Err(SyncError::EmbeddingMismatch {
                stored: stored.to_string(),
                configured: embedding.function.clone(),
            });
        }
    }

    if let Some(stored) = info.meta_str(META_EMBEDDING_PARAMS) {
        let stored_params: Option<Map<String, Value>> = serde_json::from_str(stored).ok();
        if stored_params.as_ref() != Some(&embedding.params) {
            warn!(
                stored = %stored,
                "collection was embedded with different parameters; results may be inaccurate"
            );
        }
    }
    Ok(())
}

/// Get or create the project's collection, check that this user and host
/// own it, and verify its embedding function.
pub async fn open_project_collection(
    client: &ChromaClient,
    project_root: &Path,
    embedding: &EmbeddingConfig,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<ChromaCollection, SyncError> {
    let owner = Owner::current();
    let name = collection_name(&owner, project_root);
    let metadata = collection_metadata(&owner, project_root, embedding);

    let info = client
        .get_or_create_collection(&name, &metadata)
        .await
        .map_err(|e| SyncError::Collection(format!("{:#}", e)))?;

    if !owner.owns(&info) {
        return Err(SyncError::Collection(format!(
            "collection {} exists but belongs to someone else (hash collision)",
            name
        )));
    }
    verify_embedding_function(&info, embedding)?;

    debug!(collection = %info.name, id = %info.id, root = %project_root.display(), "collection ready");
    Ok(client.collection(info, embedder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn owner() -> Owner {
        Owner {
            username: "alice".into(),
            hostname: "box".into(),
        }
    }

    fn info(meta: Map<String, Value>) -> CollectionInfo {
        CollectionInfo {
            id: "id".into(),
            name: "name".into(),
            metadata: Some(meta),
        }
    }

    #[test]
    fn test_collection_name_is_63_hex_and_stable() {
        let root = PathBuf::from("/home/alice/project");
        let a = collection_name(&owner(), &root);
        let b = collection_name(&owner(), &root);
        assert_eq!(a, b);
        assert_eq!(a.len(), 63);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

        let other = Owner {
            username: "bob".into(),
            hostname: "box".into(),
        };
        assert_ne!(a, collection_name(&other, &root));
        assert_ne!(a, collection_name(&owner(), Path::new("/home/alice/other")));
    }

    #[test]
    fn test_collection_name_matches_sha256_prefix() {
        // sha256("alice@box:/p"), first 63 hex digits
        assert_eq!(
            collection_name(&owner(), Path::new("/p")),
            "a480fb88f377b0f3ed1108d61364ccf48eaf7ab31cf5aa56f7d207cfde9922b"
        );
    }

    #[test]
    fn test_metadata_and_ownership() {
        let meta = collection_metadata(&owner(), Path::new("/p"), &EmbeddingConfig::default());
        assert_eq!(meta[META_CREATED_BY], Value::String(CREATED_BY.into()));
        assert_eq!(meta[META_EMBEDDING_FUNCTION], Value::String("local".into()));
        assert!(!meta.contains_key(META_EMBEDDING_PARAMS));

        let owned = info(meta.clone());
        assert!(owner().owns(&owned));

        let mut foreign = meta;
        foreign.insert(META_HOSTNAME.into(), Value::String("elsewhere".into()));
        assert!(!owner().owns(&info(foreign)));
    }

    #[test]
    fn test_function_mismatch_is_fatal() {
        let mut config = EmbeddingConfig::default();
        let meta = collection_metadata(&owner(), Path::new("/p"), &config);
        config.function = "openai".into();
        let err = verify_embedding_function(&info(meta), &config).unwrap_err();
        assert!(matches!(err, SyncError::EmbeddingMismatch { .. }));
    }

    #[test]
    fn test_params_mismatch_is_not_fatal() {
        let mut config = EmbeddingConfig::default();
        config
            .params
            .insert("normalize".into(), Value::Bool(true));
        let meta = collection_metadata(&owner(), Path::new("/p"), &config);
        config
            .params
            .insert("normalize".into(), Value::Bool(false));
        assert!(verify_embedding_function(&info(meta), &config).is_ok());
    }

    #[test]
    fn test_missing_metadata_passes_verification() {
        let bare = CollectionInfo {
            id: "id".into(),
            name: "name".into(),
            metadata: None,
        };
        assert!(verify_embedding_function(&bare, &EmbeddingConfig::default()).is_ok());
        assert!(!owner().owns(&bare));
    }
}
