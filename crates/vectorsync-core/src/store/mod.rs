//! Collection gateway abstraction.
//!
//! The [`CollectionGateway`] trait is the narrow interface the sync pipeline
//! uses against a remote vector-store collection: path-based lookup and
//! deletion, bounded batch inserts, and a full metadata scan for orphan
//! cleanup. It deliberately says nothing about embeddings or similarity
//! search; those belong to the store.
//!
//! Implementations must be `Send + Sync` to be shared across tokio tasks.
//! They are not required to be safe under interleaved mutating calls; the
//! caller serializes every call through one collection lock.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::DocumentRecord;

/// Remote collection operations required by the sync pipeline.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_ids_by_path`](CollectionGateway::find_ids_by_path) | Existing record ids for one file |
/// | [`delete_by_path`](CollectionGateway::delete_by_path) | Drop every record of one file |
/// | [`delete_by_paths`](CollectionGateway::delete_by_paths) | Bulk drop for a set of files |
/// | [`delete_by_ids`](CollectionGateway::delete_by_ids) | Drop records by id |
/// | [`insert_batch`](CollectionGateway::insert_batch) | Insert at most `max_batch_size` records |
/// | [`max_batch_size`](CollectionGateway::max_batch_size) | Largest insert the store accepts |
/// | [`all_path_metadata`](CollectionGateway::all_path_metadata) | `metadata.path` of every record |
/// | [`count`](CollectionGateway::count) | Total number of records |
#[async_trait]
pub trait CollectionGateway: Send + Sync {
    /// Ids of all records whose `metadata.path` equals `path`.
    async fn find_ids_by_path(&self, path: &str) -> Result<Vec<String>>;

    /// Delete every record whose `metadata.path` equals `path`.
    async fn delete_by_path(&self, path: &str) -> Result<()>;

    /// Delete every record whose `metadata.path` is one of `paths`.
    async fn delete_by_paths(&self, paths: &[String]) -> Result<()>;

    /// Delete records by id. Unknown ids are ignored.
    async fn delete_by_ids(&self, ids: &[String]) -> Result<()>;

    /// Insert a batch of records.
    ///
    /// Callers must not pass more than [`max_batch_size`](Self::max_batch_size)
    /// records in one call.
    async fn insert_batch(&self, records: &[DocumentRecord]) -> Result<()>;

    /// Largest number of records accepted by one [`insert_batch`](Self::insert_batch).
    async fn max_batch_size(&self) -> Result<usize>;

    /// The `metadata.path` of every stored record, one entry per record.
    async fn all_path_metadata(&self) -> Result<Vec<String>>;

    /// Total number of stored records.
    async fn count(&self) -> Result<usize>;
}
