//! In-memory [`CollectionGateway`] implementation for tests and dry runs.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Inserts larger than
//! the configured max batch size are rejected the way a real server would
//! reject them, and the size of every accepted insert is logged so tests can
//! assert on batching.

use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::DocumentRecord;

use super::CollectionGateway;

/// Max batch size used by [`InMemoryCollection::new`].
pub const DEFAULT_MEMORY_BATCH_SIZE: usize = 1024;

/// In-memory collection for testing.
pub struct InMemoryCollection {
    records: RwLock<Vec<DocumentRecord>>,
    insert_calls: RwLock<Vec<usize>>,
    max_batch_size: usize,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::with_max_batch_size(DEFAULT_MEMORY_BATCH_SIZE)
    }

    /// Create an empty collection that accepts at most `max_batch_size`
    /// records per insert.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            insert_calls: RwLock::new(Vec::new()),
            max_batch_size: max_batch_size.max(1),
        }
    }

    /// Snapshot of every stored record, in insertion order.
    pub fn records(&self) -> Result<Vec<DocumentRecord>> {
        Ok(self.read()?.clone())
    }

    /// Texts stored for one path, in insertion order.
    pub fn texts_for_path(&self, path: &str) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .iter()
            .filter(|r| r.metadata.path == path)
            .map(|r| r.text.clone())
            .collect())
    }

    /// Sizes of every accepted [`insert_batch`](CollectionGateway::insert_batch) call.
    pub fn insert_calls(&self) -> Result<Vec<usize>> {
        Ok(self
            .insert_calls
            .read()
            .map_err(|_| anyhow!("insert log lock poisoned"))?
            .clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<DocumentRecord>>> {
        self.records
            .read()
            .map_err(|_| anyhow!("in-memory collection lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<DocumentRecord>>> {
        self.records
            .write()
            .map_err(|_| anyhow!("in-memory collection lock poisoned"))
    }
}

impl Default for InMemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CollectionGateway for InMemoryCollection {
    async fn find_ids_by_path(&self, path: &str) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .iter()
            .filter(|r| r.metadata.path == path)
            .map(|r| r.id.clone())
            .collect())
    }

    async fn delete_by_path(&self, path: &str) -> Result<()> {
        self.write()?.retain(|r| r.metadata.path != path);
        Ok(())
    }

    async fn delete_by_paths(&self, paths: &[String]) -> Result<()> {
        let doomed: HashSet<&str> = paths.iter().map(String::as_str).collect();
        self.write()?
            .retain(|r| !doomed.contains(r.metadata.path.as_str()));
        Ok(())
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<()> {
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.write()?.retain(|r| !doomed.contains(r.id.as_str()));
        Ok(())
    }

    async fn insert_batch(&self, records: &[DocumentRecord]) -> Result<()> {
        if records.len() > self.max_batch_size {
            bail!(
                "batch of {} records exceeds max batch size {}",
                records.len(),
                self.max_batch_size
            );
        }
        {
            let mut stored = self.write()?;
            if let Some(dup) = records
                .iter()
                .find(|r| stored.iter().any(|s| s.id == r.id))
            {
                bail!("duplicate record id: {}", dup.id);
            }
            stored.extend(records.iter().cloned());
        }
        self.insert_calls
            .write()
            .map_err(|_| anyhow!("insert log lock poisoned"))?
            .push(records.len());
        Ok(())
    }

    async fn max_batch_size(&self) -> Result<usize> {
        Ok(self.max_batch_size)
    }

    async fn all_path_metadata(&self) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .iter()
            .map(|r| r.metadata.path.clone())
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
