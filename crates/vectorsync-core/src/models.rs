//! Core data models shared by the sync pipeline and the gateways.
//!
//! These types describe the chunks produced from a source file, the records
//! stored in the remote collection, and the counters reported at the end of
//! a sync pass.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A slice of a file's text content prepared for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk in the file's chunk sequence, starting at 0.
    pub ordinal: usize,
    /// Character offset (in `char`s, not bytes) of the first character.
    pub offset: usize,
    pub text: String,
}

/// Metadata attached to every stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Canonical absolute path of the source file. This is the grouping key.
    pub path: String,
}

/// A document record as stored in the remote collection.
///
/// Many records share one `metadata.path`: one per chunk plus one terminal
/// record holding the file's project-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub text: String,
    pub metadata: RecordMetadata,
}

impl DocumentRecord {
    /// Create a record with a freshly minted, globally unique id.
    pub fn new(text: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            text: text.into(),
            metadata: RecordMetadata { path: path.into() },
        }
    }
}

/// Mint a new record id (UUID v4, hex without hyphens).
pub fn new_record_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Counters accumulated over one sync pass.
///
/// Serialized with the short keys `add` / `update` / `removed`, which is the
/// machine-readable shape consumers of `--pipe` expect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    #[serde(rename = "add")]
    pub added: usize,
    #[serde(rename = "update")]
    pub updated: usize,
    pub removed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ids_are_unique_hex() {
        let a = DocumentRecord::new("alpha", "/p/a.txt");
        let b = DocumentRecord::new("alpha", "/p/a.txt");
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 32);
        assert!(a.id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_stats_json_keys() {
        let stats = SyncStats {
            added: 2,
            updated: 1,
            removed: 3,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json, serde_json::json!({"add": 2, "update": 1, "removed": 3}));
    }
}
