//! Error taxonomy for a sync pass.
//!
//! Configuration-level failures stop the pass before any per-file work
//! begins. Per-file failures never show up here; they are reported as
//! [`FileOutcome`](crate::sync::FileOutcome)s instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a whole sync pass.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Invalid or inconsistent configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The collection could not be acquired (unreachable server, foreign
    /// collection behind the same name).
    #[error("failed to get or create the collection: {0}")]
    Collection(String),

    /// The collection was embedded with a different embedding function.
    #[error(
        "the collection was embedded using '{stored}', but '{configured}' is configured; \
         embeddings and queries must use the same embedding function"
    )]
    EmbeddingMismatch { stored: String, configured: String },

    /// The project's ignore file exists but could not be read or parsed.
    #[error("cannot load ignore rules from {}: {message}", path.display())]
    IgnoreFile { path: PathBuf, message: String },

    /// The pass was cancelled before all files settled.
    #[error("sync cancelled")]
    Cancelled,

    /// A store call outside any per-file task failed. The display carries
    /// the whole context chain.
    #[error("remote collection error: {0:#}")]
    Remote(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_display_names_both_functions() {
        let err = SyncError::EmbeddingMismatch {
            stored: "openai".to_string(),
            configured: "local".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'openai'"));
        assert!(msg.contains("'local'"));
    }

    #[test]
    fn test_ignore_file_display() {
        let err = SyncError::IgnoreFile {
            path: PathBuf::from("/p/.gitignore"),
            message: "stream did not contain valid UTF-8".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot load ignore rules from /p/.gitignore: stream did not contain valid UTF-8"
        );
    }

    #[test]
    fn test_remote_wraps_context_chain() {
        let inner = anyhow::anyhow!("connection refused").context("scan failed");
        let err = SyncError::Remote(inner);
        assert_eq!(
            err.to_string(),
            "remote collection error: scan failed: connection refused"
        );
    }
}
