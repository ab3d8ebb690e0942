//! Configuration parsing and validation.
//!
//! vectorsync is configured via a TOML file. Every section is optional and
//! falls back to built-in defaults, so an empty file is a valid config.
//!
//! # Lookup Order
//!
//! 1. An explicit `--config <path>` (must exist).
//! 2. `<project_root>/.vectorsync/config.toml`
//! 3. `<user config dir>/vectorsync/config.toml`
//! 4. Built-in defaults.
//!
//! # Example
//!
//! ```toml
//! [db]
//! host = "127.0.0.1"
//! port = 8000
//!
//! [chunking]
//! chunk_size = 2500
//! overlap_ratio = 0.2
//!
//! [embedding]
//! function = "openai"   # or "local" (default)
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [sync]
//! concurrency = 16
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use vectorsync_core::chunk::{ChunkParams, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP_RATIO};

/// Directory (relative to the project root) holding project-local config.
pub const PROJECT_CONFIG_DIR: &str = ".vectorsync";

/// Config file name inside [`PROJECT_CONFIG_DIR`] and the user config dir.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Vector-store server location.
#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout for store calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DbConfig {
    /// Base URL of the store's HTTP API, e.g. `http://127.0.0.1:8000`.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap_ratio")]
    pub overlap_ratio: f64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap_ratio: default_overlap_ratio(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_overlap_ratio() -> f64 {
    DEFAULT_OVERLAP_RATIO
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// Embedding function name: `local` (on-device model) or `openai`.
    #[serde(default = "default_function")]
    pub function: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Free-form parameters, recorded on the collection for verification.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Base URL of the OpenAI-compatible embeddings API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            function: default_function(),
            model: None,
            dims: None,
            params: serde_json::Map::new(),
            api_base: default_api_base(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_function() -> String {
    "local".to_string()
}
fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Maximum number of files processed at once. `0` means unbounded.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// Largest bounded concurrency; higher values are rejected.
pub const MAX_CONCURRENCY: usize = tokio::sync::Semaphore::MAX_PERMITS;

fn default_concurrency() -> usize {
    16
}

impl Config {
    /// Validated chunking parameters.
    pub fn chunk_params(&self) -> Result<ChunkParams> {
        ChunkParams::new(self.chunking.chunk_size, self.chunking.overlap_ratio)
            .context("invalid [chunking] settings")
    }

    /// Check cross-field constraints. Called by every loader and again after
    /// CLI overrides are applied.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be > 0");
        }
        if !(0.0..1.0).contains(&self.chunking.overlap_ratio) {
            bail!("chunking.overlap_ratio must be in [0.0, 1.0)");
        }
        if self.db.port == 0 {
            bail!("db.port must be > 0");
        }
        if self.db.host.trim().is_empty() {
            bail!("db.host must not be empty");
        }
        if self.sync.concurrency > MAX_CONCURRENCY {
            bail!("sync.concurrency must be <= {}", MAX_CONCURRENCY);
        }

        match self.embedding.function.as_str() {
            "local" => {}
            "openai" => {
                if self.embedding.dims.is_none() {
                    bail!("embedding.dims must be specified when function is 'openai'");
                }
                if self.embedding.model.is_none() {
                    bail!("embedding.model must be specified when function is 'openai'");
                }
            }
            other => bail!(
                "Unknown embedding function: '{}'. Must be local or openai.",
                other
            ),
        }
        if self.embedding.dims == Some(0) {
            bail!("embedding.dims must be > 0");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }

        Ok(())
    }
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    config.validate()?;
    Ok(config)
}

/// Find the config for a project following the documented lookup order.
///
/// Returns the config and the file it came from (`None` for defaults).
pub fn resolve_config(
    explicit: Option<&Path>,
    project_root: &Path,
) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((load_config(path)?, Some(path.to_path_buf())));
    }

    let mut candidates = vec![project_root.join(PROJECT_CONFIG_DIR).join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("vectorsync").join(CONFIG_FILE_NAME));
    }

    for candidate in candidates {
        if candidate.is_file() {
            let config = load_config(&candidate)?;
            return Ok((config, Some(candidate)));
        }
    }

    Ok((Config::default(), None))
}
