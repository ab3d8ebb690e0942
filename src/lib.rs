//! # vectorsync
//!
//! Incrementally sync a project's source files into a vector-store collection
//! so that editor tooling can retrieve relevant code by embedding similarity.
//!
//! A sync pass replaces every selected file's records (chunk texts plus one
//! record holding the file's project-relative path) and then removes records
//! whose file no longer exists on disk.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │ Discovery  │──▶│ SyncCoordinator   │──▶│  Collection  │
//! │ glob+ignore│   │ task per file     │   │  (Chroma)    │
//! └────────────┘   │ one collection    │   └──────┬───────┘
//!                  │ lock              │          │
//!                  └────────┬─────────┘          │
//!                           ▼                     │
//!                  ┌──────────────────┐          │
//!                  │ OrphanReconciler │◀─────────┘
//!                  └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vsync vectorise -r src docs     # sync two directories
//! vsync vectorise "**/*.rs"       # sync by glob
//! vsync --pipe vectorise -r .     # JSON stats on stdout
//! vsync ls                        # collections on this host
//! vsync check                     # is the server reachable?
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration lookup and validation |
//! | [`discovery`] | Expand paths and globs into files |
//! | [`exclude`] | `.gitignore` exclusion rules |
//! | [`sync`] | Concurrent per-file replacement |
//! | [`reconcile`] | Orphaned record cleanup |
//! | [`chroma`] | Chroma REST client and collection gateway |
//! | [`collection`] | Collection naming, ownership, embedding verification |
//! | [`embedding`] | Embedding providers |
//! | [`vectorise`] | The `vectorise` command |
//! | [`ls`] | The `ls` command |
//! | [`stats`] | Pass statistics output |
//! | [`progress`] | Progress reporting on stderr |
//! | [`error`] | Pass-level error taxonomy |

pub mod chroma;
pub mod collection;
pub mod config;
pub mod discovery;
pub mod embedding;
pub mod error;
pub mod exclude;
pub mod ls;
pub mod progress;
pub mod reconcile;
pub mod stats;
pub mod sync;
pub mod vectorise;
