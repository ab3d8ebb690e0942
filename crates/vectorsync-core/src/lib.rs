//! # vectorsync core
//!
//! Runtime-agnostic logic shared by the `vectorsync` app: data models, the
//! overlapping character chunker, and the [`store::CollectionGateway`] trait
//! with an in-memory implementation.
//!
//! This crate contains no tokio, HTTP, or filesystem I/O. Everything that
//! touches the disk or the network lives in the app crate.

pub mod chunk;
pub mod models;
pub mod store;
