//! Sandboxed hierarchical file store for NoteVault.
//!
//! This module provides:
//! - A path sandbox that proves every caller path stays inside the vault root
//! - Ordered tree snapshots of the vault
//! - Structural mutations (create, rename, move, delete) and content read/write
//!
//! # Architecture
//! Every operation resolves its input through [`VaultRoot::resolve`] before any
//! filesystem access. There is no index or cache: the directory tree under the
//! vault root is the single source of truth and is probed fresh per request.

pub mod config;
pub mod operations;
pub mod sandbox;
pub mod store;
pub mod tree;

pub use config::StoreConfig;
pub use operations::VaultOperations;
pub use sandbox::VaultRoot;
pub use store::{LocalVault, VaultStore};
pub use tree::{build_tree, TreeWalker, WalkEntry};
