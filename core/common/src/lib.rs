//! Common utilities and types shared across NoteVault modules.
//!
//! This module provides the error taxonomy every store operation reports
//! through, and the value types exchanged with callers.

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::{ItemKind, Node, NodeType, RenameOutcome};
