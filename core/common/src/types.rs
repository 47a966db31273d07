//! Common types used throughout NoteVault.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Kind of item to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Folder,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

impl FromStr for ItemKind {
    type Err = Error;

    /// Parse `"file"` or `"folder"`, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "folder" => Ok(Self::Folder),
            other => Err(Error::InvalidRequest(format!(
                "Invalid type '{}': must be 'file' or 'folder'",
                other
            ))),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Directory,
    File,
}

/// One entry of a tree snapshot.
///
/// Serializes as `{"name": .., "type": "file"}` or
/// `{"name": .., "type": "directory", "children": [..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
}

impl Node {
    /// Create a file leaf.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: NodeType::File,
            children: None,
        }
    }

    /// Create a directory node with its (already ordered) children.
    pub fn directory(name: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            node_type: NodeType::Directory,
            children: Some(children),
        }
    }

    pub fn is_file(&self) -> bool {
        self.node_type == NodeType::File
    }

    pub fn is_directory(&self) -> bool {
        self.node_type == NodeType::Directory
    }

    /// Children of a directory; empty for files.
    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/// Paths reported back after a successful rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOutcome {
    /// Vault-relative path before the rename.
    pub old_path: String,
    /// Vault-relative path after the rename.
    pub new_path: String,
}
