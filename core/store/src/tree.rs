//! Tree snapshots of the vault.
//!
//! Snapshots are rebuilt from the filesystem on every call and never cached.
//! At every level directories come before files, and names within a group are
//! ordered case-insensitively with a byte-order tiebreak.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use notevault_common::{Error, ErrorKind, Node, NodeType, Result};

/// Order two entries of the same directory.
pub fn compare_entries(a: (NodeType, &str), b: (NodeType, &str)) -> Ordering {
    match (a.0, b.0) {
        (NodeType::Directory, NodeType::File) => Ordering::Less,
        (NodeType::File, NodeType::Directory) => Ordering::Greater,
        _ => a
            .1
            .to_lowercase()
            .cmp(&b.1.to_lowercase())
            .then_with(|| a.1.cmp(b.1)),
    }
}

/// Read one directory level, keeping only regular files and directories.
///
/// Entry types come from `DirEntry::file_type`, which does not follow
/// symlinks, so links are skipped rather than traversed.
fn read_sorted(dir: &Path) -> Result<Vec<(String, NodeType)>> {
    let context = dir.display();
    let mut entries = Vec::new();

    for entry in fs::read_dir(dir).map_err(|e| Error::from_io(e, &context))? {
        let entry = entry.map_err(|e| Error::from_io(e, &context))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(name = %name, dir = %context, "Entry vanished while reading");
                continue;
            }
            Err(e) => return Err(Error::from_io(e, &context)),
        };

        if file_type.is_dir() {
            entries.push((name, NodeType::Directory));
        } else if file_type.is_file() {
            entries.push((name, NodeType::File));
        } else {
            trace!(name = %name, dir = %context, "Skipping non-regular entry");
        }
    }

    entries.sort_by(|a, b| compare_entries((a.1, &a.0), (b.1, &b.0)));
    Ok(entries)
}

/// Build an ordered snapshot of a sandbox-validated directory.
///
/// # Preconditions
/// - `dir` was produced by [`VaultRoot::resolve`](crate::VaultRoot::resolve)
///
/// # Postconditions
/// - A missing `dir` yields an empty snapshot
/// - Subdirectories removed while the walk is in progress are omitted
/// - Symlinks, devices, sockets and fifos are omitted
///
/// # Errors
/// - Any directory in the subtree cannot be read
pub fn build_tree(dir: &Path) -> Result<Vec<Node>> {
    match build_level(dir) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Directory not found, returning empty tree");
            Ok(Vec::new())
        }
        result => result,
    }
}

fn build_level(dir: &Path) -> Result<Vec<Node>> {
    let entries = read_sorted(dir)?;
    build_entries(dir, entries)
}

/// Turn one sorted directory level into nodes, descending into directories.
fn build_entries(dir: &Path, entries: Vec<(String, NodeType)>) -> Result<Vec<Node>> {
    let mut nodes = Vec::with_capacity(entries.len());

    for (name, node_type) in entries {
        match node_type {
            NodeType::File => nodes.push(Node::file(name)),
            NodeType::Directory => match build_level(&dir.join(&name)) {
                Ok(children) => nodes.push(Node::directory(name, children)),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(dir = %dir.display(), name = %name, "Directory vanished during listing");
                }
                Err(e) => return Err(e),
            },
        }
    }

    Ok(nodes)
}

/// One entry produced by [`TreeWalker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Vault-relative, `/`-separated path.
    pub path: String,
    pub node_type: NodeType,
    /// Zero for direct children of the walk root.
    pub depth: usize,
}

/// Lazy pre-order walk over a directory.
///
/// Reads one directory at a time, when its first child is requested, so large
/// vaults can be streamed without materializing a full snapshot. Ordering per
/// level matches [`build_tree`]. A directory removed before its children are
/// read is yielded without children. A directory that cannot be read for any
/// other reason is still yielded, followed by an error in place of its
/// children; the walk then continues with its siblings.
pub struct TreeWalker {
    root: PathBuf,
    started: bool,
    pending: Vec<WalkEntry>,
    deferred: Option<Error>,
}

impl TreeWalker {
    /// Walk below `root`. A missing root produces no entries.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            started: false,
            pending: Vec::new(),
            deferred: None,
        }
    }

    fn push_children(&mut self, relative: &str, depth: usize) -> Result<()> {
        let dir = if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        };

        let children = match read_sorted(&dir) {
            Ok(children) => children,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(dir = %dir.display(), "Directory vanished during walk");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // Reversed so the first child is popped first.
        for (name, node_type) in children.into_iter().rev() {
            let path = if relative.is_empty() {
                name
            } else {
                format!("{}/{}", relative, name)
            };
            self.pending.push(WalkEntry {
                path,
                node_type,
                depth,
            });
        }
        Ok(())
    }
}

impl Iterator for TreeWalker {
    type Item = Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.deferred.take() {
            return Some(Err(e));
        }

        if !self.started {
            self.started = true;
            if let Err(e) = self.push_children("", 0) {
                return Some(Err(e));
            }
        }

        let entry = self.pending.pop()?;
        if entry.node_type == NodeType::Directory {
            if let Err(e) = self.push_children(&entry.path, entry.depth + 1) {
                self.deferred = Some(e);
            }
        }
        Some(Ok(entry))
    }
}
