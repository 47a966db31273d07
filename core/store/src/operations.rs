//! Vault file operations.
//!
//! Each operation resolves its paths through the sandbox, probes the
//! filesystem for its preconditions, and only then applies the filesystem
//! primitive. Probes and the primitive are separate calls; callers that need
//! mutual exclusion go through [`LocalVault`](crate::LocalVault), which
//! serializes mutations.

use std::fs::Metadata;
use std::io;
use std::path::Path;

use tokio::fs;
use tracing::{debug, info};

use crate::sandbox::VaultRoot;
use notevault_common::{Error, ItemKind, RenameOutcome, Result};

/// Stat `path` without following a final symlink.
///
/// Absence is `Ok(None)`; every other failure is classified.
async fn probe(path: &Path, display: &str) -> Result<Option<Metadata>> {
    match fs::symlink_metadata(path).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::from_io(e, display)),
    }
}

/// Validate the bare name given to a rename.
fn validate_name(new_name: &str) -> Result<()> {
    if new_name.trim().is_empty() {
        return Err(Error::InvalidPath("New name cannot be empty".to_string()));
    }
    if new_name.contains('/') || new_name.contains('\\') {
        return Err(Error::InvalidPath(
            "New name cannot contain path separators".to_string(),
        ));
    }
    if new_name == "." || new_name == ".." {
        return Err(Error::InvalidPath(format!(
            "New name '{}' is invalid",
            new_name
        )));
    }
    Ok(())
}

/// Vault operations handler.
///
/// Borrows the root it is scoped to; construct one per call site.
pub struct VaultOperations<'a> {
    root: &'a VaultRoot,
}

impl<'a> VaultOperations<'a> {
    /// Create an operations handler for a vault root.
    pub fn new(root: &'a VaultRoot) -> Self {
        Self { root }
    }

    /// Create parents of `target` unless the parent is the vault root.
    async fn ensure_parent(&self, target: &Path, display: &str) -> Result<()> {
        if let Some(parent) = target.parent() {
            if !self.root.is_root(parent) {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::from_io(e, display))?;
            }
        }
        Ok(())
    }

    /// Create an empty file or directory.
    ///
    /// Surrounding whitespace is stripped from `relative`.
    ///
    /// # Preconditions
    /// - `relative` is non-empty and resolves inside the vault
    /// - Nothing exists at the target
    ///
    /// # Postconditions
    /// - Missing parent directories are created
    /// - An empty file or empty directory exists at the target
    ///
    /// # Errors
    /// - `InvalidRequest` for an empty path
    /// - `InvalidPath` from the sandbox
    /// - `Conflict` if the target exists
    /// - `PermissionDenied` / `Internal` from the filesystem
    pub async fn create(&self, relative: &str, kind: ItemKind) -> Result<()> {
        debug!(path = relative, kind = %kind, "Creating item");

        let relative = relative.trim();
        if relative.is_empty() {
            return Err(Error::InvalidRequest("Path is required".to_string()));
        }

        let target = self.root.resolve(relative)?;
        if probe(&target, relative).await?.is_some() {
            return Err(Error::Conflict(format!(
                "Item '{}' already exists",
                relative
            )));
        }

        self.ensure_parent(&target, relative).await?;

        match kind {
            ItemKind::File => {
                fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&target)
                    .await
                    .map_err(|e| Error::from_io(e, relative))?;
            }
            ItemKind::Folder => {
                fs::create_dir(&target)
                    .await
                    .map_err(|e| Error::from_io(e, relative))?;
            }
        }

        info!(path = relative, kind = %kind, "Item created");
        Ok(())
    }

    /// Rename an item within its directory.
    ///
    /// The new path is built from the source's directory and `new_name`, then
    /// resolved again as if it were fresh caller input. Surrounding whitespace
    /// is stripped from `new_name`.
    ///
    /// # Postconditions
    /// - The source path is absent and the renamed item, with its whole
    ///   subtree, is present under the new name
    ///
    /// # Errors
    /// - `InvalidPath` for a bad `new_name` or sandbox failure
    /// - `InvalidRequest` when renaming the vault root
    /// - `NotFound` if the source is absent
    /// - `Conflict` if the new path is occupied
    pub async fn rename(&self, relative: &str, new_name: &str) -> Result<RenameOutcome> {
        debug!(path = relative, new_name, "Renaming item");

        let new_name = new_name.trim();
        validate_name(new_name)?;

        let source = self.root.resolve(relative)?;
        if self.root.is_root(&source) {
            return Err(Error::InvalidRequest(
                "Cannot rename the root vault directory".to_string(),
            ));
        }

        let old_path = self.root.relative(&source);
        let candidate = match old_path.rsplit_once('/') {
            Some((dir, _)) => format!("{}/{}", dir, new_name),
            None => new_name.to_string(),
        };
        let target = self.root.resolve(&candidate)?;

        if probe(&source, relative).await?.is_none() {
            return Err(Error::NotFound(format!(
                "Source item '{}' not found",
                relative
            )));
        }
        if probe(&target, &candidate).await?.is_some() {
            return Err(Error::Conflict(format!(
                "Item with name '{}' already exists at this location",
                new_name
            )));
        }

        fs::rename(&source, &target)
            .await
            .map_err(|e| Error::from_io(e, relative))?;

        let outcome = RenameOutcome {
            old_path,
            new_path: self.root.relative(&target),
        };
        info!(from = %outcome.old_path, to = %outcome.new_path, "Item renamed");
        Ok(outcome)
    }

    /// Move an item to another location in the vault.
    ///
    /// Surrounding whitespace is stripped from both paths.
    ///
    /// # Postconditions
    /// - Missing parents of the destination are created
    /// - The item, with its whole subtree, lives at the destination
    ///
    /// # Errors
    /// - `InvalidPath` from the sandbox (either path)
    /// - `InvalidRequest` if both paths resolve to the same item, or a folder
    ///   would move into itself or a descendant
    /// - `NotFound` if the source is absent
    /// - `Conflict` if the destination exists
    /// - `CrossDevice` if the filesystem cannot rename across devices
    pub async fn move_item(&self, source: &str, destination: &str) -> Result<()> {
        debug!(source, destination, "Moving item");

        let source = source.trim();
        let destination = destination.trim();
        let from = self.root.resolve(source)?;
        let to = self.root.resolve(destination)?;

        if from == to {
            return Err(Error::InvalidRequest(
                "Source and destination paths cannot be the same".to_string(),
            ));
        }

        let meta = probe(&from, source).await?.ok_or_else(|| {
            Error::NotFound(format!("Source path '{}' not found", source))
        })?;

        if meta.is_dir() && to.starts_with(&from) {
            return Err(Error::InvalidRequest(
                "Cannot move a folder into itself or one of its own subfolders".to_string(),
            ));
        }

        if probe(&to, destination).await?.is_some() {
            return Err(Error::Conflict(format!(
                "Destination path '{}' already exists",
                destination
            )));
        }

        self.ensure_parent(&to, destination).await?;

        fs::rename(&from, &to)
            .await
            .map_err(|e| Error::from_io(e, source))?;

        info!(source, destination, "Item moved");
        Ok(())
    }

    /// Delete a file, or a directory with everything beneath it.
    ///
    /// A recursive delete that fails partway leaves the remaining part of the
    /// subtree in place; nothing is restored.
    ///
    /// # Errors
    /// - `InvalidPath` from the sandbox
    /// - `InvalidRequest` for the vault root, or for anything that is neither a
    ///   regular file nor a directory
    /// - `NotFound` if the target is absent
    pub async fn delete(&self, relative: &str) -> Result<()> {
        debug!(path = relative, "Deleting item");

        let target = self.root.resolve(relative)?;
        if self.root.is_root(&target) {
            return Err(Error::InvalidRequest(
                "Cannot delete the root vault directory".to_string(),
            ));
        }

        let meta = probe(&target, relative)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Item '{}' not found", relative)))?;

        let file_type = meta.file_type();
        if file_type.is_file() {
            fs::remove_file(&target)
                .await
                .map_err(|e| Error::from_io(e, relative))?;
            info!(path = relative, "File deleted");
        } else if file_type.is_dir() {
            fs::remove_dir_all(&target)
                .await
                .map_err(|e| Error::from_io(e, relative))?;
            info!(path = relative, "Folder deleted");
        } else {
            return Err(Error::InvalidRequest(format!(
                "Item '{}' is not a file or directory",
                relative
            )));
        }

        Ok(())
    }

    /// Read a file's content.
    ///
    /// # Errors
    /// - `NotFound` if absent
    /// - `IsDirectory` if the path is a directory
    /// - `InvalidRequest` for symlinks and special files
    pub async fn read(&self, relative: &str) -> Result<Vec<u8>> {
        debug!(path = relative, "Reading file");

        let target = self.root.resolve(relative)?;
        let meta = probe(&target, relative)
            .await?
            .ok_or_else(|| Error::NotFound(format!("File '{}' not found", relative)))?;

        if meta.is_dir() {
            return Err(Error::IsDirectory(
                "Path is a directory, not a file".to_string(),
            ));
        }
        if !meta.is_file() {
            return Err(Error::InvalidRequest(format!(
                "Item '{}' is not a regular file",
                relative
            )));
        }

        let content = fs::read(&target)
            .await
            .map_err(|e| Error::from_io(e, relative))?;

        debug!(path = relative, size = content.len(), "File read");
        Ok(content)
    }

    /// Create or overwrite a file.
    ///
    /// # Postconditions
    /// - Missing parent directories are created
    /// - The file holds exactly `content`
    ///
    /// # Errors
    /// - `IsDirectory` if the path is the vault root or an existing directory
    /// - `InvalidRequest` if the path is a symlink or special file
    pub async fn write(&self, relative: &str, content: &[u8]) -> Result<()> {
        debug!(path = relative, size = content.len(), "Writing file");

        let target = self.root.resolve(relative)?;
        if self.root.is_root(&target) {
            return Err(Error::IsDirectory(
                "Path is a directory, cannot overwrite with a file".to_string(),
            ));
        }

        match probe(&target, relative).await? {
            Some(meta) if meta.is_dir() => {
                return Err(Error::IsDirectory(
                    "Path is a directory, cannot overwrite with a file".to_string(),
                ));
            }
            Some(meta) if !meta.is_file() => {
                return Err(Error::InvalidRequest(format!(
                    "Item '{}' is not a regular file",
                    relative
                )));
            }
            _ => {}
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::from_io(e, relative))?;
        }

        fs::write(&target, content)
            .await
            .map_err(|e| Error::from_io(e, relative))?;

        info!(path = relative, size = content.len(), "File written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notevault_common::ErrorKind;
    use tempfile::TempDir;

    fn vault() -> (TempDir, VaultRoot) {
        let temp = TempDir::new().unwrap();
        let root = VaultRoot::new(temp.path()).unwrap();
        (temp, root)
    }

    #[tokio::test]
    async fn test_create_file_with_parents() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);

        ops.create("notes/daily/today.md", ItemKind::File).await.unwrap();

        let path = temp.path().join("notes/daily/today.md");
        assert!(path.is_file());
        assert_eq!(std::fs::read(path).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_create_folder() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);

        ops.create("projects", ItemKind::Folder).await.unwrap();
        assert!(temp.path().join("projects").is_dir());
    }

    #[tokio::test]
    async fn test_create_existing_conflicts() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);

        ops.create("a.md", ItemKind::File).await.unwrap();
        let err = ops.create("a.md", ItemKind::Folder).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_create_requires_path() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);

        let err = ops.create("", ItemKind::File).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_create_strips_whitespace() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);

        ops.create("  notes/a.md \n", ItemKind::File).await.unwrap();
        assert!(temp.path().join("notes/a.md").is_file());

        let err = ops.create(" \t ", ItemKind::File).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_create_traversal_rejected() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);

        let err = ops.create("../escape.md", ItemKind::File).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPath);
        assert!(!temp.path().parent().unwrap().join("escape.md").exists());
    }

    #[tokio::test]
    async fn test_create_delete_create_leaves_no_residue() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);

        ops.create("x/y.md", ItemKind::File).await.unwrap();
        ops.delete("x/y.md").await.unwrap();
        ops.create("x/y.md", ItemKind::File).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp.path().join("x")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_rename_file() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.write("notes/todo.md", b"buy milk").await.unwrap();

        let outcome = ops.rename("notes/todo.md", "done.md").await.unwrap();
        assert_eq!(outcome.old_path, "notes/todo.md");
        assert_eq!(outcome.new_path, "notes/done.md");

        assert!(!temp.path().join("notes/todo.md").exists());
        assert_eq!(
            std::fs::read(temp.path().join("notes/done.md")).unwrap(),
            b"buy milk"
        );
    }

    #[tokio::test]
    async fn test_rename_directory_keeps_subtree() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.write("old/a/b.md", b"deep").await.unwrap();

        let outcome = ops.rename("old", "new").await.unwrap();
        assert_eq!(outcome.new_path, "new");
        assert_eq!(std::fs::read(temp.path().join("new/a/b.md")).unwrap(), b"deep");
        assert!(!temp.path().join("old").exists());
    }

    #[tokio::test]
    async fn test_rename_strips_whitespace() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.create("a.md", ItemKind::File).await.unwrap();

        let outcome = ops.rename("a.md", " b.md ").await.unwrap();
        assert_eq!(outcome.new_path, "b.md");
        assert!(temp.path().join("b.md").is_file());
        assert!(!temp.path().join(" b.md ").exists());
    }

    #[tokio::test]
    async fn test_rename_rejects_bad_names() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.create("a.md", ItemKind::File).await.unwrap();

        for name in ["", "  ", ".", "..", "x/y", "..\\..\\etc", "../escape"] {
            let err = ops.rename("a.md", name).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidPath, "{:?}", name);
        }
    }

    #[tokio::test]
    async fn test_rename_missing_and_conflict() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);

        let err = ops.rename("ghost.md", "b.md").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        ops.create("a.md", ItemKind::File).await.unwrap();
        ops.create("b.md", ItemKind::File).await.unwrap();
        let err = ops.rename("a.md", "b.md").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_rename_root_rejected() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);

        let err = ops.rename("", "other").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_rename_case_only() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.write("readme.md", b"r").await.unwrap();

        // Case-insensitive filesystems see the upper-case name as occupied.
        let case_insensitive = temp.path().join("README.md").exists();
        let result = ops.rename("readme.md", "README.md").await;

        if case_insensitive {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::Conflict);
        } else {
            let outcome = result.unwrap();
            assert_eq!(outcome.new_path, "README.md");
            assert!(!temp.path().join("readme.md").exists());
        }
    }

    #[tokio::test]
    async fn test_move_file_to_root() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.write("notes/done.md", b"x").await.unwrap();

        ops.move_item("notes/done.md", "done.md").await.unwrap();
        assert!(temp.path().join("done.md").is_file());
        assert!(!temp.path().join("notes/done.md").exists());
    }

    #[tokio::test]
    async fn test_move_strips_whitespace() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.write("inbox/a.md", b"x").await.unwrap();

        ops.move_item(" inbox/a.md", "archive/a.md  ").await.unwrap();
        assert!(temp.path().join("archive/a.md").is_file());
        assert!(!temp.path().join("inbox/a.md").exists());
    }

    #[tokio::test]
    async fn test_move_creates_destination_parents() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.write("a.md", b"x").await.unwrap();

        ops.move_item("a.md", "archive/2024/a.md").await.unwrap();
        assert!(temp.path().join("archive/2024/a.md").is_file());
    }

    #[tokio::test]
    async fn test_move_same_path_rejected() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.write("a.md", b"x").await.unwrap();

        let err = ops.move_item("a.md", "./a.md").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_move_folder_into_descendant_rejected() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.create("a/b/c", ItemKind::Folder).await.unwrap();

        for dest in ["a/b", "a/b/c/d", "a/x"] {
            let err = ops.move_item("a", dest).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest, "{}", dest);
        }
        assert!(temp.path().join("a/b/c").is_dir());
    }

    #[tokio::test]
    async fn test_move_folder_to_sibling_with_shared_prefix() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.write("a/note.md", b"x").await.unwrap();

        ops.move_item("a", "ab").await.unwrap();
        assert!(temp.path().join("ab/note.md").is_file());
    }

    #[tokio::test]
    async fn test_move_missing_and_conflict() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);

        let err = ops.move_item("ghost.md", "x.md").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        ops.write("a.md", b"a").await.unwrap();
        ops.write("b.md", b"b").await.unwrap();
        let err = ops.move_item("a.md", "b.md").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_move_root_rejected() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.create("dir", ItemKind::Folder).await.unwrap();

        let err = ops.move_item("", "dir/root").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_delete_root_always_fails() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);

        for path in ["", ".", "notes/..", "\\"] {
            let err = ops.delete(path).await.unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::InvalidRequest | ErrorKind::InvalidPath),
                "{:?}",
                path
            );
        }
        assert_eq!(ops.delete("").await.unwrap_err().kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_delete_recursive() {
        let (temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.write("notes/a/b.md", b"x").await.unwrap();
        ops.write("notes/c.md", b"y").await.unwrap();

        ops.delete("notes").await.unwrap();
        assert!(!temp.path().join("notes").exists());
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);

        let err = ops.delete("ghost.md").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_delete_symlink_rejected() {
        let (temp, root) = vault();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link")).unwrap();
        let ops = VaultOperations::new(&root);

        let err = ops.delete("link").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(outside.path().exists());
    }

    #[tokio::test]
    async fn test_read_and_write() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);

        ops.write("journal/2024.md", b"# Log").await.unwrap();
        assert_eq!(ops.read("journal/2024.md").await.unwrap(), b"# Log");

        ops.write("journal/2024.md", b"# New").await.unwrap();
        assert_eq!(ops.read("journal/2024.md").await.unwrap(), b"# New");
    }

    #[tokio::test]
    async fn test_read_errors() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.create("dir", ItemKind::Folder).await.unwrap();

        assert_eq!(ops.read("missing.md").await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(ops.read("dir").await.unwrap_err().kind(), ErrorKind::IsDirectory);
        assert_eq!(ops.read("../x").await.unwrap_err().kind(), ErrorKind::InvalidPath);
    }

    #[tokio::test]
    async fn test_write_to_directory_rejected() {
        let (_temp, root) = vault();
        let ops = VaultOperations::new(&root);
        ops.create("dir", ItemKind::Folder).await.unwrap();

        assert_eq!(ops.write("dir", b"x").await.unwrap_err().kind(), ErrorKind::IsDirectory);
        assert_eq!(ops.write("", b"x").await.unwrap_err().kind(), ErrorKind::IsDirectory);
    }
}
