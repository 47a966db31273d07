//! Path sandbox.
//!
//! Turns caller-supplied vault-relative paths into absolute paths that are
//! guaranteed to be the vault root or one of its descendants. Resolution is
//! purely lexical: nothing here touches the filesystem.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use notevault_common::{Error, Result};

/// The directory a store is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultRoot {
    path: PathBuf,
}

impl VaultRoot {
    /// Create a vault root.
    ///
    /// Relative roots are made absolute against the current directory, and the
    /// result is lexically normalized once here so containment checks can be
    /// plain component comparisons.
    ///
    /// # Errors
    /// - Root path is empty
    /// - Current directory cannot be determined (relative roots only)
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(Error::Config("Vault root cannot be empty".to_string()));
        }

        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| Error::from_io(e, "current directory"))?
                .join(root)
        };

        Ok(Self {
            path: normalize_lexically(&absolute),
        })
    }

    /// Absolute, normalized root path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a vault-relative path.
    ///
    /// Backslashes are treated as separators. The empty string resolves to the
    /// root itself; callers decide per operation whether that is allowed.
    ///
    /// # Errors
    /// - `InvalidPath` for absolute input, NUL bytes, or any path that
    ///   normalizes outside the root
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        if relative.contains('\0') {
            return Err(Error::InvalidPath(
                "Path cannot contain NUL bytes".to_string(),
            ));
        }

        let sanitized = relative.replace('\\', "/");
        if is_absolute_input(&sanitized) {
            warn!(path = relative, "Rejected absolute path");
            return Err(Error::InvalidPath(
                "Path cannot be an absolute path".to_string(),
            ));
        }

        let candidate = normalize_lexically(&self.path.join(&sanitized));
        if !self.contains(&candidate) {
            warn!(path = relative, "Rejected directory traversal attempt");
            return Err(Error::InvalidPath(
                "Attempted directory traversal or invalid path construction".to_string(),
            ));
        }

        Ok(candidate)
    }

    /// Whether `path` is the root or lies beneath it.
    ///
    /// Comparison is per component, so `/vault-old` is not inside `/vault`.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }

    /// Whether `path` is exactly the root.
    pub fn is_root(&self, path: &Path) -> bool {
        path == self.path
    }

    /// Vault-relative, `/`-separated form of a resolved path.
    ///
    /// Returns the empty string for the root and for paths outside it.
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.path)
            .map(|rest| {
                rest.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }
}

/// Collapse `.` and `..` components without consulting the filesystem.
///
/// `..` never climbs above the filesystem root of an absolute path; leading
/// `..` of a relative path are preserved.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

/// Absolute after separator normalization: rooted, or a drive-letter prefix.
fn is_absolute_input(sanitized: &str) -> bool {
    if sanitized.starts_with('/') || Path::new(sanitized).is_absolute() {
        return true;
    }
    let bytes = sanitized.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

#[cfg(test)]
mod tests {
    use super::*;
    use notevault_common::ErrorKind;
    use proptest::prelude::*;

    fn root() -> VaultRoot {
        VaultRoot::new("/srv/vault-root").unwrap()
    }

    #[test]
    fn test_resolve_simple() {
        let root = root();
        let resolved = root.resolve("notes/todo.md").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/vault-root/notes/todo.md"));
    }

    #[test]
    fn test_resolve_empty_is_root() {
        let root = root();
        let resolved = root.resolve("").unwrap();
        assert!(root.is_root(&resolved));
    }

    #[test]
    fn test_resolve_backslashes() {
        let root = root();
        let resolved = root.resolve("notes\\daily\\a.md").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/vault-root/notes/daily/a.md"));
    }

    #[test]
    fn test_resolve_inner_parent_dirs() {
        let root = root();
        let resolved = root.resolve("notes/../todo.md").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/vault-root/todo.md"));
        assert!(root.is_root(&root.resolve("notes/..").unwrap()));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let root = root();
        for attempt in ["..", "../etc/passwd", "notes/../../x", "..\\..\\x", "./../x"] {
            let err = root.resolve(attempt).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidPath, "{}", attempt);
        }
    }

    #[test]
    fn test_resolve_rejects_sibling_with_shared_prefix() {
        let root = root();
        let err = root.resolve("../vault-root-old/secret").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPath);
    }

    #[test]
    fn test_resolve_reentering_root_is_contained() {
        let root = root();
        let resolved = root.resolve("../vault-root/a.md").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/vault-root/a.md"));
    }

    #[test]
    fn test_resolve_rejects_absolute() {
        let root = root();
        for attempt in ["/etc/passwd", "\\etc\\passwd", "C:\\Windows", "c:/x"] {
            let err = root.resolve(attempt).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidPath, "{}", attempt);
        }
    }

    #[test]
    fn test_resolve_rejects_nul() {
        assert!(root().resolve("a\0b").is_err());
    }

    #[test]
    fn test_relative_form() {
        let root = root();
        let resolved = root.resolve("notes\\todo.md").unwrap();
        assert_eq!(root.relative(&resolved), "notes/todo.md");
        assert_eq!(root.relative(root.path()), "");
    }

    #[test]
    fn test_relative_root_is_made_absolute() {
        let root = VaultRoot::new("some/vault/./dir/..").unwrap();
        assert!(root.path().is_absolute());
        assert!(root.path().ends_with("some/vault"));
    }

    #[test]
    fn test_empty_root_rejected() {
        assert!(VaultRoot::new("").is_err());
    }

    #[test]
    fn test_normalize_never_climbs_above_fs_root() {
        assert_eq!(normalize_lexically(Path::new("/a/../../..")), PathBuf::from("/"));
        assert_eq!(normalize_lexically(Path::new("../a/./b")), PathBuf::from("../a/b"));
    }

    fn segment() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("a"), Just("b"), Just(".."), Just("."), Just("")]
    }

    fn separator() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("/"), Just("\\")]
    }

    proptest! {
        #[test]
        fn prop_escaping_paths_are_rejected(
            parts in proptest::collection::vec((segment(), separator()), 1..12)
        ) {
            let mut input = String::new();
            let mut depth: i32 = 0;
            let mut escaped = false;
            for (seg, sep) in &parts {
                input.push_str(seg);
                input.push_str(sep);
                match *seg {
                    ".." => depth -= 1,
                    "." | "" => {}
                    _ => depth += 1,
                }
                if depth < 0 {
                    escaped = true;
                }
            }

            let rejected = escaped || input.starts_with('/') || input.starts_with('\\');

            let root = root();
            match root.resolve(&input) {
                Ok(resolved) => {
                    prop_assert!(!rejected, "{} escaped but resolved", input);
                    prop_assert!(root.contains(&resolved));
                }
                Err(err) => {
                    prop_assert!(rejected, "{} rejected but stays inside", input);
                    prop_assert_eq!(err.kind(), ErrorKind::InvalidPath);
                }
            }
        }

        #[test]
        fn prop_resolve_is_idempotent(input in "[a-z./\\\\]{0,24}") {
            let root = root();
            let first = root.resolve(&input).map_err(|e| e.kind());
            let second = root.resolve(&input).map_err(|e| e.kind());
            prop_assert_eq!(first, second);
        }
    }
}
