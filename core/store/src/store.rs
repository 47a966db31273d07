//! Store abstraction and the local filesystem implementation.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::StoreConfig;
use crate::operations::VaultOperations;
use crate::sandbox::VaultRoot;
use crate::tree::build_tree;
use notevault_common::{Error, ItemKind, Node, RenameOutcome, Result};

/// Operations a vault exposes to transports.
///
/// Every path argument is vault-relative and `/`- or `\`-separated.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// The root this store is scoped to.
    fn root(&self) -> &VaultRoot;

    /// Ordered snapshot of the whole vault.
    async fn list(&self) -> Result<Vec<Node>>;

    /// Read a file.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Create or overwrite a file.
    async fn write(&self, path: &str, content: Vec<u8>) -> Result<()>;

    /// Create an empty file or folder.
    async fn create(&self, path: &str, kind: ItemKind) -> Result<()>;

    /// Rename an item within its directory.
    async fn rename(&self, path: &str, new_name: &str) -> Result<RenameOutcome>;

    /// Move an item anywhere inside the vault.
    async fn move_item(&self, source: &str, destination: &str) -> Result<()>;

    /// Delete a file or directory tree.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// Vault backed by a local directory.
///
/// Writes and structural mutations hold a per-vault writer lock for their
/// whole check-then-act sequence, so two requests touching overlapping paths
/// cannot interleave their probes. Reads and listings do not take the lock.
pub struct LocalVault {
    root: VaultRoot,
    write_lock: Mutex<()>,
}

impl LocalVault {
    /// Create a store scoped to `root`.
    pub fn new(root: VaultRoot) -> Self {
        Self {
            root,
            write_lock: Mutex::new(()),
        }
    }

    /// Open a store from configuration.
    ///
    /// # Errors
    /// - Invalid root path
    /// - Root creation failed (only with `create_root`)
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let root = VaultRoot::new(&config.root)?;

        if config.create_root {
            std::fs::create_dir_all(root.path())
                .map_err(|e| Error::from_io(e, root.path().display()))?;
        }

        debug!(root = %root.path().display(), "Vault opened");
        Ok(Self::new(root))
    }

    fn ops(&self) -> VaultOperations<'_> {
        VaultOperations::new(&self.root)
    }
}

#[async_trait]
impl VaultStore for LocalVault {
    fn root(&self) -> &VaultRoot {
        &self.root
    }

    async fn list(&self) -> Result<Vec<Node>> {
        let root = self.root.path().to_path_buf();
        tokio::task::spawn_blocking(move || build_tree(&root))
            .await
            .map_err(|e| Error::Internal(format!("Tree walk aborted: {}", e)))?
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.ops().read(path).await
    }

    async fn write(&self, path: &str, content: Vec<u8>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.ops().write(path, &content).await
    }

    async fn create(&self, path: &str, kind: ItemKind) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.ops().create(path, kind).await
    }

    async fn rename(&self, path: &str, new_name: &str) -> Result<RenameOutcome> {
        let _guard = self.write_lock.lock().await;
        self.ops().rename(path, new_name).await
    }

    async fn move_item(&self, source: &str, destination: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.ops().move_item(source, destination).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.ops().delete(path).await
    }
}
