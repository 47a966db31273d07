//! NoteVault CLI - Command line interface for vault operations.
//!
//! This tool serves a vault over HTTP, or runs single store operations
//! against it directly.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use notevault_common::{ItemKind, NodeType};
use notevault_server::ServerConfig;
use notevault_store::{LocalVault, StoreConfig, TreeWalker, VaultStore};

#[derive(Parser)]
#[command(name = "notevault")]
#[command(about = "NoteVault - Sandboxed note vault")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Vault root directory.
    #[arg(short, long, default_value = "vault")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the vault over HTTP.
    Serve {
        /// Listen address.
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// JSON server configuration; overrides --root.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Create the vault root if it does not exist.
        #[arg(long)]
        create_root: bool,
    },

    /// Print the vault tree.
    Tree,

    /// Print a file.
    Cat {
        /// Path within the vault.
        path: String,
    },

    /// Write a file from another file or stdin.
    Put {
        /// Path within the vault.
        path: String,

        /// Source file (default: stdin).
        #[arg(short, long)]
        from: Option<PathBuf>,
    },

    /// Create an empty file or folder.
    Create {
        /// Path within the vault.
        path: String,

        /// "file" or "folder".
        #[arg(short, long, default_value = "file")]
        kind: String,
    },

    /// Rename an item within its folder.
    Rename {
        /// Path within the vault.
        path: String,

        /// New name (no separators).
        new_name: String,
    },

    /// Move an item.
    Mv {
        /// Source path within the vault.
        source: String,

        /// Destination path within the vault.
        dest: String,
    },

    /// Delete a file or folder.
    Rm {
        /// Path within the vault.
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Serve {
            bind,
            config,
            create_root,
        } => cmd_serve(&cli.root, bind, config, create_root).await,

        Commands::Tree => cmd_tree(&cli.root),

        Commands::Cat { path } => cmd_cat(&cli.root, &path).await,

        Commands::Put { path, from } => cmd_put(&cli.root, &path, from).await,

        Commands::Create { path, kind } => cmd_create(&cli.root, &path, &kind).await,

        Commands::Rename { path, new_name } => cmd_rename(&cli.root, &path, &new_name).await,

        Commands::Mv { source, dest } => cmd_mv(&cli.root, &source, &dest).await,

        Commands::Rm { path } => cmd_rm(&cli.root, &path).await,
    }
}

/// Open the vault at `root`.
fn open_vault(root: &Path) -> Result<LocalVault> {
    LocalVault::open(&StoreConfig::new(root)).context("Failed to open vault")
}

/// Serve the vault over HTTP.
async fn cmd_serve(
    root: &Path,
    bind: Option<SocketAddr>,
    config: Option<PathBuf>,
    create_root: bool,
) -> Result<()> {
    let mut server_config = match config {
        Some(path) => ServerConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ServerConfig::new(StoreConfig::new(root).with_create_root(create_root)),
    };
    if let Some(bind) = bind {
        server_config = server_config.with_bind(bind);
    }

    info!("Starting server on {}", server_config.bind);
    notevault_server::serve(server_config)
        .await
        .context("Server failed")?;

    Ok(())
}

/// Print the vault tree, streaming one directory at a time.
fn cmd_tree(root: &Path) -> Result<()> {
    let vault = open_vault(root)?;
    println!("{}", vault.root().path().display());

    let mut entries = 0usize;
    let mut files = 0usize;
    for entry in TreeWalker::new(vault.root().path()) {
        let entry = entry.context("Failed to walk vault")?;
        let indent = "  ".repeat(entry.depth + 1);
        let name = entry.path.rsplit('/').next().unwrap_or(&entry.path);

        match entry.node_type {
            NodeType::Directory => println!("{}{}/", indent, name),
            NodeType::File => {
                files += 1;
                println!("{}{}", indent, name);
            }
        }
        entries += 1;
    }

    if entries == 0 {
        println!("Vault is empty.");
    } else {
        println!("\n{} file(s)", files);
    }

    Ok(())
}

/// Print a file.
async fn cmd_cat(root: &Path, path: &str) -> Result<()> {
    let vault = open_vault(root)?;
    let content = vault.read(path).await.context("Failed to read file")?;
    print!("{}", String::from_utf8_lossy(&content));
    Ok(())
}

/// Write a file.
async fn cmd_put(root: &Path, path: &str, from: Option<PathBuf>) -> Result<()> {
    let content = match from {
        Some(source) => tokio::fs::read(&source)
            .await
            .with_context(|| format!("Failed to read {}", source.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let size = content.len();
    let vault = open_vault(root)?;
    vault
        .write(path, content)
        .await
        .context("Failed to write file")?;

    println!("File saved: {} ({} bytes)", path, size);
    Ok(())
}

/// Create an empty file or folder.
async fn cmd_create(root: &Path, path: &str, kind: &str) -> Result<()> {
    let kind: ItemKind = kind.parse().context("Invalid kind")?;
    let vault = open_vault(root)?;
    vault
        .create(path, kind)
        .await
        .context("Failed to create item")?;

    println!("Created {}: {}", kind, path);
    Ok(())
}

/// Rename an item.
async fn cmd_rename(root: &Path, path: &str, new_name: &str) -> Result<()> {
    let vault = open_vault(root)?;
    let outcome = vault
        .rename(path, new_name)
        .await
        .context("Failed to rename item")?;

    println!("Renamed {} -> {}", outcome.old_path, outcome.new_path);
    Ok(())
}

/// Move an item.
async fn cmd_mv(root: &Path, source: &str, dest: &str) -> Result<()> {
    let vault = open_vault(root)?;
    vault
        .move_item(source, dest)
        .await
        .context("Failed to move item")?;

    println!("Moved {} -> {}", source, dest);
    Ok(())
}

/// Delete an item.
async fn cmd_rm(root: &Path, path: &str) -> Result<()> {
    let vault = open_vault(root)?;
    vault.delete(path).await.context("Failed to delete item")?;

    println!("Deleted: {}", path);
    Ok(())
}
