//! Common error types for NoteVault.
//!
//! Every store operation reports failures through [`Error`]. Filesystem errors
//! are classified on the way in (see [`Error::from_io`]) so transports only
//! ever see the stable taxonomy below.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Top-level error type for NoteVault operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input or an attempt to escape the vault root.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Target does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Target already exists where absence was required.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Well-formed but semantically illegal request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A file operation was aimed at a directory.
    #[error("Is a directory: {0}")]
    IsDirectory(String),

    /// The filesystem denied the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A move would cross filesystems.
    #[error("Cross-device move: {0}")]
    CrossDevice(String),

    /// Configuration could not be loaded or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything unclassified.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Transport-neutral discriminant of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidPath,
    NotFound,
    Conflict,
    InvalidRequest,
    IsDirectory,
    PermissionDenied,
    CrossDevice,
    Config,
    Internal,
}

impl ErrorKind {
    /// Whether the caller caused this error.
    ///
    /// Client errors are never worth retrying with the same input.
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            Self::InvalidPath
                | Self::NotFound
                | Self::Conflict
                | Self::InvalidRequest
                | Self::IsDirectory
                | Self::CrossDevice
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidPath => "invalid_path",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidRequest => "invalid_request",
            Self::IsDirectory => "is_directory",
            Self::PermissionDenied => "permission_denied",
            Self::CrossDevice => "cross_device",
            Self::Config => "config",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Classify a filesystem error.
    ///
    /// `context` names what was being attempted (usually the vault-relative
    /// path) and is folded into the message.
    pub fn from_io(err: io::Error, context: impl fmt::Display) -> Self {
        let message = format!("{}: {}", context, err);
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(message),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(message),
            io::ErrorKind::AlreadyExists | io::ErrorKind::DirectoryNotEmpty => {
                Self::Conflict(message)
            }
            io::ErrorKind::CrossesDevices => Self::CrossDevice(message),
            io::ErrorKind::IsADirectory => Self::IsDirectory(message),
            io::ErrorKind::NotADirectory => Self::InvalidPath(message),
            _ => Self::Internal(message),
        }
    }

    /// Get the discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath(_) => ErrorKind::InvalidPath,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::IsDirectory(_) => ErrorKind::IsDirectory,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::CrossDevice(_) => ErrorKind::CrossDevice,
            Self::Config(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Human-readable message without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidPath(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::InvalidRequest(m)
            | Self::IsDirectory(m)
            | Self::PermissionDenied(m)
            | Self::CrossDevice(m)
            | Self::Config(m)
            | Self::Internal(m) => m,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::from_io(err, "filesystem")
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
