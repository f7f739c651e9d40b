//! Error types for jit_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using jit_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during repository operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error outside of the object write path.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Writing an object failed (anything but the object already existing).
    #[error("Failed to write object {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another holder owns the lock path.
    #[error("Unable to acquire lock {path}: another update is in progress")]
    LockContention { path: PathBuf },

    /// The directory that should contain the lock path does not exist.
    #[error("Missing parent directory for lock {path}")]
    MissingParent { path: PathBuf },

    /// Permission denied while creating the lock path.
    #[error("No permission to create lock {path}")]
    NoPermission { path: PathBuf },

    /// Write, commit or rollback attempted without holding the lock.
    #[error("Not holding lock on file: {path}")]
    StaleLock { path: PathBuf },

    /// Invalid object id format or encoding.
    #[error("Invalid object id: {reason}")]
    InvalidObjectId { reason: String },

    /// Invalid tree entry.
    #[error("Invalid tree entry: {reason}")]
    InvalidTreeEntry { reason: String },

    /// Unrecognized tree entry mode.
    #[error("Invalid mode: {mode}")]
    InvalidMode { mode: String },

    /// Author identity that cannot be encoded.
    #[error("Invalid author: {reason}")]
    InvalidAuthor { reason: String },

    /// HEAD holds something other than an object id.
    #[error("Invalid HEAD at {path}: {reason}")]
    InvalidHead { path: PathBuf, reason: String },

    /// Repository is missing or misconfigured.
    #[error("Invalid repository at {path}: {reason}")]
    InvalidRepository { path: PathBuf, reason: String },

    /// Encoded object bytes do not parse.
    #[error("Corrupted object: {reason}")]
    CorruptedObject { reason: String },

    /// A directory references a sub-directory that was never built.
    #[error("Missing subtree for directory: {path}")]
    MissingSubtree { path: PathBuf },
}

impl Error {
    /// Create a StoreWrite error.
    pub fn store_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::StoreWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a LockContention error.
    pub fn lock_contention(path: impl Into<PathBuf>) -> Self {
        Error::LockContention { path: path.into() }
    }

    /// Create a MissingParent error.
    pub fn missing_parent(path: impl Into<PathBuf>) -> Self {
        Error::MissingParent { path: path.into() }
    }

    /// Create a NoPermission error.
    pub fn no_permission(path: impl Into<PathBuf>) -> Self {
        Error::NoPermission { path: path.into() }
    }

    /// Create a StaleLock error.
    pub fn stale_lock(path: impl Into<PathBuf>) -> Self {
        Error::StaleLock { path: path.into() }
    }

    /// Create an InvalidObjectId error.
    pub fn invalid_object_id(reason: impl Into<String>) -> Self {
        Error::InvalidObjectId {
            reason: reason.into(),
        }
    }

    /// Create an InvalidTreeEntry error.
    pub fn invalid_tree_entry(reason: impl Into<String>) -> Self {
        Error::InvalidTreeEntry {
            reason: reason.into(),
        }
    }

    /// Create an InvalidMode error.
    pub fn invalid_mode(mode: impl Into<String>) -> Self {
        Error::InvalidMode { mode: mode.into() }
    }

    /// Create an InvalidAuthor error.
    pub fn invalid_author(reason: impl Into<String>) -> Self {
        Error::InvalidAuthor {
            reason: reason.into(),
        }
    }

    /// Create an InvalidHead error.
    pub fn invalid_head(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidHead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidRepository error.
    pub fn invalid_repository(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidRepository {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a CorruptedObject error.
    pub fn corrupted_object(reason: impl Into<String>) -> Self {
        Error::CorruptedObject {
            reason: reason.into(),
        }
    }

    /// Create a MissingSubtree error.
    pub fn missing_subtree(path: impl Into<PathBuf>) -> Self {
        Error::MissingSubtree { path: path.into() }
    }

    /// Whether this is a lock contention (the caller may retry later).
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, Error::LockContention { .. })
    }
}

// Additional From implementations for external error types

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}
