//! Filesystem error types.

use std::io;
use thiserror::Error;

use crate::types::{NodeId, NodeKind};

/// rowfs error type.
#[derive(Debug, Error)]
pub enum FsError {
    /// Path is absolute, escapes the root, or names the root where a child is required.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A path component has no matching child under its parent.
    #[error("cannot find node: parent {parent}, name {name}")]
    NodeNotFound { parent: NodeId, name: String },

    /// An existing node has the wrong kind for its position or for the operation.
    #[error("incorrect file type: {path} is a {found}")]
    IncorrectType { path: String, found: NodeKind },

    /// Directory still has children.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// Chunk size must be at least one byte.
    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    /// Reader or lister has nothing more to return.
    #[error("end of stream")]
    EndOfStream,

    /// Operation on a handle after `close`.
    #[error("handle closed: {0}")]
    Closed(String),

    /// Failure reported by SQLite.
    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The transaction failed and so did its rollback.
    #[error("{source}; rollback also failed: {rollback}")]
    RollbackFailed {
        #[source]
        source: Box<FsError>,
        rollback: rusqlite::Error,
    },

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a NodeNotFound error.
    pub fn node_not_found(parent: NodeId, name: impl Into<String>) -> Self {
        Self::NodeNotFound {
            parent,
            name: name.into(),
        }
    }

    /// Create an IncorrectType error.
    pub fn incorrect_type(path: impl Into<String>, found: NodeKind) -> Self {
        Self::IncorrectType {
            path: path.into(),
            found,
        }
    }

    /// Create a DirectoryNotEmpty error.
    pub fn directory_not_empty(path: impl Into<String>) -> Self {
        Self::DirectoryNotEmpty(path.into())
    }

    /// Create a Closed error.
    pub fn closed(path: impl Into<String>) -> Self {
        Self::Closed(path.into())
    }

    /// Wrap a SQLite error with a description of what was being done.
    pub fn store(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Prefix store failures with the public operation and path they happened under.
    ///
    /// Other variants already carry their own path context and pass through.
    pub(crate) fn during(self, op: &str, path: &str) -> Self {
        match self {
            Self::Store { context, source } => Self::Store {
                context: format!("{op} {path}: {context}"),
                source,
            },
            Self::RollbackFailed { source, rollback } => Self::RollbackFailed {
                source: Box::new(source.during(op, path)),
                rollback,
            },
            other => other,
        }
    }

    /// Returns true for the end-of-stream marker.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

/// Convert FsError to std::io::Error for compatibility.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            e @ FsError::NodeNotFound { .. } => io::Error::new(io::ErrorKind::NotFound, e),
            FsError::IncorrectType { path, found } => match found {
                NodeKind::Directory => io::Error::new(io::ErrorKind::IsADirectory, path),
                NodeKind::File => io::Error::new(io::ErrorKind::NotADirectory, path),
            },
            FsError::DirectoryNotEmpty(msg) => {
                io::Error::new(io::ErrorKind::DirectoryNotEmpty, msg)
            }
            e @ FsError::InvalidChunkSize(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
            FsError::EndOfStream => io::Error::from(io::ErrorKind::UnexpectedEof),
            FsError::Closed(msg) => io::Error::new(io::ErrorKind::BrokenPipe, msg),
            FsError::Io(e) => e,
            other => io::Error::other(other),
        }
    }
}

/// rowfs result type.
pub type FsResult<T> = Result<T, FsError>;
