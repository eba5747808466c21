//! Core node types.
//!
//! A node is one row of the `nodes` table. Directory entries and metadata are
//! the caller-facing projections of that row plus the size of its chunks.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Surrogate identifier of a node (the SQLite rowid).
///
/// Identifiers grow monotonically and are never reused within a store.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(i64);

impl NodeId {
    /// Wrap a raw rowid.
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw rowid.
    pub fn as_raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for NodeId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for NodeId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self)
    }
}

/// Kind of node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Directory.
    Directory,
    /// Regular file.
    File,
}

impl NodeKind {
    /// Code stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Directory => "d",
            NodeKind::File => "f",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "d" => Some(NodeKind::Directory),
            "f" => Some(NodeKind::File),
            _ => None,
        }
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Directory => f.write_str("directory"),
            NodeKind::File => f.write_str("regular file"),
        }
    }
}

impl ToSql for NodeKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for NodeKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_str()?;
        NodeKind::from_code(code).ok_or_else(|| {
            FromSqlError::Other(format!("unknown node kind {code:?}").into())
        })
    }
}

/// Attributes reported by `stat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Final path component (`.` for the root).
    pub name: String,
    /// Node kind.
    pub kind: NodeKind,
    /// Sum of the node's chunk sizes; always 0 for directories.
    pub size: u64,
}

impl Metadata {
    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Node identifier; entries are listed in ascending order of it.
    pub id: NodeId,
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: NodeKind,
    /// Content size for files, 0 for directories.
    pub size: u64,
}

impl DirEntry {
    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// View the entry as [`Metadata`].
    pub fn metadata(&self) -> Metadata {
        Metadata {
            name: self.name.clone(),
            kind: self.kind,
            size: self.size,
        }
    }
}
