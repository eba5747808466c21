//! Path resolution.
//!
//! Walks path components from the root, one indexed `(parent, name)` lookup
//! per component. Callers pass the transaction they are running in, so a
//! walk inside a write sees that write's own inserts.

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{FsError, FsResult};
use crate::types::{NodeId, NodeKind};

const LOOKUP: &str = "SELECT id, kind FROM nodes WHERE parent = ?1 AND name = ?2";

/// A resolved node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub id: NodeId,
    pub kind: NodeKind,
}

/// Find the child of `parent` called `name`, if any.
pub fn lookup(conn: &Connection, parent: NodeId, name: &str) -> FsResult<Option<Resolved>> {
    let mut stmt = conn
        .prepare_cached(LOOKUP)
        .map_err(|e| FsError::store("cannot prepare lookup statement", e))?;
    stmt.query_row(params![parent, name], |row| {
        Ok(Resolved {
            id: row.get(0)?,
            kind: row.get(1)?,
        })
    })
    .optional()
    .map_err(|e| FsError::store(format!("querying nodes: parent {parent}, name {name}"), e))
}

/// Resolve `components` starting at `root`.
///
/// An empty component list resolves to the root directory.
pub fn resolve(conn: &Connection, root: NodeId, components: &[&str]) -> FsResult<Resolved> {
    let mut current = Resolved {
        id: root,
        kind: NodeKind::Directory,
    };
    for name in components {
        current = lookup(conn, current.id, name)?
            .ok_or_else(|| FsError::node_not_found(current.id, *name))?;
    }
    Ok(current)
}
