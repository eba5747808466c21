//! Create-or-reuse of a file and its ancestor directories.
//!
//! The walk has two phases. While components keep resolving, each found node
//! is checked against the kind its position requires: directory for every
//! component but the last, regular file for the last. At the first miss the
//! walk switches to inserting, and every remaining component is created
//! without any further lookup since none of them can exist yet.
//!
//! Nothing here commits. The caller's transaction owns every insert, so a
//! failure part-way leaves the tree untouched once it is rolled back.

use rusqlite::{Connection, params};

use crate::error::{FsError, FsResult};
use crate::namei;
use crate::path;
use crate::types::{NodeId, NodeKind};

/// Kind required for the component at `index` of a path with `len` components.
fn kind_at(index: usize, len: usize) -> NodeKind {
    if index + 1 < len {
        NodeKind::Directory
    } else {
        NodeKind::File
    }
}

/// Insert one node and return its new id.
pub fn insert_node(
    conn: &Connection,
    parent: NodeId,
    name: &str,
    kind: NodeKind,
) -> FsResult<NodeId> {
    let mut stmt = conn
        .prepare_cached("INSERT INTO nodes (name, parent, kind) VALUES (?1, ?2, ?3)")
        .map_err(|e| FsError::store("cannot prepare node insert", e))?;
    stmt.execute(params![name, parent, kind]).map_err(|e| {
        FsError::store(format!("cannot insert node {name} as child of {parent}"), e)
    })?;
    let id = NodeId::from_raw(conn.last_insert_rowid());
    tracing::debug!(%id, %parent, name, %kind, "inserted node");
    Ok(id)
}

/// Make sure `components` names a regular file, creating whatever is missing.
///
/// Returns the file's id. `components` must not be empty.
pub fn ensure_file(conn: &Connection, root: NodeId, components: &[&str]) -> FsResult<NodeId> {
    let len = components.len();
    let mut parent = root;
    let mut probing = true;

    for (i, name) in components.iter().enumerate() {
        let wanted = kind_at(i, len);

        if probing {
            match namei::lookup(conn, parent, name)? {
                Some(found) if found.kind == wanted => {
                    parent = found.id;
                    continue;
                }
                Some(found) => {
                    return Err(FsError::incorrect_type(
                        path::prefix(components, i + 1),
                        found.kind,
                    ));
                }
                None => probing = false,
            }
        }

        parent = insert_node(conn, parent, name, wanted)?;
    }

    Ok(parent)
}
