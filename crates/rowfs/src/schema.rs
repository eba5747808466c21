//! Table layout and bootstrap.
//!
//! Two relations hold the whole filesystem:
//!
//! - `nodes`: one row per file or directory, linked to its parent by id.
//!   `(parent, name)` is unique, so sibling names never repeat.
//! - `chunks`: file content split into numbered blocks, keyed by
//!   `(node_id, position)`.
//!
//! The root is the single row with a NULL parent, named `/`.

use rusqlite::{Connection, OptionalExtension, params};

use crate::config::StoreConfig;
use crate::error::{FsError, FsResult};
use crate::types::{NodeId, NodeKind};

/// Name stored on the root row.
pub const ROOT_NAME: &str = "/";

const SCHEMA: &str = r#"
-- Tree structure. AUTOINCREMENT keeps ids from ever being reused.
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    parent INTEGER REFERENCES nodes(id),
    kind TEXT NOT NULL CHECK (kind IN ('d', 'f')),
    UNIQUE (parent, name)
);

-- File content, contiguous positions from 0
CREATE TABLE IF NOT EXISTS chunks (
    node_id INTEGER NOT NULL REFERENCES nodes(id),
    position INTEGER NOT NULL CHECK (position >= 0),
    data BLOB NOT NULL,
    size INTEGER NOT NULL,
    PRIMARY KEY (node_id, position)
);
"#;

/// Apply connection settings from `config`.
pub fn configure(conn: &Connection, config: &StoreConfig) -> FsResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|e| FsError::store("enable foreign keys", e))?;
    conn.busy_timeout(config.busy_timeout())
        .map_err(|e| FsError::store("set busy timeout", e))?;
    if let Some(mode) = &config.journal_mode {
        // journal_mode reports the resulting mode as a row
        let applied: String = conn
            .query_row(&format!("PRAGMA journal_mode = {mode}"), [], |row| row.get(0))
            .map_err(|e| FsError::store(format!("set journal mode {mode}"), e))?;
        tracing::debug!(requested = %mode, applied = %applied, "journal mode set");
    }
    Ok(())
}

/// Create the tables if needed and make sure the root exists.
///
/// Returns the root's id. Safe to run against an already initialized store.
pub fn bootstrap(conn: &mut Connection) -> FsResult<NodeId> {
    let tx = conn
        .transaction()
        .map_err(|e| FsError::store("begin bootstrap", e))?;
    tx.execute_batch(SCHEMA)
        .map_err(|e| FsError::store("create tables", e))?;

    let existing: Option<NodeId> = tx
        .query_row("SELECT id FROM nodes WHERE parent IS NULL", [], |row| row.get(0))
        .optional()
        .map_err(|e| FsError::store("look up root node", e))?;

    let root = match existing {
        Some(root) => root,
        None => {
            tx.execute(
                "INSERT INTO nodes (name, parent, kind) VALUES (?1, NULL, ?2)",
                params![ROOT_NAME, NodeKind::Directory],
            )
            .map_err(|e| FsError::store("insert root node", e))?;
            let root = NodeId::from_raw(tx.last_insert_rowid());
            tracing::debug!(%root, "created root node");
            root
        }
    };

    tx.commit()
        .map_err(|e| FsError::store("commit bootstrap", e))?;
    Ok(root)
}
