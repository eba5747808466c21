//! Chunked file content.
//!
//! A file's bytes live in `chunks` rows at positions `0..k`, each at most the
//! chunk size it was written with and only the last one shorter. Content is
//! only ever replaced as a whole set inside the caller's transaction.

use rusqlite::{Connection, params};

use crate::error::{FsError, FsResult};
use crate::types::NodeId;

/// Replace the content of `node` with `data`, split into `chunk_size` pieces.
///
/// Returns the number of chunks written. Empty data writes no chunks.
pub fn replace(conn: &Connection, node: NodeId, chunk_size: usize, data: &[u8]) -> FsResult<usize> {
    if chunk_size == 0 {
        return Err(FsError::InvalidChunkSize(chunk_size));
    }

    let removed = delete_all(conn, node)?;

    let mut stmt = conn
        .prepare_cached("INSERT INTO chunks (node_id, position, data, size) VALUES (?1, ?2, ?3, ?4)")
        .map_err(|e| FsError::store("cannot prepare chunk insert", e))?;
    let mut written = 0;
    for (position, piece) in data.chunks(chunk_size).enumerate() {
        stmt.execute(params![node, position as i64, piece, piece.len() as i64])
            .map_err(|e| {
                FsError::store(format!("cannot insert chunk {position} of node {node}"), e)
            })?;
        written += 1;
    }

    tracing::debug!(%node, removed, written, chunk_size, bytes = data.len(), "replaced chunks");
    Ok(written)
}

/// Remove every chunk of `node`, returning how many were removed.
pub fn delete_all(conn: &Connection, node: NodeId) -> FsResult<usize> {
    conn.execute("DELETE FROM chunks WHERE node_id = ?1", params![node])
        .map_err(|e| FsError::store(format!("cannot delete chunks of node {node}"), e))
}

/// Sum of the chunk sizes of `node`; 0 when it has none.
pub fn total_size(conn: &Connection, node: NodeId) -> FsResult<u64> {
    let size: i64 = conn
        .prepare_cached("SELECT COALESCE(SUM(size), 0) FROM chunks WHERE node_id = ?1")
        .and_then(|mut stmt| stmt.query_row(params![node], |row| row.get(0)))
        .map_err(|e| FsError::store(format!("cannot sum chunk sizes of node {node}"), e))?;
    Ok(size as u64)
}

/// Number of chunks stored for `node`.
#[cfg(test)]
pub fn count(conn: &Connection, node: NodeId) -> FsResult<u64> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM chunks WHERE node_id = ?1", params![node], |row| {
            row.get(0)
        })
        .map_err(|e| FsError::store(format!("cannot count chunks of node {node}"), e))?;
    Ok(n as u64)
}
