//! Byte-range reads over chunked content.
//!
//! A read never loads the whole file. Each call asks SQLite for the running
//! start offset of every chunk (a window-function prefix sum over chunk sizes
//! in position order), keeps only the chunks overlapping the requested range,
//! and copies the overlapping slices in position order.

use std::io;

use rusqlite::{Connection, params};

use crate::error::{FsError, FsResult};
use crate::store::SharedConn;
use crate::tx;
use crate::types::{Metadata, NodeId, NodeKind};

/// Buffer size used by [`FileReader::read_to_vec`].
const READ_BUFFER_SIZE: usize = 64 * 1024;

const OVERLAPPING_CHUNKS: &str = r#"
WITH offsets AS (
    SELECT
        position,
        size,
        COALESCE(
            SUM(size) OVER (
                ORDER BY position ROWS BETWEEN UNBOUNDED PRECEDING AND 1 PRECEDING
            ),
            0
        ) AS start
    FROM chunks
    WHERE node_id = ?1
)
SELECT offsets.start, chunks.data
FROM chunks JOIN offsets ON offsets.position = chunks.position
WHERE chunks.node_id = ?1
    AND ?2 < offsets.start + offsets.size
    AND offsets.start < ?2 + ?3
ORDER BY chunks.position
"#;

/// Copy bytes of `node` starting at `offset` into `out`.
///
/// Returns how many bytes were copied: `out.len()` unless the stored chunks
/// end early.
pub(crate) fn copy_range(
    conn: &Connection,
    node: NodeId,
    offset: u64,
    out: &mut [u8],
) -> FsResult<usize> {
    let context = || format!("cannot read chunks of node {node} at offset {offset}");

    let mut stmt = conn
        .prepare_cached(OVERLAPPING_CHUNKS)
        .map_err(|e| FsError::store("cannot prepare chunk range query", e))?;
    let mut rows = stmt
        .query(params![node, offset as i64, out.len() as i64])
        .map_err(|e| FsError::store(context(), e))?;

    let mut copied = 0;
    let mut position = offset;
    while let Some(row) = rows.next().map_err(|e| FsError::store(context(), e))? {
        let start: i64 = row.get(0).map_err(|e| FsError::store(context(), e))?;
        let data: Vec<u8> = row.get(1).map_err(|e| FsError::store(context(), e))?;

        // A gap in positions means there is nothing contiguous left to copy.
        let Some(skip) = position.checked_sub(start as u64) else {
            break;
        };
        let Some(available) = data.get(skip as usize..) else {
            break;
        };

        let n = available.len().min(out.len() - copied);
        out[copied..copied + n].copy_from_slice(&available[..n]);
        copied += n;
        position += n as u64;
        if copied >= out.len() {
            break;
        }
    }
    Ok(copied)
}

/// Concatenate every chunk of `node` in position order.
pub(crate) fn read_whole(conn: &Connection, node: NodeId, size_hint: u64) -> FsResult<Vec<u8>> {
    let context = || format!("cannot read chunks of node {node}");
    let mut stmt = conn
        .prepare_cached("SELECT data FROM chunks WHERE node_id = ?1 ORDER BY position")
        .map_err(|e| FsError::store("cannot prepare chunk scan", e))?;
    let mut rows = stmt
        .query(params![node])
        .map_err(|e| FsError::store(context(), e))?;

    let mut out = Vec::with_capacity(size_hint as usize);
    while let Some(row) = rows.next().map_err(|e| FsError::store(context(), e))? {
        let data: Vec<u8> = row.get(0).map_err(|e| FsError::store(context(), e))?;
        out.extend_from_slice(&data);
    }
    Ok(out)
}

/// Read cursor over a regular file.
///
/// The size is captured when the file is opened. Each `read` runs in its own
/// read transaction.
pub struct FileReader {
    conn: SharedConn,
    path: String,
    name: String,
    node: NodeId,
    size: u64,
    offset: u64,
    closed: bool,
}

impl std::fmt::Debug for FileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileReader")
            .field("path", &self.path)
            .field("node", &self.node)
            .field("size", &self.size)
            .field("offset", &self.offset)
            .field("closed", &self.closed)
            .finish()
    }
}

impl FileReader {
    pub(crate) fn new(conn: SharedConn, path: String, name: String, node: NodeId, size: u64) -> Self {
        Self {
            conn,
            path,
            name,
            node,
            size,
            offset: 0,
            closed: false,
        }
    }

    /// Node id of the file.
    pub fn id(&self) -> NodeId {
        self.node
    }

    /// Path the reader was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File size at open time.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current read offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn stat(&self) -> Metadata {
        Metadata {
            name: self.name.clone(),
            kind: NodeKind::File,
            size: self.size,
        }
    }

    /// Read up to `out.len()` bytes from the current offset.
    ///
    /// Returns [`FsError::EndOfStream`] once the offset reaches the size,
    /// and `Ok(0)` for an empty buffer before that.
    pub fn read(&mut self, out: &mut [u8]) -> FsResult<usize> {
        if self.closed {
            return Err(FsError::closed(&self.path));
        }
        if self.offset >= self.size {
            return Err(FsError::EndOfStream);
        }
        if out.is_empty() {
            return Ok(0);
        }

        let wanted = (self.size - self.offset).min(out.len() as u64) as usize;
        let out = &mut out[..wanted];
        let (node, offset) = (self.node, self.offset);

        let copied = {
            let mut conn = self.conn.lock();
            tx::read(&mut conn, |tx| copy_range(tx, node, offset, out))
                .map_err(|e| e.during("read", &self.path))?
        };
        if copied == 0 {
            // Content was replaced by something shorter since open.
            return Err(FsError::EndOfStream);
        }
        self.offset += copied as u64;
        Ok(copied)
    }

    /// Read everything from the current offset to the end.
    pub fn read_to_vec(&mut self) -> FsResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size.saturating_sub(self.offset) as usize);
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            match self.read(&mut buf) {
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(FsError::EndOfStream) => return Ok(out),
                Err(e) => return Err(e),
            }
        }
    }

    /// Mark the reader closed; later reads fail.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl io::Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match FileReader::read(self, buf) {
            Ok(n) => Ok(n),
            Err(FsError::EndOfStream) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
