//! Paginated directory listing.
//!
//! Children are returned in ascending id order, each with the summed size of
//! its own chunks. The lister remembers the id of the last entry it handed out
//! and asks only for ids above it on the next call, so pages never overlap.

use std::collections::VecDeque;

use rusqlite::{Connection, params};

use crate::error::{FsError, FsResult};
use crate::store::SharedConn;
use crate::tx;
use crate::types::{DirEntry, Metadata, NodeId, NodeKind};

const CHILDREN_AFTER: &str = r#"
SELECT
    nodes.id,
    nodes.name,
    nodes.kind,
    COALESCE(SUM(chunks.size), 0) AS size
FROM nodes LEFT JOIN chunks ON chunks.node_id = nodes.id
WHERE nodes.parent = ?1 AND nodes.id > ?2
GROUP BY nodes.id, nodes.name, nodes.kind
ORDER BY nodes.id
LIMIT ?3
"#;

/// Children of `parent` with ids above `after`, at most `limit` of them
/// (a negative limit means no limit).
pub(crate) fn children_after(
    conn: &Connection,
    parent: NodeId,
    after: NodeId,
    limit: i64,
) -> FsResult<Vec<DirEntry>> {
    let context = || format!("cannot list children of node {parent} after {after}");
    let mut stmt = conn
        .prepare_cached(CHILDREN_AFTER)
        .map_err(|e| FsError::store("cannot prepare listing query", e))?;
    let rows = stmt
        .query_map(params![parent, after, limit], |row| {
            let size: i64 = row.get(3)?;
            Ok(DirEntry {
                id: row.get(0)?,
                name: row.get(1)?,
                kind: row.get(2)?,
                size: size as u64,
            })
        })
        .map_err(|e| FsError::store(context(), e))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| FsError::store(context(), e))
}

/// Number of direct children of `node`.
pub(crate) fn count_children(conn: &Connection, node: NodeId) -> FsResult<u64> {
    let n: i64 = conn
        .query_row("SELECT COUNT(1) FROM nodes WHERE parent = ?1", params![node], |row| {
            row.get(0)
        })
        .map_err(|e| FsError::store(format!("cannot count children of node {node}"), e))?;
    Ok(n as u64)
}

/// Forward-only listing cursor over one directory.
///
/// Not restartable: once exhausted, open the directory again for a fresh
/// listing. Can be driven page by page with [`DirLister::read_dir`] or as an
/// iterator, which fetches `page_size` entries per query.
pub struct DirLister {
    conn: SharedConn,
    path: String,
    name: String,
    node: NodeId,
    /// Id of the last entry handed out.
    cursor: NodeId,
    exhausted: bool,
    closed: bool,
    page_size: usize,
    /// Entries fetched by the iterator but not yet yielded.
    buffered: VecDeque<DirEntry>,
    /// Set once the iterator has yielded an error.
    failed: bool,
}

impl std::fmt::Debug for DirLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirLister")
            .field("path", &self.path)
            .field("node", &self.node)
            .field("cursor", &self.cursor)
            .field("exhausted", &self.exhausted)
            .field("closed", &self.closed)
            .finish()
    }
}

impl DirLister {
    pub(crate) fn new(
        conn: SharedConn,
        path: String,
        name: String,
        node: NodeId,
        page_size: usize,
    ) -> Self {
        Self {
            conn,
            path,
            name,
            node,
            cursor: NodeId::from_raw(0),
            exhausted: false,
            closed: false,
            page_size: page_size.max(1),
            buffered: VecDeque::new(),
            failed: false,
        }
    }

    /// Node id of the directory.
    pub fn id(&self) -> NodeId {
        self.node
    }

    /// Path the lister was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn stat(&self) -> Metadata {
        Metadata {
            name: self.name.clone(),
            kind: NodeKind::Directory,
            size: 0,
        }
    }

    /// Return the next entries.
    ///
    /// With `n > 0`, returns at most `n` entries, and [`FsError::EndOfStream`]
    /// once nothing is left. With `n <= 0`, returns everything that remains,
    /// which is an empty list (not an error) after exhaustion.
    ///
    /// An empty directory reports EndOfStream on the first positive call,
    /// without returning an empty page first.
    ///
    /// A failed query leaves buffered entries in place for the next call.
    pub fn read_dir(&mut self, n: i64) -> FsResult<Vec<DirEntry>> {
        if self.closed {
            return Err(FsError::closed(&self.path));
        }

        let take = if n > 0 {
            self.buffered.len().min(n as usize)
        } else {
            self.buffered.len()
        };
        let satisfied = n > 0 && take as i64 == n;

        let mut fetched = Vec::new();
        if !satisfied && !self.exhausted {
            let limit = if n > 0 { n - take as i64 } else { -1 };
            fetched = self.fetch(limit)?;
            if limit < 0 || (fetched.len() as i64) < limit {
                self.exhausted = true;
            }
        }

        let mut entries: Vec<DirEntry> = self.buffered.drain(..take).collect();
        entries.extend(fetched);

        if n > 0 && entries.is_empty() {
            return Err(FsError::EndOfStream);
        }
        Ok(entries)
    }

    /// Query the next `limit` children and advance the cursor past them.
    fn fetch(&mut self, limit: i64) -> FsResult<Vec<DirEntry>> {
        let (node, cursor) = (self.node, self.cursor);
        let fetched = {
            let mut conn = self.conn.lock();
            tx::read(&mut conn, |tx| children_after(tx, node, cursor, limit))
                .map_err(|e| e.during("read_dir", &self.path))?
        };
        if let Some(last) = fetched.last() {
            self.cursor = last.id;
        }
        tracing::trace!(path = %self.path, limit, fetched = fetched.len(), "listed children");
        Ok(fetched)
    }

    /// Mark the lister closed; later calls fail.
    pub fn close(&mut self) {
        self.closed = true;
        self.buffered.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Iterator for DirLister {
    type Item = FsResult<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.closed {
            self.failed = true;
            return Some(Err(FsError::closed(&self.path)));
        }
        if self.buffered.is_empty() {
            if self.exhausted {
                return None;
            }
            match self.fetch(self.page_size as i64) {
                Ok(page) => {
                    if page.len() < self.page_size {
                        self.exhausted = true;
                    }
                    self.buffered.extend(page);
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        self.buffered.pop_front().map(Ok)
    }
}
