//! The store handle.
//!
//! A [`Store`] owns one SQLite connection and the id of the root node. Every
//! public operation validates its path, takes the connection, and runs as a
//! single transaction: writes with `BEGIN IMMEDIATE`, multi-query reads with a
//! deferred transaction so they observe one snapshot.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::config::StoreConfig;
use crate::dir::{self, DirLister};
use crate::error::{FsError, FsResult};
use crate::reader::{self, FileReader};
use crate::types::{Metadata, NodeId, NodeKind};
use crate::{chunks, mutate, namei, path, schema, tx};

/// Connection shared between the store and its open handles.
pub(crate) type SharedConn = Arc<Mutex<Connection>>;

/// An opened node: a file to read or a directory to list.
#[derive(Debug)]
pub enum Handle {
    File(FileReader),
    Dir(DirLister),
}

impl Handle {
    pub fn kind(&self) -> NodeKind {
        match self {
            Handle::File(_) => NodeKind::File,
            Handle::Dir(_) => NodeKind::Directory,
        }
    }

    pub fn stat(&self) -> Metadata {
        match self {
            Handle::File(f) => f.stat(),
            Handle::Dir(d) => d.stat(),
        }
    }

    /// The file reader, or IncorrectType for a directory.
    pub fn into_file(self) -> FsResult<FileReader> {
        match self {
            Handle::File(f) => Ok(f),
            Handle::Dir(d) => Err(FsError::incorrect_type(d.path(), NodeKind::Directory)),
        }
    }

    /// The directory lister, or IncorrectType for a file.
    pub fn into_dir(self) -> FsResult<DirLister> {
        match self {
            Handle::Dir(d) => Ok(d),
            Handle::File(f) => Err(FsError::incorrect_type(f.path(), NodeKind::File)),
        }
    }

    pub fn close(&mut self) {
        match self {
            Handle::File(f) => f.close(),
            Handle::Dir(d) => d.close(),
        }
    }
}

/// A filesystem stored in one SQLite database.
pub struct Store {
    conn: SharedConn,
    root: NodeId,
    config: StoreConfig,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish()
    }
}

impl Store {
    /// Open or create a store at the given location.
    pub fn open_at<P: AsRef<Path>>(location: P) -> FsResult<Self> {
        Self::open_with_config(location, StoreConfig::default())
    }

    /// Open or create a store with explicit settings.
    pub fn open_with_config<P: AsRef<Path>>(location: P, config: StoreConfig) -> FsResult<Self> {
        config.validate()?;
        let location = location.as_ref();
        let conn = Connection::open(location).map_err(|e| {
            FsError::store(format!("cannot open the database {}", location.display()), e)
        })?;
        let store = Self::init(conn, config)?;
        tracing::info!(location = %location.display(), root = %store.root, "opened store");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> FsResult<Self> {
        Self::in_memory_with_config(StoreConfig::default())
    }

    /// Create an in-memory store with explicit settings.
    pub fn in_memory_with_config(config: StoreConfig) -> FsResult<Self> {
        config.validate()?;
        let conn = Connection::open_in_memory()
            .map_err(|e| FsError::store("cannot open in-memory database", e))?;
        Self::init(conn, config)
    }

    fn init(mut conn: Connection, config: StoreConfig) -> FsResult<Self> {
        schema::configure(&conn, &config)?;
        let root = schema::bootstrap(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            root,
            config,
        })
    }

    /// Id of the root directory.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create or overwrite the file at `path` with `data`.
    ///
    /// Missing ancestors are created as directories. The content is stored as
    /// `chunk_size` pieces and replaces any previous content completely.
    #[tracing::instrument(skip(self, data), fields(bytes = data.len()), name = "fs.upsert")]
    pub fn upsert(&self, path: &str, chunk_size: usize, data: &[u8]) -> FsResult<()> {
        let components = path::child_components(path)?;
        if chunk_size == 0 {
            return Err(FsError::InvalidChunkSize(chunk_size));
        }

        let mut conn = self.conn.lock();
        tx::write(&mut conn, |tx| {
            let node = mutate::ensure_file(tx, self.root, &components)?;
            chunks::replace(tx, node, chunk_size, data)?;
            Ok(())
        })
        .map_err(|e| e.during("upsert", path))
    }

    /// [`Store::upsert`] with the configured default chunk size.
    pub fn put(&self, path: &str, data: &[u8]) -> FsResult<()> {
        self.upsert(path, self.config.default_chunk_size, data)
    }

    /// Upsert a batch of files in one transaction.
    ///
    /// Either every file is written or none is. The batch is collected and
    /// its paths checked before the connection is taken, so `files` may read
    /// from this same store.
    #[tracing::instrument(skip(self, files), name = "fs.upsert_many")]
    pub fn upsert_many<I, P, D>(&self, files: I, chunk_size: usize) -> FsResult<usize>
    where
        I: IntoIterator<Item = (P, D)>,
        P: AsRef<str>,
        D: AsRef<[u8]>,
    {
        if chunk_size == 0 {
            return Err(FsError::InvalidChunkSize(chunk_size));
        }

        let batch: Vec<(P, D)> = files.into_iter().collect();
        let parsed = batch
            .iter()
            .map(|(file_path, data)| -> FsResult<_> {
                let file_path = file_path.as_ref();
                Ok((file_path, path::child_components(file_path)?, data.as_ref()))
            })
            .collect::<FsResult<Vec<_>>>()?;

        let mut conn = self.conn.lock();
        let written = tx::write(&mut conn, |tx| {
            let mut written = 0;
            for (file_path, components, data) in &parsed {
                let pieces = mutate::ensure_file(tx, self.root, components)
                    .and_then(|node| chunks::replace(tx, node, chunk_size, data))
                    .map_err(|e| e.during("upsert", file_path))?;
                tracing::trace!(path = *file_path, chunks = pieces, "batched file");
                written += 1;
            }
            Ok(written)
        })?;
        tracing::debug!(written, "upserted batch");
        Ok(written)
    }

    /// Delete the file or empty directory at `path`.
    #[tracing::instrument(skip(self), name = "fs.delete")]
    pub fn delete(&self, path: &str) -> FsResult<()> {
        let components = path::child_components(path)?;

        let mut conn = self.conn.lock();
        tx::write(&mut conn, |tx| {
            let target = namei::resolve(tx, self.root, &components)?;

            if dir::count_children(tx, target.id)? > 0 {
                return Err(FsError::directory_not_empty(path));
            }

            let removed = chunks::delete_all(tx, target.id)?;
            tx.execute("DELETE FROM nodes WHERE id = ?1", [target.id])
                .map_err(|e| FsError::store(format!("cannot delete node {}", target.id), e))?;
            tracing::debug!(node = %target.id, kind = %target.kind, chunks = removed, "deleted node");
            Ok(())
        })
        .map_err(|e| e.during("delete", path))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Open the node at `path` for reading or listing.
    #[tracing::instrument(skip(self), name = "fs.open")]
    pub fn open(&self, path: &str) -> FsResult<Handle> {
        let components = path::components(path)?;
        let name = path::base_name(&components);

        let (node, size) = {
            let mut conn = self.conn.lock();
            tx::read(&mut conn, |tx| {
                let node = namei::resolve(tx, self.root, &components)?;
                let size = match node.kind {
                    NodeKind::File => chunks::total_size(tx, node.id)?,
                    NodeKind::Directory => 0,
                };
                Ok((node, size))
            })
            .map_err(|e| e.during("open", path))?
        };

        let conn = Arc::clone(&self.conn);
        Ok(match node.kind {
            NodeKind::File => Handle::File(FileReader::new(conn, path.to_string(), name, node.id, size)),
            NodeKind::Directory => Handle::Dir(DirLister::new(
                conn,
                path.to_string(),
                name,
                node.id,
                self.config.list_page_size,
            )),
        })
    }

    /// Open a regular file; IncorrectType if `path` is a directory.
    pub fn open_file(&self, path: &str) -> FsResult<FileReader> {
        self.open(path)?.into_file()
    }

    /// Open a directory; IncorrectType if `path` is a regular file.
    pub fn open_dir(&self, path: &str) -> FsResult<DirLister> {
        self.open(path)?.into_dir()
    }

    /// Name, kind and size of the node at `path`.
    pub fn stat(&self, path: &str) -> FsResult<Metadata> {
        Ok(self.open(path)?.stat())
    }

    /// Whether `path` resolves to a node.
    pub fn exists(&self, path: &str) -> FsResult<bool> {
        let components = path::components(path)?;
        let mut conn = self.conn.lock();
        match tx::read(&mut conn, |tx| namei::resolve(tx, self.root, &components)) {
            Ok(_) => Ok(true),
            Err(FsError::NodeNotFound { .. }) => Ok(false),
            Err(e) => Err(e.during("exists", path)),
        }
    }

    /// Full content of the regular file at `path`.
    #[tracing::instrument(skip(self), name = "fs.read_file")]
    pub fn read_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let components = path::components(path)?;

        let mut conn = self.conn.lock();
        tx::read(&mut conn, |tx| {
            let node = namei::resolve(tx, self.root, &components)?;
            if !node.kind.is_file() {
                return Err(FsError::incorrect_type(path, node.kind));
            }
            let size = chunks::total_size(tx, node.id)?;
            reader::read_whole(tx, node.id, size)
        })
        .map_err(|e| e.during("read_file", path))
    }

    /// Close the store.
    ///
    /// The connection is closed now if no reader or lister is still open;
    /// otherwise it closes when the last of them is dropped.
    pub fn close(self) -> FsResult<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(conn) => conn
                .into_inner()
                .close()
                .map_err(|(_, e)| FsError::store("cannot close the database", e)),
            Err(shared) => {
                tracing::debug!(
                    handles = Arc::strong_count(&shared) - 1,
                    "store closed with open handles"
                );
                Ok(())
            }
        }
    }
}
