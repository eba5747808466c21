//! # rowfs
//!
//! A hierarchical filesystem kept entirely inside one SQLite database.
//!
//! Directories and files are rows of a `nodes` table linked by parent id;
//! file content is split into numbered rows of a `chunks` table. Every
//! mutation is a single transaction, so a store file is always a consistent
//! tree that can be copied around like any other file.
//!
//! ```no_run
//! use rowfs::Store;
//!
//! # fn main() -> rowfs::FsResult<()> {
//! let fs = Store::open_at("files.db")?;
//! fs.upsert("a/regular/file", 1024, b"bonjour")?;
//! assert_eq!(fs.read_file("a/regular/file")?, b"bonjour");
//!
//! let mut dir = fs.open_dir("a")?;
//! for entry in dir.read_dir(0)? {
//!     println!("{} {} {}", entry.name, entry.kind, entry.size);
//! }
//! fs.close()
//! # }
//! ```
//!
//! ## Design Decisions
//!
//! - **Store is the source of truth**: navigation is a sequence of indexed
//!   `(parent, name)` lookups; no tree is cached in memory.
//! - **Relative paths only**: a leading `/` is an error for every operation.
//! - **Whole-file writes**: `upsert` replaces all chunks of a file at once.
//!   Chunk size is chosen per write and may differ between rewrites.
//! - **Reads by range**: a read selects only the chunks overlapping the
//!   requested bytes, located with a prefix sum over chunk sizes.

mod chunks;
pub mod config;
mod dir;
mod error;
mod mutate;
mod namei;
pub mod path;
mod reader;
mod schema;
mod store;
mod tx;
pub mod types;

pub use config::StoreConfig;
pub use dir::DirLister;
pub use error::{FsError, FsResult};
pub use reader::FileReader;
pub use store::{Handle, Store};
pub use types::{DirEntry, Metadata, NodeId, NodeKind};
