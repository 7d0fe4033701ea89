//! cellstore-store: single-node tablet storage.
//!
//! Layout mirrors the write path: every schema change and cell write is
//! appended to the WAL first, then applied to the in-memory [`Tablet`].
//! On startup the WAL is replayed to rebuild both the catalog and the data.
//!
//! - [`record`]: the WAL record format
//! - [`wal`]: CRC-framed append-only log with corrupt-tail truncation
//! - [`tablet`]: in-memory tables, column families, rows, cells
//! - [`engine`]: WAL + tablet combined behind one synchronous API

pub mod engine;
pub mod record;
pub mod tablet;
pub mod wal;

pub use engine::TabletEngine;
pub use record::WalRecord;
pub use tablet::Tablet;
pub use wal::{FsyncPolicy, Wal, WalError};

/// Errors from the storage layer. The server maps these onto gRPC status
/// codes; they never cross the wire directly.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("table {0:?} already exists")]
    TableExists(String),

    #[error("table {0:?} not found")]
    TableNotFound(String),

    #[error("column family {family:?} not found on table {table:?}")]
    FamilyNotFound { table: String, family: String },

    #[error("invalid table definition: {0}")]
    InvalidSpec(String),

    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}
