//! File pairs, batch partitioning and the remote transfer capability.
//!
//! This crate holds everything a batch of remote operations is built from:
//! the [`FilePair`] unit, the lazy [`Batches`] partitioner, the
//! [`TransferBackend`] capability that actually talks to the remote end, and
//! the [`TransferTask`] that binds one backend call to one batch.

mod backend;
mod batch;
mod local;
mod types;
mod validation;

pub use backend::{BackendFuture, TransferBackend, TransferTask};
pub use batch::{Batches, partition};
pub use local::LocalDirBackend;
pub use types::{ConnectionParams, FilePair, OperationKind};
pub use validation::validate_remote_path;

/// Default SSH/SFTP port.
pub const DEFAULT_PORT: u16 = 22;

/// Errors produced by a transfer backend.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("interrupted")]
    Interrupted,
}
