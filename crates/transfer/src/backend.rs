//! The remote transfer capability and the task that invokes it.
//!
//! A backend is implemented once per transport (SFTP session, local mirror
//! directory, test mock). Using a trait keeps the batching layer decoupled
//! from the wire and testable without a server.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::TransferError;
use crate::types::{ConnectionParams, FilePair, OperationKind};

/// Boxed future returned by [`TransferBackend::execute`].
pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = Result<bool, TransferError>> + Send + 'a>>;

/// Executes one operation kind over a group of file pairs.
pub trait TransferBackend: Send + Sync {
    /// Applies `op` to every pair in `batch`.
    ///
    /// Resolves to `true` only if the operation succeeded for every pair.
    /// Transport-level failures (connection, protocol, I/O) are returned as
    /// errors.
    fn execute<'a>(
        &'a self,
        op: OperationKind,
        batch: &'a [FilePair],
        params: &'a ConnectionParams,
    ) -> BackendFuture<'a>;
}

/// One backend call bound to one batch.
///
/// Tasks own their batch and share the backend and connection parameters
/// read-only, so they can be moved onto a worker freely.
#[derive(Clone)]
pub struct TransferTask {
    op: OperationKind,
    params: Arc<ConnectionParams>,
    batch: Vec<FilePair>,
    backend: Arc<dyn TransferBackend>,
}

impl TransferTask {
    pub fn new(
        op: OperationKind,
        params: Arc<ConnectionParams>,
        batch: Vec<FilePair>,
        backend: Arc<dyn TransferBackend>,
    ) -> Self {
        Self {
            op,
            params,
            batch,
            backend,
        }
    }

    pub fn op(&self) -> OperationKind {
        self.op
    }

    pub fn batch(&self) -> &[FilePair] {
        &self.batch
    }

    /// Runs the operation over the whole batch.
    pub async fn run(&self) -> Result<bool, TransferError> {
        debug!(op = %self.op, files = self.batch.len(), "running transfer task");
        self.backend
            .execute(self.op, &self.batch, &self.params)
            .await
    }
}

impl std::fmt::Debug for TransferTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferTask")
            .field("op", &self.op)
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}
