//! Client facade over the transfer capability.
//!
//! Every method except [`TransferClient::upload_batched`] wraps its input
//! into one [`TransferTask`] and runs it inline. Bare paths are turned into
//! symmetric [`FilePair`]s for existence checks and deletes.

use std::sync::Arc;
use std::time::Duration;

use sftp_batch_transfer::{
    ConnectionParams, FilePair, OperationKind, TransferBackend, TransferTask,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::DEFAULT_MAX_WORKERS;
use crate::error::ClientError;
use crate::orchestrator::BatchOrchestrator;

/// Entry point for remote file operations.
pub struct TransferClient {
    backend: Arc<dyn TransferBackend>,
    params: Arc<ConnectionParams>,
    max_workers: usize,
    interrupt: CancellationToken,
}

impl TransferClient {
    pub fn new(backend: Arc<dyn TransferBackend>, params: ConnectionParams) -> Self {
        Self {
            backend,
            params: Arc::new(params),
            max_workers: DEFAULT_MAX_WORKERS,
            interrupt: CancellationToken::new(),
        }
    }

    /// Sets how many batches may run at once in [`upload_batched`](Self::upload_batched).
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Token that interrupts any batched call currently waiting.
    ///
    /// Once cancelled, later batched calls fail with
    /// [`ClientError::Interrupted`] as well, until
    /// [`reset_interrupt`](Self::reset_interrupt) is called.
    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    /// Installs a fresh interrupt token so batched calls can run again.
    ///
    /// Tokens handed out earlier stay bound to the old one.
    pub fn reset_interrupt(&mut self) {
        if self.interrupt.is_cancelled() {
            debug!("interrupt token reset");
        }
        self.interrupt = CancellationToken::new();
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub async fn upload(
        &self,
        local: impl Into<String>,
        remote: impl Into<String>,
    ) -> Result<bool, ClientError> {
        self.upload_all(vec![FilePair::new(local, remote)]).await
    }

    pub async fn upload_all(&self, pairs: Vec<FilePair>) -> Result<bool, ClientError> {
        self.run(OperationKind::Upload, pairs).await
    }

    /// Uploads `pairs` in batches of `batch_size` under one global deadline.
    ///
    /// Returns `false` if any file in any batch failed. Fails with
    /// [`ClientError::Timeout`] if the batches did not all finish within
    /// `timeout`, or [`ClientError::Interrupted`] if the
    /// [`interrupt_token`](Self::interrupt_token) fired while waiting.
    pub async fn upload_batched(
        &self,
        pairs: Vec<FilePair>,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<bool, ClientError> {
        let orchestrator = BatchOrchestrator::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.params),
            self.max_workers,
            self.interrupt.clone(),
        );
        orchestrator
            .execute_batched(OperationKind::Upload, pairs, batch_size, timeout)
            .await
    }

    pub async fn download(
        &self,
        local: impl Into<String>,
        remote: impl Into<String>,
    ) -> Result<bool, ClientError> {
        self.download_all(vec![FilePair::new(local, remote)]).await
    }

    pub async fn download_all(&self, pairs: Vec<FilePair>) -> Result<bool, ClientError> {
        self.run(OperationKind::Download, pairs).await
    }

    /// Returns `true` if `path` exists remotely.
    pub async fn check_file(&self, path: impl Into<String>) -> Result<bool, ClientError> {
        self.check_files(vec![path.into()]).await
    }

    /// Returns `true` only if every path exists remotely.
    pub async fn check_files(&self, paths: Vec<String>) -> Result<bool, ClientError> {
        self.run(OperationKind::Exists, symmetric(paths)).await
    }

    /// Renames `pair.local_path()` to `pair.remote_path()` on the remote side.
    pub async fn rename(&self, pair: FilePair) -> Result<bool, ClientError> {
        self.rename_all(vec![pair]).await
    }

    pub async fn rename_all(&self, pairs: Vec<FilePair>) -> Result<bool, ClientError> {
        self.run(OperationKind::Rename, pairs).await
    }

    pub async fn delete(&self, path: impl Into<String>) -> Result<bool, ClientError> {
        self.delete_all(vec![path.into()]).await
    }

    pub async fn delete_all(&self, paths: Vec<String>) -> Result<bool, ClientError> {
        self.run(OperationKind::Delete, symmetric(paths)).await
    }

    async fn run(&self, op: OperationKind, batch: Vec<FilePair>) -> Result<bool, ClientError> {
        let task = TransferTask::new(op, Arc::clone(&self.params), batch, Arc::clone(&self.backend));
        Ok(task.run().await?)
    }
}

fn symmetric(paths: Vec<String>) -> Vec<FilePair> {
    paths.into_iter().map(FilePair::symmetric).collect()
}
