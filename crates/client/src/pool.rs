//! Scoped worker pool owned by a single batched call.

use std::sync::Arc;

use sftp_batch_transfer::{TransferError, TransferTask};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::outcome::Outcome;

/// A submitted task and, once resolved, its outcome.
struct Pending {
    handle: JoinHandle<Result<bool, TransferError>>,
    outcome: Option<Outcome>,
}

/// Bounded pool of spawned tasks.
///
/// At most `workers` tasks run the backend at once; the rest wait for a
/// permit. Dropping the pool aborts every task that is still running.
pub(crate) struct WorkerPool {
    permits: Arc<Semaphore>,
    pending: Vec<Pending>,
}

impl WorkerPool {
    pub(crate) fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            pending: Vec::new(),
        }
    }

    /// Spawns `task`; handles are kept in submission order.
    pub(crate) fn submit(&mut self, task: TransferTask, cancel: CancellationToken) {
        let permits = Arc::clone(&self.permits);
        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| TransferError::Interrupted)?;
            tokio::select! {
                _ = cancel.cancelled() => Err(TransferError::Interrupted),
                result = task.run() => result,
            }
        });
        self.pending.push(Pending {
            handle,
            outcome: None,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Waits until every submitted task has finished.
    ///
    /// Cancel-safe: an outcome is recorded in the same poll its handle
    /// resolves, so dropping this future mid-wait loses nothing and a later
    /// call picks up where it stopped.
    pub(crate) async fn await_termination(&mut self) {
        for slot in &mut self.pending {
            if slot.outcome.is_none() {
                slot.outcome = Some(Outcome::from_join((&mut slot.handle).await));
            }
        }
    }

    /// Aborts every task that has not finished yet.
    pub(crate) fn shutdown_now(&self) {
        let mut aborted = 0usize;
        for slot in &self.pending {
            if !slot.handle.is_finished() {
                slot.handle.abort();
                aborted += 1;
            }
        }
        if aborted > 0 {
            debug!(aborted, "worker pool shut down");
        }
    }

    /// Returns the outcomes in submission order without waiting.
    ///
    /// Handles that have finished are collected; anything still running,
    /// including an aborted task stuck in blocking code, counts as
    /// [`Outcome::Cancelled`]. Call [`await_termination`](Self::await_termination)
    /// first to wait for normal completion.
    pub(crate) async fn drain(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(self.pending.len());
        for slot in &mut self.pending {
            let outcome = match slot.outcome.take() {
                Some(outcome) => outcome,
                None if slot.handle.is_finished() => Outcome::from_join((&mut slot.handle).await),
                None => Outcome::Cancelled,
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for slot in &self.pending {
            slot.handle.abort();
        }
    }
}
