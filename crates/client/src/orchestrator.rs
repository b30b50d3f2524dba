//! Batch orchestrator: partition, submit, wait under a deadline, reduce.
//!
//! Each call owns its own worker pool. The pool is created after the input
//! is known to be non-empty and is aborted on every exit path: normal
//! completion, deadline, or interruption.

use std::sync::Arc;
use std::time::Duration;

use sftp_batch_transfer::{
    ConnectionParams, FilePair, OperationKind, TransferBackend, TransferTask, partition,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ClientError;
use crate::outcome::{Tally, reduce};
use crate::pool::WorkerPool;

/// How the wait for the pool ended.
enum Wait {
    Completed,
    TimedOut,
    Interrupted,
}

/// Runs one operation over many file pairs in bounded batches.
pub struct BatchOrchestrator {
    backend: Arc<dyn TransferBackend>,
    params: Arc<ConnectionParams>,
    max_workers: usize,
    cancel: CancellationToken,
}

impl BatchOrchestrator {
    /// Creates an orchestrator.
    ///
    /// `cancel` interrupts a call that is waiting on its pool; `max_workers`
    /// is clamped to at least one.
    pub fn new(
        backend: Arc<dyn TransferBackend>,
        params: Arc<ConnectionParams>,
        max_workers: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            params,
            max_workers: max_workers.max(1),
            cancel,
        }
    }

    /// Applies `op` to `pairs` in groups of `batch_size`, one task per group.
    ///
    /// Returns `Ok(true)` only if every batch succeeded. Failing, panicking
    /// or cancelled batches make the verdict `false` without stopping their
    /// siblings. `timeout` bounds the wait for all batches, measured from
    /// the moment the last one is submitted.
    pub async fn execute_batched(
        &self,
        op: OperationKind,
        pairs: Vec<FilePair>,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<bool, ClientError> {
        let files = pairs.len();
        if files == 0 {
            debug!(op = %op, "nothing to transfer");
            return Ok(true);
        }

        let mut pool = WorkerPool::new(self.max_workers);
        for batch in partition(pairs, batch_size) {
            let task = TransferTask::new(
                op,
                Arc::clone(&self.params),
                batch,
                Arc::clone(&self.backend),
            );
            pool.submit(task, self.cancel.child_token());
        }

        let batches = pool.len();
        if batches == 0 {
            warn!(op = %op, files, batch_size, "batch size is zero, no batches submitted");
        }
        info!(
            op = %op,
            files,
            batches,
            batch_size,
            workers = self.max_workers,
            timeout_secs = timeout.as_secs(),
            "batches submitted"
        );

        // An interruption wins over a pool that finished in the same poll.
        let wait = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Wait::Interrupted,
            res = tokio::time::timeout(timeout, pool.await_termination()) => match res {
                Ok(()) => Wait::Completed,
                Err(_) => Wait::TimedOut,
            },
        };

        pool.shutdown_now();
        let outcomes = pool.drain().await;

        match wait {
            Wait::Completed => {
                let ok = reduce(&outcomes);
                info!(op = %op, files, batches, success = ok, "batched transfer finished");
                Ok(ok)
            }
            Wait::TimedOut => {
                let tally = Tally::of(&outcomes);
                error!(
                    op = %op,
                    files,
                    timeout_secs = timeout.as_secs(),
                    ?tally,
                    "batched transfer timed out"
                );
                Err(ClientError::Timeout { files, timeout })
            }
            Wait::Interrupted => {
                let tally = Tally::of(&outcomes);
                warn!(op = %op, files, ?tally, "batched transfer interrupted");
                Err(ClientError::Interrupted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sftp_batch_transfer::{BackendFuture, TransferError};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records every batch; fails any batch containing `fail_on`.
    #[derive(Default)]
    struct Recorder {
        batches: Mutex<Vec<Vec<FilePair>>>,
        fail_on: Option<&'static str>,
        error_on: Option<&'static str>,
        panic_on: Option<&'static str>,
    }

    impl Recorder {
        fn sizes(&self) -> Vec<usize> {
            let mut sizes: Vec<usize> = self.batches.lock().unwrap().iter().map(Vec::len).collect();
            sizes.sort_unstable();
            sizes
        }
    }

    impl TransferBackend for Recorder {
        fn execute<'a>(
            &'a self,
            _op: OperationKind,
            batch: &'a [FilePair],
            _params: &'a ConnectionParams,
        ) -> BackendFuture<'a> {
            Box::pin(async move {
                self.batches.lock().unwrap().push(batch.to_vec());
                let has = |name: Option<&str>| {
                    name.is_some_and(|n| batch.iter().any(|p| p.local_path() == n))
                };
                if has(self.panic_on) {
                    panic!("backend bug");
                }
                if has(self.error_on) {
                    return Err(TransferError::Protocol("unexpected packet".into()));
                }
                Ok(!has(self.fail_on))
            })
        }
    }

    /// Never finishes; counts how many batches were started.
    #[derive(Default)]
    struct Hanging {
        started: AtomicUsize,
    }

    impl TransferBackend for Hanging {
        fn execute<'a>(
            &'a self,
            _op: OperationKind,
            _batch: &'a [FilePair],
            _params: &'a ConnectionParams,
        ) -> BackendFuture<'a> {
            Box::pin(async move {
                self.started.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<()>().await;
                Ok(true)
            })
        }
    }

    /// Takes five seconds per batch; counts finished batches.
    #[derive(Default)]
    struct Slow {
        finished: AtomicUsize,
    }

    impl TransferBackend for Slow {
        fn execute<'a>(
            &'a self,
            _op: OperationKind,
            _batch: &'a [FilePair],
            _params: &'a ConnectionParams,
        ) -> BackendFuture<'a> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                self.finished.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            })
        }
    }

    /// Blocks its worker thread for three seconds, ignoring abort.
    struct Stuck;

    impl TransferBackend for Stuck {
        fn execute<'a>(
            &'a self,
            _op: OperationKind,
            _batch: &'a [FilePair],
            _params: &'a ConnectionParams,
        ) -> BackendFuture<'a> {
            Box::pin(async move {
                std::thread::sleep(Duration::from_secs(3));
                Ok(true)
            })
        }
    }

    fn pairs(n: usize) -> Vec<FilePair> {
        (0..n)
            .map(|i| FilePair::new(format!("f{i}"), format!("/remote/f{i}")))
            .collect()
    }

    fn orchestrator(backend: Arc<dyn TransferBackend>, workers: usize) -> BatchOrchestrator {
        BatchOrchestrator::new(
            backend,
            Arc::new(ConnectionParams::new("sftp.example.com", "batch")),
            workers,
            CancellationToken::new(),
        )
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn empty_input_succeeds_without_tasks() {
        let backend = Arc::new(Recorder::default());
        let orch = orchestrator(backend.clone(), 1);
        let ok = orch
            .execute_batched(OperationKind::Upload, Vec::new(), 3, Duration::ZERO)
            .await
            .unwrap();
        assert!(ok);
        assert!(backend.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ten_pairs_in_batches_of_three() {
        let backend = Arc::new(Recorder::default());
        let orch = orchestrator(backend.clone(), 1);
        let input = pairs(10);

        let ok = orch
            .execute_batched(OperationKind::Upload, input.clone(), 3, MINUTE)
            .await
            .unwrap();

        assert!(ok);
        assert_eq!(backend.sizes(), vec![1, 3, 3, 3]);

        // Every pair sent exactly once.
        let mut seen: Vec<FilePair> = backend.batches.lock().unwrap().concat();
        seen.sort_by(|a, b| a.local_path().cmp(b.local_path()));
        let mut expected = input;
        expected.sort_by(|a, b| a.local_path().cmp(b.local_path()));
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn one_failing_batch_fails_the_call() {
        let backend = Arc::new(Recorder {
            fail_on: Some("f2"),
            ..Recorder::default()
        });
        let orch = orchestrator(backend.clone(), 1);

        let ok = orch
            .execute_batched(OperationKind::Upload, pairs(5), 2, MINUTE)
            .await
            .unwrap();

        assert!(!ok);
        // No short-circuit: all three batches were attempted.
        assert_eq!(backend.sizes(), vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn backend_error_and_panic_become_false() {
        let backend = Arc::new(Recorder {
            error_on: Some("f0"),
            panic_on: Some("f4"),
            ..Recorder::default()
        });
        let orch = orchestrator(backend.clone(), 2);

        let ok = orch
            .execute_batched(OperationKind::Delete, pairs(6), 2, MINUTE)
            .await
            .unwrap();

        assert!(!ok);
        assert_eq!(backend.sizes(), vec![2, 2, 2]);
    }

    #[tokio::test]
    async fn parallel_workers_still_cover_every_batch() {
        let backend = Arc::new(Recorder::default());
        let orch = orchestrator(backend.clone(), 4);

        let ok = orch
            .execute_batched(OperationKind::Download, pairs(9), 2, MINUTE)
            .await
            .unwrap();

        assert!(ok);
        assert_eq!(backend.sizes(), vec![1, 2, 2, 2, 2]);
    }

    #[tokio::test]
    async fn zero_batch_size_submits_nothing() {
        let backend = Arc::new(Recorder::default());
        let orch = orchestrator(backend.clone(), 1);

        let ok = orch
            .execute_batched(OperationKind::Upload, pairs(4), 0, MINUTE)
            .await
            .unwrap();

        assert!(ok);
        assert!(backend.batches.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_backend_times_out() {
        let backend = Arc::new(Hanging::default());
        let orch = orchestrator(backend.clone(), 1);

        let err = orch
            .execute_batched(OperationKind::Upload, pairs(7), 3, Duration::from_secs(1))
            .await
            .unwrap_err();

        match err {
            ClientError::Timeout { files, timeout } => {
                assert_eq!(files, 7);
                assert_eq!(timeout, Duration::from_secs(1));
            }
            other => panic!("expected timeout, got {other:?}"),
        }

        // Single worker: only the first batch ever started, and nothing
        // queued behind it starts after teardown.
        tokio::time::sleep(MINUTE).await;
        assert_eq!(backend.started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_aborts_in_flight_batches() {
        let backend = Arc::new(Slow::default());
        let orch = orchestrator(backend.clone(), 4);

        let err = orch
            .execute_batched(OperationKind::Upload, pairs(8), 2, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout { files: 8, .. }));

        tokio::time::sleep(MINUTE).await;
        assert_eq!(backend.finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_covers_the_whole_set() {
        // Two serialized five-second batches do not fit in eight seconds,
        // even though each one alone would.
        let backend = Arc::new(Slow::default());
        let orch = orchestrator(backend.clone(), 1);

        let err = orch
            .execute_batched(OperationKind::Upload, pairs(2), 1, Duration::from_secs(8))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout { files: 2, .. }));
        assert_eq!(backend.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn interruption_tears_down_and_propagates() {
        let backend = Arc::new(Slow::default());
        let cancel = CancellationToken::new();
        let orch = BatchOrchestrator::new(
            backend.clone(),
            Arc::new(ConnectionParams::default()),
            2,
            cancel.clone(),
        );

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let err = orch
            .execute_batched(OperationKind::Upload, pairs(4), 1, MINUTE)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Interrupted));

        tokio::time::sleep(MINUTE).await;
        assert_eq!(backend.finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn timeout_returns_while_a_batch_is_blocked() {
        let orch = orchestrator(Arc::new(Stuck), 1);
        let started = std::time::Instant::now();

        let err = orch
            .execute_batched(OperationKind::Upload, pairs(2), 2, Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Timeout { files: 2, .. }));
        let elapsed = started.elapsed();
        assert!(elapsed < Duration::from_secs(2), "returned after {elapsed:?}");
    }
}
