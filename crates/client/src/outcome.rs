//! Per-task outcome classification and the reduction to one verdict.

use sftp_batch_transfer::TransferError;
use tokio::task::JoinError;
use tracing::warn;

/// Classified result of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The backend ran and returned its verdict for the batch.
    Success(bool),
    /// The task observed an interruption before finishing.
    Interrupted,
    /// The task was aborted, usually by pool teardown.
    Cancelled,
    /// The task failed or panicked; the cause is kept for diagnostics.
    ExecutionFailed(String),
}

impl Outcome {
    /// Classifies what a worker's join handle resolved to.
    pub fn from_join(result: Result<Result<bool, TransferError>, JoinError>) -> Self {
        match result {
            Ok(Ok(verdict)) => Self::Success(verdict),
            Ok(Err(TransferError::Interrupted)) => Self::Interrupted,
            Ok(Err(e)) => Self::ExecutionFailed(e.to_string()),
            Err(e) if e.is_cancelled() => Self::Cancelled,
            Err(e) => Self::ExecutionFailed(format!("task panicked: {e}")),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(true))
    }
}

/// Reduces outcomes to one verdict: `true` only if every task succeeded.
///
/// Every outcome is inspected and failures are logged, so the full failure
/// scope is visible, not just the first one. An empty set is `true`.
pub fn reduce(outcomes: &[Outcome]) -> bool {
    let mut all_ok = true;
    for (batch, outcome) in outcomes.iter().enumerate() {
        match outcome {
            Outcome::Success(true) => {}
            Outcome::Success(false) => {
                warn!(batch, "batch reported failure");
                all_ok = false;
            }
            Outcome::Interrupted => {
                warn!(batch, "batch interrupted");
                all_ok = false;
            }
            Outcome::Cancelled => {
                warn!(batch, "batch cancelled");
                all_ok = false;
            }
            Outcome::ExecutionFailed(cause) => {
                warn!(batch, error = %cause, "batch execution failed");
                all_ok = false;
            }
        }
    }
    all_ok
}

/// Counts of each outcome class, for summary logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tally {
    pub succeeded: usize,
    pub failed: usize,
    pub interrupted: usize,
    pub cancelled: usize,
    pub errored: usize,
}

impl Tally {
    pub(crate) fn of(outcomes: &[Outcome]) -> Self {
        let mut tally = Self::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Success(true) => tally.succeeded += 1,
                Outcome::Success(false) => tally.failed += 1,
                Outcome::Interrupted => tally.interrupted += 1,
                Outcome::Cancelled => tally.cancelled += 1,
                Outcome::ExecutionFailed(_) => tally.errored += 1,
            }
        }
        tally
    }
}
