//! Batched, deadline-bounded transfer orchestration.
//!
//! [`TransferClient`] is the entry point. Single-item and list operations
//! run one [`TransferTask`](sftp_batch_transfer::TransferTask) inline; the
//! batched upload path goes through [`BatchOrchestrator`], which
//!
//! 1. **Partitions** the file pairs into fixed-size batches
//! 2. **Submits** one task per batch to a bounded worker pool
//! 3. **Waits** for every task under a single global deadline
//! 4. **Reduces** the per-task [`Outcome`]s into one verdict
//!
//! The pool is torn down on every exit path.

pub mod client;
pub mod error;
pub mod orchestrator;
pub mod outcome;
mod pool;

pub use client::TransferClient;
pub use error::ClientError;
pub use orchestrator::BatchOrchestrator;
pub use outcome::{Outcome, reduce};

/// Default number of concurrent batch workers.
///
/// One worker serializes batches; callers opt into more parallelism.
pub const DEFAULT_MAX_WORKERS: usize = 1;
