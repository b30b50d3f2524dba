//! Client error types.

use std::time::Duration;

/// Errors surfaced to callers of [`TransferClient`](crate::TransferClient).
///
/// Per-batch failures never show up here; they collapse into a `false`
/// verdict. Only the global deadline and an external interruption escalate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transfer of {files} files did not complete within {}s", .timeout.as_secs())]
    Timeout { files: usize, timeout: Duration },

    #[error("interrupted while waiting for transfers")]
    Interrupted,

    #[error("transfer error: {0}")]
    Transfer(#[from] sftp_batch_transfer::TransferError),
}
