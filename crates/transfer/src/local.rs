//! Backend that mirrors a remote tree into a local directory.
//!
//! Remote paths are resolved under a root directory, so a batch can be
//! dry-run against disk before pointing the same request at a server.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::TransferError;
use crate::backend::{BackendFuture, TransferBackend};
use crate::types::{ConnectionParams, FilePair, OperationKind};
use crate::validation::validate_remote_path;

/// [`TransferBackend`] rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalDirBackend {
    root: PathBuf,
}

/// A pair with its remote side(s) resolved against the root.
#[derive(Debug)]
struct Resolved {
    from: PathBuf,
    to: PathBuf,
}

impl LocalDirBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, remote_path: &str) -> Result<PathBuf, TransferError> {
        Ok(self.root.join(validate_remote_path(remote_path)?))
    }

    fn resolve_pair(&self, op: OperationKind, pair: &FilePair) -> Result<Resolved, TransferError> {
        let resolved = match op {
            OperationKind::Upload => Resolved {
                from: PathBuf::from(pair.local_path()),
                to: self.resolve(pair.remote_path())?,
            },
            OperationKind::Download => Resolved {
                from: self.resolve(pair.remote_path())?,
                to: PathBuf::from(pair.local_path()),
            },
            OperationKind::Rename => Resolved {
                from: self.resolve(pair.local_path())?,
                to: self.resolve(pair.remote_path())?,
            },
            OperationKind::Exists | OperationKind::Delete => {
                let path = self.resolve(pair.remote_path())?;
                Resolved {
                    from: path.clone(),
                    to: path,
                }
            }
        };
        Ok(resolved)
    }
}

impl TransferBackend for LocalDirBackend {
    fn execute<'a>(
        &'a self,
        op: OperationKind,
        batch: &'a [FilePair],
        _params: &'a ConnectionParams,
    ) -> BackendFuture<'a> {
        Box::pin(async move {
            // Reject the whole batch before touching disk if any path is bad.
            let resolved = batch
                .iter()
                .map(|pair| self.resolve_pair(op, pair))
                .collect::<Result<Vec<_>, _>>()?;

            // Raised when this future is dropped, e.g. by an aborted task.
            let cancelled = Arc::new(AtomicBool::new(false));
            let _guard = CancelOnDrop(Arc::clone(&cancelled));

            let mut all_ok = true;
            for item in resolved {
                let flag = Arc::clone(&cancelled);
                let (item, result) = tokio::task::spawn_blocking(move || {
                    let result = apply(op, &item, &flag);
                    (item, result)
                })
                .await
                .map_err(|e| TransferError::Io(io::Error::other(e)))?;

                match result {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(op = %op, path = %item.from.display(), "operation reported failure");
                        all_ok = false;
                    }
                    Err(e) => {
                        warn!(
                            op = %op,
                            from = %item.from.display(),
                            to = %item.to.display(),
                            error = %e,
                            "file operation failed"
                        );
                        all_ok = false;
                    }
                }
            }
            Ok(all_ok)
        })
    }
}

/// Sets the shared flag when dropped.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn cancelled_error() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "batch cancelled")
}

/// Applies `op` to one pair. Nothing is written once `cancelled` is set.
fn apply(op: OperationKind, item: &Resolved, cancelled: &AtomicBool) -> io::Result<bool> {
    if op != OperationKind::Exists && cancelled.load(Ordering::SeqCst) {
        return Err(cancelled_error());
    }
    match op {
        OperationKind::Upload | OperationKind::Download => {
            create_parent(&item.to)?;
            let staging = staging_path(&item.to);
            if let Err(e) = std::fs::copy(&item.from, &staging) {
                let _ = std::fs::remove_file(&staging);
                return Err(e);
            }
            // The copy may have blocked past a teardown; do not publish it.
            if cancelled.load(Ordering::SeqCst) {
                let _ = std::fs::remove_file(&staging);
                return Err(cancelled_error());
            }
            std::fs::rename(&staging, &item.to)?;
            Ok(true)
        }
        OperationKind::Exists => Ok(item.from.exists()),
        OperationKind::Rename => {
            create_parent(&item.to)?;
            std::fs::rename(&item.from, &item.to)?;
            Ok(true)
        }
        OperationKind::Delete => {
            std::fs::remove_file(&item.from)?;
            Ok(true)
        }
    }
}

/// Sibling path a copy is written to before it is renamed into place.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
