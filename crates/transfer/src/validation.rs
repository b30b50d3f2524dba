use std::path::{Component, Path, PathBuf};

use crate::TransferError;

/// Validates a remote path and returns it relative to the remote root.
///
/// A single leading `/` is treated as the remote root and stripped. The
/// remainder is rejected if it is empty, contains `..`, or carries a
/// Windows prefix (`C:`, `\\server`).
pub fn validate_remote_path(remote_path: &str) -> Result<PathBuf, TransferError> {
    let relative = remote_path.trim_start_matches('/');
    if relative.is_empty() {
        return Err(TransferError::InvalidPath(format!(
            "empty remote path: {remote_path:?}"
        )));
    }

    let path = Path::new(relative);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory traversal not allowed: {remote_path}"
                )));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(TransferError::InvalidPath(format!(
                    "path prefix not allowed: {remote_path}"
                )));
            }
            Component::CurDir => {}
            Component::Normal(part) => clean.push(part),
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(TransferError::InvalidPath(format!(
            "remote path names no file: {remote_path}"
        )));
    }
    Ok(clean)
}
