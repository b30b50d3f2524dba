use std::fmt;

use serde::{Deserialize, Serialize};

use crate::DEFAULT_PORT;

/// One transfer target: a local path paired with a remote path.
///
/// For rename the pair is `(source, target)`, both remote. Existence checks
/// and deletes carry the same path in both fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePair {
    local_path: String,
    remote_path: String,
}

impl FilePair {
    pub fn new(local_path: impl Into<String>, remote_path: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            remote_path: remote_path.into(),
        }
    }

    /// Builds a pair whose local and remote fields are the same path.
    pub fn symmetric(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            local_path: path.clone(),
            remote_path: path,
        }
    }

    pub fn local_path(&self) -> &str {
        &self.local_path
    }

    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }
}

impl fmt::Display for FilePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.local_path, self.remote_path)
    }
}

/// The remote action a task performs over its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Upload,
    Download,
    Exists,
    Rename,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Exists => "exists",
            Self::Rename => "rename",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to reach the remote endpoint.
///
/// Opaque to the orchestration layer: it is forwarded to backends untouched.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: None,
            private_key_path: None,
            connect_timeout_secs: None,
        }
    }
}

impl ConnectionParams {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            ..Self::default()
        }
    }
}

// Hand-written so the password never reaches the logs.
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("private_key_path", &self.private_key_path)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}
