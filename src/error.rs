use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures while reading, validating or persisting a configuration document
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors caused by the submitted document rather than the host
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Validation { .. })
    }
}

/// Why an external command did not succeed
#[derive(Debug, Error)]
pub enum ExecutionCause {
    #[error("failed to spawn: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("exited with {0}")]
    ExitStatus(std::process::ExitStatus),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("i/o error while waiting: {0}")]
    Io(#[source] std::io::Error),
}

#[derive(Debug, Error)]
#[error("`{command}` {cause}")]
pub struct ExecutionError {
    pub command: String,
    #[source]
    pub cause: ExecutionCause,
}

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("failed to open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("instance {pid} still holds {path} after {waited:?}")]
    Contended {
        path: PathBuf,
        pid: i32,
        waited: Duration,
    },

    #[error("lock operation failed: {0}")]
    Lock(#[from] nix::Error),

    #[error("failed to record pid in lock file: {0}")]
    Write(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("public IP lookup failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("public IP lookup returned an empty body")]
    EmptyBody,
}
