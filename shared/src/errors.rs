/// Unified error types for YTGet.
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while driving the external download executable.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to spawn {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Tool exited with code {0}")]
    Exited(i32),

    #[error("Tool terminated by signal")]
    Terminated,

    #[error("Missing {0} handle on child process")]
    MissingStdio(&'static str),

    #[error("Failed waiting on child process: {0}")]
    Wait(String),

    #[error("Interrupted by user")]
    Cancelled,
}

impl RunnerError {
    /// Whether another identical attempt could succeed.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, RunnerError::Cancelled)
    }

    /// Map a finished child's exit status onto an error, `Ok` on zero exit.
    pub fn check_status(status: std::process::ExitStatus) -> Result<(), RunnerError> {
        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(RunnerError::Exited(code)),
            None => Err(RunnerError::Terminated),
        }
    }
}

/// Errors reading or writing the queue snapshot file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors from the release feed and connectivity checks.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {0} from {1}")]
    Status(u16, String),

    #[error("Release feed has no tag_name")]
    MissingTag,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors expanding a playlist into item URLs.
#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("Flat listing failed: {0}")]
    Listing(#[from] RunnerError),

    #[error("Malformed playlist record on line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
