/// Error types for backup, restore and locking
///
/// Every failure surfaced by the tool maps to exit status 1; the variants
/// exist so callers and logs can tell the failures apart.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the single-instance guard
#[derive(Error, Debug)]
pub enum LockError {
    /// Another live process holds the lock and force was not requested
    #[error("Another instance is already running (PID {pid})")]
    Conflict { pid: u32 },

    /// A forced kill was issued but the holder is still alive
    #[error("Lock holder PID {pid} survived termination")]
    HolderSurvived { pid: u32 },

    /// The lock was reclaimed concurrently by another process
    #[error("Lock was claimed by another instance while acquiring")]
    Contended,

    #[error("Lock file error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of delegated external tools
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully; `code` is None when killed by a signal
    #[error("{step} failed with exit code {}", describe_code(.code))]
    Failed { step: String, code: Option<i64> },

    #[error("Container runtime error: {0}")]
    Container(String),
}

fn describe_code(code: &Option<i64>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// Top-level error for a run
#[derive(Error, Debug)]
pub enum BackupError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Restore file not found: {0}")]
    MissingRestoreFile(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackupError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        1
    }
}

pub type BackupResult<T> = std::result::Result<T, BackupError>;
