/// Run configuration
///
/// Built once per invocation from the settings file, the environment and the
/// command line, then passed by reference to every component.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::{artifact_name, backup_dir_name, log_file_name, FailurePolicy, ToolPaths};
use crate::utils::{LOCK_FILE_NAME, PID_FILE_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Backup,
    Restore,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Backup => write!(f, "backup"),
            Mode::Restore => write!(f, "restore"),
        }
    }
}

/// Database connection parameters passed to mariadb-backup on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConnection {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
    pub backup_dir: PathBuf,
    pub log_dir: PathBuf,
    pub container_backup_dir: PathBuf,
    pub db: DbConnection,
    /// Container to exec into; containerized mode iff set
    pub container: Option<String>,
    /// scp destination in `user@host:path` form
    pub remote: Option<String>,
    pub restore_file: Option<PathBuf>,
    pub force: bool,
    /// Namespaces the log file and the backup artifact
    pub timestamp: String,
    pub lock_dir: PathBuf,
    pub kill_timeout: Duration,
    pub failure_policy: FailurePolicy,
    pub tools: ToolPaths,
}

impl RunConfig {
    pub fn is_containerized(&self) -> bool {
        self.container.is_some()
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(log_file_name(&self.timestamp))
    }

    /// Host path of this run's backup artifact
    pub fn artifact_path(&self) -> PathBuf {
        self.backup_dir.join(artifact_name(&self.timestamp))
    }

    /// Directory the backup artifacts live in, from the point of view of the
    /// process running the tools (the container in containerized mode)
    pub fn working_backup_dir(&self) -> &Path {
        if self.is_containerized() {
            &self.container_backup_dir
        } else {
            &self.backup_dir
        }
    }

    /// Uncompressed backup directory name for this run
    pub fn backup_dir_name(&self) -> String {
        backup_dir_name(&self.timestamp)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.lock_dir.join(LOCK_FILE_NAME)
    }

    pub fn pid_file(&self) -> PathBuf {
        self.lock_dir.join(PID_FILE_NAME)
    }
}
