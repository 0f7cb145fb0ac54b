/// Defaults and file naming conventions
///
/// Every path and name the tool produces is derived from these values, so a
/// backup written by one version can be found and restored by another.

/// Default host directory for backup artifacts
pub const DEFAULT_BACKUP_DIR: &str = "/var/backups/mysql";

/// Default directory for per-run log files
pub const DEFAULT_LOG_DIR: &str = "/var/log/mysql-backup";

/// Default backup directory as seen from inside the container
pub const DEFAULT_CONTAINER_BACKUP_DIR: &str = "/backup";

/// Default database connection parameters
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DB_USER: &str = "root";

/// Environment variable consulted for the database password
pub const PASSWORD_ENV: &str = "MYSQL_PASSWORD";

/// Environment variable overriding the settings file location
pub const CONFIG_PATH_ENV: &str = "MARIADB_BACKUP_CONFIG";

/// Settings directory name under the user config dir
pub const CONFIG_DIR_NAME: &str = "mariadb-backup-cli";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Lock and PID marker names, created in the lock directory
pub const LOCK_FILE_NAME: &str = "mysql-backup-restore.lock";
pub const PID_FILE_NAME: &str = "mysql-backup-restore.pid";

/// How long a forced kill may take before the lock holder counts as surviving
pub const DEFAULT_KILL_TIMEOUT: &str = "5s";

/// Timestamp format used in log and artifact names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Prefix and suffix of backup artifacts: full-backup-<ts>.tar.gz
pub const ARTIFACT_PREFIX: &str = "full-backup-";
pub const ARTIFACT_SUFFIX: &str = ".tar.gz";

/// Prefix and suffix of log files: mysql-backup-restore-<ts>.log
pub const LOG_PREFIX: &str = "mysql-backup-restore-";
pub const LOG_SUFFIX: &str = ".log";

/// External executables
pub const DEFAULT_MARIADB_BACKUP_BIN: &str = "mariadb-backup";
pub const DEFAULT_TAR_BIN: &str = "tar";
pub const DEFAULT_SCP_BIN: &str = "scp";
pub const DEFAULT_CONTAINER_SHELL: &str = "bash";

/// Log line emitted when no remote destination is configured
pub const SKIP_TRANSFER_MESSAGE: &str = "Remote server not configured. Skipping transfer.";

/// Name of the backup directory for a run timestamp
pub fn backup_dir_name(timestamp: &str) -> String {
    format!("{}{}", ARTIFACT_PREFIX, timestamp)
}

/// Name of the backup artifact for a run timestamp
pub fn artifact_name(timestamp: &str) -> String {
    format!("{}{}{}", ARTIFACT_PREFIX, timestamp, ARTIFACT_SUFFIX)
}

/// Name of the log file for a run timestamp
pub fn log_file_name(timestamp: &str) -> String {
    format!("{}{}{}", LOG_PREFIX, timestamp, LOG_SUFFIX)
}
