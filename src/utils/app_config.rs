/// Settings file management
/// Stores site defaults in ~/.config/mariadb-backup-cli/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::constants::*;

/// What to do when an external tool exits unsuccessfully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run and report the failing step
    #[default]
    Abort,
    /// Log a warning and carry on with the next step (legacy behaviour)
    Continue,
}

/// Executables invoked by the runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub mariadb_backup: String,
    pub tar: String,
    pub scp: String,
    /// Shell used inside the container for `exec`
    pub shell: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            mariadb_backup: DEFAULT_MARIADB_BACKUP_BIN.to_string(),
            tar: DEFAULT_TAR_BIN.to_string(),
            scp: DEFAULT_SCP_BIN.to_string(),
            shell: DEFAULT_CONTAINER_SHELL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backup_dir: PathBuf,
    pub log_dir: PathBuf,
    pub container_backup_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub container_name: Option<String>,
    pub remote: Option<String>,
    /// Directory holding the lock and PID markers (system temp dir when unset)
    pub lock_dir: Option<PathBuf>,
    /// humantime duration, e.g. "5s"
    pub kill_timeout: String,
    pub failure_policy: FailurePolicy,
    pub tools: ToolPaths,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            container_backup_dir: PathBuf::from(DEFAULT_CONTAINER_BACKUP_DIR),
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            user: DEFAULT_DB_USER.to_string(),
            password: None,
            container_name: None,
            remote: None,
            lock_dir: None,
            kill_timeout: DEFAULT_KILL_TIMEOUT.to_string(),
            failure_policy: FailurePolicy::default(),
            tools: ToolPaths::default(),
        }
    }
}

impl AppConfig {
    /// Get config file path
    ///
    /// `MARIADB_BACKUP_CONFIG` wins over the per-user location.
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine the user config directory")?
            .join(CONFIG_DIR_NAME);

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }
}
